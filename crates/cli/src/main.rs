use clap::Parser;
use rtcswarm_cli::cli::Cli;
use rtcswarm_cli::error::CliError;
use rtcswarm_cli::output::{self, CommandResult, OutputFormat};
use rtcswarm_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli, format).await {
		handle_error(err, command, format);
		std::process::exit(1);
	}
}

fn handle_error(err: CliError, command: &str, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	// Always print to stderr for humans
	output::print_error_stderr(&cmd_error);

	// Also emit the envelope on stdout for scripts
	if format != OutputFormat::Text {
		let result: CommandResult<()> = CommandResult::failure(command, cmd_error);
		output::print_result(&result, format);
	}
}
