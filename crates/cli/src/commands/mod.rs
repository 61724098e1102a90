mod plan;
mod replay;

use std::path::Path;

use rtcswarm::SwarmConfig;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::output::{CommandResult, OutputFormat, print_result};

pub async fn dispatch(cli: Cli, format: OutputFormat) -> Result<()> {
	let config = load_config(cli.config.as_deref())?;
	let command = cli.command.name();

	match cli.command {
		Commands::Plan(args) => {
			let data = plan::execute(&args, config)?;
			print_result(&CommandResult::success(command, data), format);
		}
		Commands::Replay(args) => {
			let data = replay::execute(&args, &config).await?;
			print_result(&CommandResult::success(command, data), format);
		}
	}
	Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SwarmConfig> {
	match path {
		Some(path) => {
			debug!(target = "rtcswarm.cli", path = %path.display(), "loading config");
			Ok(SwarmConfig::from_file(path)?)
		}
		None => Ok(SwarmConfig::default()),
	}
}
