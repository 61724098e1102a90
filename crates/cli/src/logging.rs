use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

/// Filter used when `RUST_LOG` is unset.
///
/// Every rtcswarm target (`rtcswarm.session`, `rtcswarm.metrics`, the CLI's
/// `rtcswarm_cli::*` modules) shares the `rtcswarm` prefix; other crates stay at
/// warn. `-vvv` also opens up dependencies.
fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn",
		1 => "warn,rtcswarm=info",
		2 => "warn,rtcswarm=debug",
		_ => "debug,rtcswarm=trace",
	}
}
