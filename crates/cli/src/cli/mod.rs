
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;
use crate::styles::cli_styles;

/// Root CLI for rtcswarm.
#[derive(Parser, Debug)]
#[command(name = "rtcswarm")]
#[command(about = "WebRTC load sessions in browser tabs, and the telemetry they report")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace and dependency logs)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: toon (default), json, ndjson, or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "toon")]
	pub format: OutputFormat,

	/// JSON configuration file; defaults apply when omitted
	#[arg(short, long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Show when each tab opens and which URL it loads.
	Plan(PlanArgs),
	/// Feed recorded sample batches (NDJSON) through the metric store.
	Replay(ReplayArgs),
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Plan(_) => "plan",
			Commands::Replay(_) => "replay",
		}
	}
}

/// Overrides applied on top of the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
	/// Page every tab navigates to
	#[arg(long, value_name = "URL")]
	pub url: Option<String>,

	/// Query template: $s session, $S sessions, $t tab, $T tabs, $p pid
	#[arg(long, value_name = "TEMPLATE")]
	pub url_query: Option<String>,

	/// Number of sessions (one browser each)
	#[arg(long, value_name = "N")]
	pub sessions: Option<usize>,

	/// Tabs per session
	#[arg(long = "tabs", value_name = "N")]
	pub tabs_per_session: Option<usize>,

	/// Delay between tab openings, and before a closed tab is reopened
	#[arg(long, value_name = "MS")]
	pub spawn_period_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
	/// Recorded batches, one `{tab, timestamp, samples}` object per line
	#[arg(short, long, value_name = "FILE")]
	pub input: PathBuf,

	/// Seconds a stream may stay silent before it is dropped (overrides config)
	#[arg(long, value_name = "SECS")]
	pub ttl: Option<u64>,
}
