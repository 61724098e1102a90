use std::path::PathBuf;

use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("malformed batch at {}:{line}", .path.display())]
	Recording {
		path: PathBuf,
		line: usize,
		#[source]
		source: serde_json::Error,
	},

	#[error(transparent)]
	Swarm(#[from] rtcswarm::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let code = match self {
			CliError::InvalidInput(_) | CliError::Recording { .. } | CliError::Json(_) => ErrorCode::InvalidInput,
			CliError::Swarm(err) => match err {
				rtcswarm::Error::Config(_) | rtcswarm::Error::ConfigFile { .. } | rtcswarm::Error::Json(_) => ErrorCode::ConfigError,
				rtcswarm::Error::Io(_) => ErrorCode::IoError,
				_ => ErrorCode::SessionError,
			},
			CliError::Io(_) => ErrorCode::IoError,
			CliError::Anyhow(_) => ErrorCode::InternalError,
		};

		let message = match self {
			CliError::Recording { source, .. } => format!("{self}: {source}"),
			CliError::Anyhow(err) => format!("{err:#}"),
			_ => self.to_string(),
		};

		CommandError { code, message }
	}
}
