//! Result envelopes printed by every command.
//!
//! Success and failure share one shape so scripts can branch on `ok` without
//! parsing stderr:
//!
//! ```json
//! { "schemaVersion": 1, "ok": true, "command": "replay", "data": { ... } }
//! ```

#[cfg(test)]
mod tests;

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// How results are rendered on stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// TOON output (default, compact)
	#[default]
	Toon,
	/// Pretty-printed JSON
	Json,
	/// One JSON document per line
	Ndjson,
	/// Human-readable text
	Text,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub schema_version: u32,
	pub ok: bool,
	/// Command name (`plan`, `replay`)
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl<T: Serialize> CommandResult<T> {
	pub fn success(command: &str, data: T) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: true,
			command: command.to_string(),
			data: Some(data),
			error: None,
		}
	}

	pub fn failure(command: &str, error: CommandError) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: false,
			command: command.to_string(),
			data: None,
			error: Some(error),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Stable error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Configuration file missing, unreadable or invalid
	ConfigError,
	/// Recording or argument could not be used
	InvalidInput,
	/// File I/O error
	IoError,
	/// Browser or session failure
	SessionError,
	InternalError,
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let code = match self {
			ErrorCode::ConfigError => "CONFIG_ERROR",
			ErrorCode::InvalidInput => "INVALID_INPUT",
			ErrorCode::IoError => "IO_ERROR",
			ErrorCode::SessionError => "SESSION_ERROR",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		};
		f.write_str(code)
	}
}

pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Toon => {
			if let Ok(json_value) = serde_json::to_value(result) {
				println!("{}", toon::encode(&json_value, None));
			}
		}
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();

	if let Some(data) = &result.data {
		if let Ok(json) = serde_json::to_string_pretty(data) {
			let _ = writeln!(stdout, "{json}");
		}
	} else if let Some(error) = &result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
	}
}

/// Print an error to stderr in human-readable format
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
}
