//! Error types for rtcswarm.

use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionState;

/// Result type alias for rtcswarm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating sessions.
#[derive(Debug, Error)]
pub enum Error {
	/// The browser driver could not start a browser for the session.
	#[error("browser launch failed: {0}")]
	Launch(String),

	/// A browser-driver operation (new page, script injection, close) failed.
	#[error("driver error: {0}")]
	Driver(String),

	/// Navigating a tab to its target URL failed.
	#[error("navigation failed: {url}")]
	Navigation {
		url: String,
		#[source]
		source: Box<Error>,
	},

	/// The session has no live browser handle.
	#[error("browser is not running")]
	BrowserGone,

	/// A tab index already has a live incarnation.
	#[error("tab {0} is already open")]
	TabBusy(usize),

	/// Operation is not valid in the session's current lifecycle state.
	#[error("invalid session state for {operation}: {state:?}")]
	InvalidState { operation: &'static str, state: SessionState },

	/// Configuration failed validation.
	#[error("invalid configuration: {0}")]
	Config(String),

	/// Configuration file could not be read.
	#[error("failed to read {path}")]
	ConfigFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The process stats provider failed to sample a process.
	#[error("process stats unavailable for pid {pid}: {reason}")]
	ProcessStats { pid: u32, reason: String },

	/// I/O error.
	#[error(transparent)]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Wraps a driver failure that happened while navigating to `url`.
	pub fn navigation(url: impl Into<String>, source: Error) -> Self {
		Error::Navigation {
			url: url.into(),
			source: Box::new(source),
		}
	}

	/// Returns true if the error means the browser went away underneath us.
	pub fn is_browser_gone(&self) -> bool {
		match self {
			Error::BrowserGone => true,
			Error::Navigation { source, .. } => source.is_browser_gone(),
			_ => false,
		}
	}
}
