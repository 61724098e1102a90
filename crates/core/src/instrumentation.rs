//! Scripts injected into a tab once its document is ready.
//!
//! The sampling itself is done by an external observer library; this module
//! only decides which scripts go into the page and wires the library's local
//! transport to [`SAMPLE_CALLBACK`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::ScriptTag;

/// Name of the `window` function sample batches are delivered through.
pub const SAMPLE_CALLBACK: &str = "traceRtcStats";

const DEFAULT_LIBRARY_URL: &str = "https://observertc.github.io/observer-js/dist/v0.6.1/observer.min.js";

const BOOTSTRAP: &str = include_str!("instrumentation/bootstrap.js");

/// Where the observer library is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentationConfig {
	pub library_url: String,
}

impl Default for InstrumentationConfig {
	fn default() -> Self {
		Self {
			library_url: DEFAULT_LIBRARY_URL.to_string(),
		}
	}
}

impl InstrumentationConfig {
	/// Library plus bootstrap, sampling every `poll_interval`.
	pub fn scripts(&self, poll_interval: Duration) -> Vec<ScriptTag> {
		let bootstrap = BOOTSTRAP
			.replace("__POLL_MS__", &poll_interval.as_millis().to_string())
			.replace("__CALLBACK__", SAMPLE_CALLBACK);

		vec![ScriptTag::Url(self.library_url.clone()), ScriptTag::Content(bootstrap)]
	}
}

/// Globals announcing the tab's identity, followed by the user script.
///
/// `session` and `tab` are zero-based; the page sees them 1-based.
pub fn user_script(session: usize, tab: usize, body: String) -> Vec<ScriptTag> {
	let globals = format!("window.RTCSWARM_SESSION = {};window.RTCSWARM_TAB = {};", session + 1, tab + 1);
	vec![ScriptTag::Content(globals), ScriptTag::Content(body)]
}
