use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::instrumentation::InstrumentationConfig;
use crate::launch::LaunchConfig;

/// Fully owned configuration shared by every session of a run.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// changes. Durations are stored in the units operators write them in and
/// exposed as [`Duration`] through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwarmConfig {
	/// Page every tab navigates to.
	pub url: String,
	/// Optional query template appended to `url`.
	///
	/// Placeholders: `$s` session number, `$S` session count, `$t` tab number,
	/// `$T` tabs per session, `$p` process id. Session and tab numbers are 1-based.
	pub url_query: Option<String>,
	/// Number of sessions in the run; only used for `$S`.
	pub sessions: usize,
	/// Tabs opened by each session.
	pub tabs_per_session: usize,
	/// Delay between staggered tab openings, and before a closed tab is reopened.
	pub spawn_period_ms: u64,
	/// Period of the in-page sampler and of the process stats refresh.
	pub stats_interval_secs: u64,
	/// Silence after which a metric key is dropped.
	pub stats_ttl_secs: u64,
	/// User script injected into every tab once it is ready.
	pub script_path: Option<PathBuf>,
	/// Forward page console output to the log.
	pub enable_page_log: bool,
	pub launch: LaunchConfig,
	pub instrumentation: InstrumentationConfig,
}

impl Default for SwarmConfig {
	fn default() -> Self {
		Self {
			url: "about:blank".to_string(),
			url_query: None,
			sessions: 1,
			tabs_per_session: 1,
			spawn_period_ms: 1000,
			stats_interval_secs: 2,
			stats_ttl_secs: 30,
			script_path: None,
			enable_page_log: false,
			launch: LaunchConfig::default(),
			instrumentation: InstrumentationConfig::default(),
		}
	}
}

impl SwarmConfig {
	/// Loads and validates a JSON config file.
	pub fn from_file(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path).map_err(|source| Error::ConfigFile {
			path: path.to_path_buf(),
			source,
		})?;
		let config: SwarmConfig = serde_json::from_str(&raw)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects configurations the orchestrator cannot run.
	pub fn validate(&self) -> Result<()> {
		if self.url.trim().is_empty() {
			return Err(Error::Config("url must not be empty".into()));
		}
		if self.sessions == 0 {
			return Err(Error::Config("sessions must be at least 1".into()));
		}
		if self.tabs_per_session == 0 {
			return Err(Error::Config("tabsPerSession must be at least 1".into()));
		}
		if self.stats_interval_secs == 0 {
			return Err(Error::Config("statsIntervalSecs must be at least 1".into()));
		}
		Ok(())
	}

	pub fn spawn_period(&self) -> Duration {
		Duration::from_millis(self.spawn_period_ms)
	}

	pub fn stats_interval(&self) -> Duration {
		Duration::from_secs(self.stats_interval_secs)
	}

	pub fn stats_ttl(&self) -> Duration {
		Duration::from_secs(self.stats_ttl_secs)
	}

	/// Delay before tab `index` of a session is first opened.
	pub fn stagger_delay(&self, index: usize) -> Duration {
		self.spawn_period().saturating_mul(index as u32)
	}

	/// Builds the URL tab `tab` of session `session` navigates to.
	///
	/// `session` and `tab` are zero-based; the template sees them 1-based.
	pub fn tab_url(&self, session: usize, tab: usize, pid: u32) -> String {
		let Some(template) = self.url_query.as_deref().filter(|q| !q.is_empty()) else {
			return self.url.clone();
		};

		let query = template
			.replace("$s", &(session + 1).to_string())
			.replace("$S", &self.sessions.to_string())
			.replace("$t", &(tab + 1).to_string())
			.replace("$T", &self.tabs_per_session.to_string())
			.replace("$p", &pid.to_string());

		format!("{}?{}", self.url, query)
	}
}
