//! Periodic process-stats refresh for a session's browser.

use std::sync::Weak;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::Shared;

/// Sleeps `interval`, polls, repeats. Exits once the session has no browser.
///
/// Polls are sequential, so a slow provider pushes the next poll back instead
/// of overlapping it.
pub(super) async fn run(shared: Weak<Shared>, interval: Duration) {
	loop {
		tokio::time::sleep(interval).await;
		let Some(shared) = shared.upgrade() else {
			return;
		};
		if !refresh(&shared).await {
			debug!(target = "rtcswarm.stats", session = %shared.id, "no browser; stats loop exiting");
			return;
		}
	}
}

/// Returns false when there is no browser left to sample.
async fn refresh(shared: &Shared) -> bool {
	let Some(browser) = shared.browser() else {
		return false;
	};
	let Some(pid) = browser.pid() else {
		trace!(target = "rtcswarm.stats", session = %shared.id, "browser has no local process");
		return true;
	};

	match shared.stats_provider.process_stats(pid).await {
		Ok(stats) => {
			trace!(target = "rtcswarm.stats", session = %shared.id, pid, cpu = stats.cpu, memory = stats.memory, "process stats");
			*shared.process.lock() = stats;
		}
		Err(err) => warn!(target = "rtcswarm.stats", session = %shared.id, pid, error = %err, "process stats failed"),
	}
	true
}
