//! Per-tab supervision: open, instrument, watch, respawn.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::{SessionEvent, SessionState, Shared};
use crate::driver::{BrowserHandle, PageEvent, PageHandle};
use crate::error::{Error, Result};
use crate::handlers::exposed_fn;
use crate::instrumentation::{self, SAMPLE_CALLBACK};
use crate::metrics::{SampleIngestor, now_ms};

/// Lifecycle of one tab index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabState {
	/// Page requested; navigation or ready hook still pending.
	Opening,
	/// Instrumented and reporting samples.
	Open,
	/// Page closed; waiting out the spawn period before reopening.
	Closed,
}

/// Opens tab `index`, replacing a closed incarnation if there is one.
///
/// Fails with [`Error::TabBusy`] while another incarnation of the same index is
/// opening or open.
///
/// Boxed: the page watcher spawned here reopens the tab through this function.
pub(super) fn open(shared: &Arc<Shared>, index: usize) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
	Box::pin(open_tab(shared, index))
}

async fn open_tab(shared: &Arc<Shared>, index: usize) -> Result<()> {
	let state = shared.state();
	if !matches!(state, SessionState::Starting | SessionState::Running) {
		return Err(Error::InvalidState { operation: "open tab", state });
	}
	let browser = shared.browser().ok_or(Error::BrowserGone)?;

	{
		let mut tabs = shared.tabs.lock();
		if tabs.get(&index).is_some_and(|state| *state != TabState::Closed) {
			return Err(Error::TabBusy(index));
		}
		tabs.insert(index, TabState::Opening);
	}

	let result = open_page(shared, browser.as_ref(), index).await;
	if result.is_err() {
		let mut tabs = shared.tabs.lock();
		if tabs.get(&index) == Some(&TabState::Opening) {
			tabs.remove(&index);
		}
	}
	result
}

async fn open_page(shared: &Arc<Shared>, browser: &dyn BrowserHandle, index: usize) -> Result<()> {
	let url = shared.config.tab_url(shared.id.0, index, std::process::id());
	info!(target = "rtcswarm.tab", session = %shared.id, tab = index, %url, "opening tab");

	let page = browser.new_page().await?;

	let ingestor = SampleIngestor::new(index, Arc::clone(&shared.store), shared.config.stats_ttl());
	page.expose_function(
		SAMPLE_CALLBACK,
		exposed_fn(move |args| {
			let ingestor = ingestor.clone();
			async move {
				let report = ingestor.ingest_json(first_argument(args), now_ms());
				debug!(
					target = "rtcswarm.metrics",
					tab = ingestor.tab(),
					updated = report.updated,
					rejected = report.rejected,
					expired = report.expired.len(),
					"sample batch"
				);
				Ok(())
			}
		}),
	)
	.await?;

	// subscribe before navigating so the first DOMContentLoaded is not missed
	let events = page.events();
	let mut lifecycle = page.events();
	let watcher = tokio::spawn(watch_page(Arc::downgrade(shared), index, Arc::clone(&page), events));
	let abort_watcher = watcher.abort_handle();
	shared.track(watcher);

	if let Err(err) = page.goto(&url).await {
		if page_closed(&mut lifecycle) {
			// the watcher owns the respawn of a page that closed mid-navigation
			debug!(target = "rtcswarm.tab", session = %shared.id, tab = index, error = %err, "page closed during navigation");
			if let Some(state) = shared.tabs.lock().get_mut(&index) {
				*state = TabState::Closed;
			}
		} else {
			abort_watcher.abort();
		}
		return Err(Error::navigation(&url, err));
	}

	match browser.pages().await {
		Ok(pages) => {
			if let Some(first) = pages.first() {
				if let Err(err) = first.bring_to_front().await {
					debug!(target = "rtcswarm.tab", session = %shared.id, error = %err, "bring to front failed");
				}
			}
		}
		Err(err) => debug!(target = "rtcswarm.tab", session = %shared.id, error = %err, "listing pages failed"),
	}
	Ok(())
}

/// The page calls `traceRtcStats(samples)`; drivers hand over `[samples]`.
fn first_argument(args: Value) -> Value {
	match args {
		Value::Array(mut args) if !args.is_empty() => args.swap_remove(0),
		other => other,
	}
}

/// Drains already delivered events, reporting whether the page has closed.
fn page_closed(events: &mut broadcast::Receiver<PageEvent>) -> bool {
	loop {
		match events.try_recv() {
			Ok(PageEvent::Close) | Err(broadcast::error::TryRecvError::Closed) => return true,
			Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
			Err(broadcast::error::TryRecvError::Empty) => return false,
		}
	}
}

async fn watch_page(shared: Weak<Shared>, index: usize, page: Arc<dyn PageHandle>, mut events: broadcast::Receiver<PageEvent>) {
	let mut ready = false;
	loop {
		let event = match events.recv().await {
			Ok(event) => event,
			Err(broadcast::error::RecvError::Lagged(skipped)) => {
				warn!(target = "rtcswarm.tab", tab = index, skipped, "page events lagged");
				continue;
			}
			Err(broadcast::error::RecvError::Closed) => PageEvent::Close,
		};
		let Some(shared) = shared.upgrade() else {
			return;
		};

		match event {
			PageEvent::DomContentLoaded if !ready => {
				ready = true;
				if let Err(err) = on_ready(&shared, index, page.as_ref()).await {
					error!(target = "rtcswarm.tab", session = %shared.id, tab = index, error = %err, "ready hook failed");
				}
			}
			PageEvent::DomContentLoaded => {}
			PageEvent::Console(text) => {
				if shared.config.enable_page_log {
					info!(target = "rtcswarm.page", session = %shared.id, tab = index, "{text}");
				}
			}
			PageEvent::Close => {
				on_close(shared, index).await;
				return;
			}
		}
	}
}

/// Injects instrumentation and the optional user script, then marks the tab open.
async fn on_ready(shared: &Shared, index: usize, page: &dyn PageHandle) -> Result<()> {
	debug!(target = "rtcswarm.tab", session = %shared.id, tab = index, "document ready");

	for tag in shared.config.instrumentation.scripts(shared.config.stats_interval()) {
		page.add_script_tag(tag).await?;
	}

	if let Some(path) = &shared.config.script_path {
		let body = tokio::fs::read_to_string(path).await?;
		for tag in instrumentation::user_script(shared.id.0, index, body) {
			page.add_script_tag(tag).await?;
		}
	}

	if let Some(state) = shared.tabs.lock().get_mut(&index) {
		*state = TabState::Open;
	}
	shared.emit(SessionEvent::TabOpened(index));
	Ok(())
}

async fn on_close(shared: Arc<Shared>, index: usize) {
	info!(target = "rtcswarm.tab", session = %shared.id, tab = index, "tab closed");
	if let Some(state) = shared.tabs.lock().get_mut(&index) {
		*state = TabState::Closed;
	}
	shared.emit(SessionEvent::TabClosed(index));

	let delay = shared.config.spawn_period();
	let weak = Arc::downgrade(&shared);
	drop(shared);

	tokio::time::sleep(delay).await;
	let Some(shared) = weak.upgrade() else {
		return;
	};
	match open(&shared, index).await {
		Ok(()) => {}
		Err(err) if err.is_browser_gone() => {
			debug!(target = "rtcswarm.tab", session = %shared.id, tab = index, "browser gone; tab not reopened");
		}
		Err(err) => error!(target = "rtcswarm.tab", session = %shared.id, tab = index, error = %err, "failed to reopen tab"),
	}
}
