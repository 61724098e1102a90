//! Session orchestration: one browser, a fixed set of supervised tabs, and the
//! metrics they feed.
//!
//! A [`Session`] is a cheap handle over shared state; clones refer to the same
//! session. Background work (staggered tab openings, per-tab event loops,
//! respawn delays, the stats refresh loop, the disconnect watcher) runs in
//! tokio tasks that hold only a weak reference to the session and are aborted
//! by [`Session::stop`].

mod stats;
mod tab;


use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rtcswarm_protocol::StatsSnapshot;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use self::tab::TabState;
use crate::config::SwarmConfig;
use crate::driver::{BrowserDriver, BrowserEvent, BrowserHandle};
use crate::error::{Error, Result};
use crate::metrics::{MetricStore, SharedStore};
use crate::process::{ProcessStats, ProcessStatsProvider};

/// Zero-based ordinal of a session within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub usize);

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Idle,
	Starting,
	Running,
	Stopping,
	Stopped,
}

/// Notifications broadcast to [`Session::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	/// The browser is up and tab openings are scheduled.
	Started,
	/// Tab finished its ready hook and is instrumented.
	TabOpened(usize),
	/// Tab's page closed; it will be reopened after the spawn period.
	TabClosed(usize),
	/// The session stopped. Sent on every call to [`Session::stop`].
	Stopped,
}

const EVENT_CAPACITY: usize = 256;

/// One logical test unit: a browser instance and its tabs.
#[derive(Clone)]
pub struct Session {
	shared: Arc<Shared>,
}

pub(crate) struct Shared {
	id: SessionId,
	config: Arc<SwarmConfig>,
	driver: Arc<dyn BrowserDriver>,
	stats_provider: Arc<dyn ProcessStatsProvider>,
	state: watch::Sender<SessionState>,
	events: broadcast::Sender<SessionEvent>,
	browser: Mutex<Option<Arc<dyn BrowserHandle>>>,
	tabs: Mutex<BTreeMap<usize, TabState>>,
	store: SharedStore,
	process: Mutex<ProcessStats>,
	tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
	fn state(&self) -> SessionState {
		*self.state.borrow()
	}

	fn browser(&self) -> Option<Arc<dyn BrowserHandle>> {
		self.browser.lock().clone()
	}

	fn emit(&self, event: SessionEvent) {
		let _ = self.events.send(event);
	}

	/// Registers a background task so [`Session::stop`] can abort it.
	///
	/// Tasks registered once the session is stopping are aborted immediately.
	fn track(&self, handle: JoinHandle<()>) {
		let mut tasks = self.tasks.lock();
		if matches!(self.state(), SessionState::Stopping | SessionState::Stopped) {
			handle.abort();
			return;
		}
		tasks.retain(|task| !task.is_finished());
		tasks.push(handle);
	}
}

impl Session {
	pub fn new(id: SessionId, config: Arc<SwarmConfig>, driver: Arc<dyn BrowserDriver>, stats_provider: Arc<dyn ProcessStatsProvider>) -> Self {
		let (state, _) = watch::channel(SessionState::Idle);
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			shared: Arc::new(Shared {
				id,
				config,
				driver,
				stats_provider,
				state,
				events,
				browser: Mutex::new(None),
				tabs: Mutex::new(BTreeMap::new()),
				store: Arc::new(Mutex::new(MetricStore::new())),
				process: Mutex::new(ProcessStats::default()),
				tasks: Mutex::new(Vec::new()),
			}),
		}
	}

	pub fn id(&self) -> SessionId {
		self.shared.id
	}

	pub fn state(&self) -> SessionState {
		self.shared.state()
	}

	/// Watches lifecycle transitions.
	pub fn watch_state(&self) -> watch::Receiver<SessionState> {
		self.shared.state.subscribe()
	}

	/// Subscribes to session events emitted from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.shared.events.subscribe()
	}

	/// Current state of every tab that has been opened at least once.
	pub fn tabs(&self) -> Vec<(usize, TabState)> {
		self.shared.tabs.lock().iter().map(|(index, state)| (*index, *state)).collect()
	}

	/// Indices of tabs that are opening or open.
	pub fn active_tabs(&self) -> Vec<usize> {
		self.shared
			.tabs
			.lock()
			.iter()
			.filter(|(_, state)| **state != TabState::Closed)
			.map(|(index, _)| *index)
			.collect()
	}

	/// Aggregated metrics merged with the latest process stats.
	pub fn stats(&self) -> StatsSnapshot {
		let mut snapshot = self.shared.store.lock().snapshot();
		let process = *self.shared.process.lock();
		snapshot.cpu = process.cpu;
		snapshot.memory = process.memory;
		snapshot
	}

	/// Launches the browser and schedules tab openings and stats refresh.
	///
	/// Only valid from [`SessionState::Idle`]. A launch failure stops the
	/// session and is returned as [`Error::Launch`]; a browser that is already
	/// disconnected when launch returns stops it with [`Error::BrowserGone`].
	/// A browser launched for a session stopped in the meantime is closed.
	pub async fn start(&self) -> Result<()> {
		let shared = &self.shared;
		let mut admitted = false;
		shared.state.send_if_modified(|state| {
			admitted = *state == SessionState::Idle;
			if admitted {
				*state = SessionState::Starting;
			}
			admitted
		});
		if !admitted {
			return Err(Error::InvalidState {
				operation: "start",
				state: shared.state(),
			});
		}

		debug!(target = "rtcswarm.session", session = %shared.id, "start");

		let options = shared.config.launch.to_options();
		let browser = match shared.driver.launch(&options).await {
			Ok(browser) => browser,
			Err(err) => {
				error!(target = "rtcswarm.session", session = %shared.id, error = %err, "start error");
				self.stop().await;
				return Err(Error::Launch(err.to_string()));
			}
		};

		// subscribe first: a disconnect after this point reaches the watcher,
		// one before it shows in is_connected()
		let browser_events = browser.events();

		let admitted = {
			let mut slot = shared.browser.lock();
			// stop() takes the browser under this lock after leaving Starting
			let admitted = shared.state() == SessionState::Starting;
			if admitted {
				*slot = Some(Arc::clone(&browser));
			}
			admitted
		};
		if !admitted {
			// stopped while the browser was launching
			if let Err(err) = browser.close().await {
				warn!(target = "rtcswarm.session", session = %shared.id, error = %err, "browser close error");
			}
			return Err(Error::InvalidState {
				operation: "start",
				state: shared.state(),
			});
		}

		if !browser.is_connected() {
			warn!(target = "rtcswarm.session", session = %shared.id, "browser disconnected during launch");
			self.stop().await;
			return Err(Error::BrowserGone);
		}
		shared.track(tokio::spawn(watch_disconnect(Arc::downgrade(shared), browser_events)));

		for index in 0..shared.config.tabs_per_session {
			let delay = shared.config.stagger_delay(index);
			let weak = Arc::downgrade(shared);
			shared.track(tokio::spawn(async move {
				tokio::time::sleep(delay).await;
				let Some(shared) = weak.upgrade() else {
					return;
				};
				if let Err(err) = tab::open(&shared, index).await {
					error!(target = "rtcswarm.tab", session = %shared.id, tab = index, error = %err, "failed to open tab");
				}
			}));
		}

		shared.track(tokio::spawn(stats::run(Arc::downgrade(shared), shared.config.stats_interval())));

		let running = shared.state.send_if_modified(|state| {
			let starting = *state == SessionState::Starting;
			if starting {
				*state = SessionState::Running;
			}
			starting
		});
		if !running {
			return Err(Error::InvalidState {
				operation: "start",
				state: shared.state(),
			});
		}

		info!(
			target = "rtcswarm.session",
			session = %shared.id,
			tabs = shared.config.tabs_per_session,
			spawn_period_ms = shared.config.spawn_period_ms,
			"session running"
		);
		shared.emit(SessionEvent::Started);
		Ok(())
	}

	/// Tears the session down: cancels every pending task, closes the browser
	/// (failures are logged and swallowed) and forgets all tabs.
	///
	/// Idempotent. Every call ends in [`SessionState::Stopped`] and emits
	/// [`SessionEvent::Stopped`]; a call racing an in-progress stop waits for it.
	pub async fn stop(&self) {
		let shared = &self.shared;
		debug!(target = "rtcswarm.session", session = %shared.id, "stop");

		let mut prior = SessionState::Idle;
		shared.state.send_if_modified(|state| {
			prior = *state;
			match prior {
				SessionState::Stopping | SessionState::Stopped => false,
				_ => {
					*state = SessionState::Stopping;
					true
				}
			}
		});

		match prior {
			SessionState::Stopping => {
				self.wait_stopped().await;
				shared.emit(SessionEvent::Stopped);
				return;
			}
			SessionState::Stopped => {
				shared.state.send_replace(SessionState::Stopped);
				shared.emit(SessionEvent::Stopped);
				return;
			}
			_ => {}
		}

		let tasks = std::mem::take(&mut *shared.tasks.lock());
		for task in tasks {
			task.abort();
		}

		let browser = shared.browser.lock().take();
		if let Some(browser) = browser {
			if let Err(err) = browser.close().await {
				error!(target = "rtcswarm.session", session = %shared.id, error = %err, "browser close error");
			}
		}
		shared.tabs.lock().clear();

		shared.state.send_replace(SessionState::Stopped);
		info!(target = "rtcswarm.session", session = %shared.id, "session stopped");
		shared.emit(SessionEvent::Stopped);
	}

	/// Resolves once the session reaches [`SessionState::Stopped`].
	pub async fn wait_stopped(&self) {
		let mut state = self.shared.state.subscribe();
		let _ = state.wait_for(|state| *state == SessionState::Stopped).await;
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("id", &self.shared.id)
			.field("state", &self.shared.state())
			.finish()
	}
}

/// Stops the session when the browser goes away.
///
/// The stop runs in a detached task: this watcher is itself aborted by
/// `stop()`, which would otherwise cancel the teardown halfway.
async fn watch_disconnect(shared: Weak<Shared>, mut events: broadcast::Receiver<BrowserEvent>) {
	loop {
		match events.recv().await {
			Ok(BrowserEvent::Disconnected) | Err(broadcast::error::RecvError::Closed) => break,
			Err(broadcast::error::RecvError::Lagged(_)) => continue,
		}
	}

	let Some(shared) = shared.upgrade() else {
		return;
	};
	warn!(target = "rtcswarm.session", session = %shared.id, "browser disconnected");
	let session = Session { shared };
	tokio::spawn(async move { session.stop().await });
}
