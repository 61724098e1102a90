//! In-memory browser driver for exercising sessions without a browser.
//!
//! [`MockDriver`] hands out [`MockBrowser`]s whose pages record every call and
//! emit lifecycle events on demand. Offsets are measured on tokio's clock, so
//! tests running with paused time see exact delays.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::driver::{BrowserDriver, BrowserEvent, BrowserHandle, PageEvent, PageHandle, ScriptTag};
use crate::error::{Error, Result};
use crate::handlers::ExposedFn;
use crate::launch::LaunchOptions;
use crate::process::{ProcessStats, ProcessStatsProvider};

pub(crate) const MOCK_PID: u32 = 4242;

/// Records an action performed on a [`MockPage`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MockAction {
	Expose(String),
	Goto(String),
	AddScript(ScriptTag),
	BringToFront,
}

pub(crate) struct MockDriver {
	started_at: Instant,
	launch_delay: Mutex<Duration>,
	fail_launch: AtomicBool,
	disconnect_on_launch: AtomicBool,
	close_during_goto: Arc<AtomicUsize>,
	fail_goto: AtomicBool,
	fail_close: AtomicBool,
	launches: Mutex<Vec<LaunchOptions>>,
	browsers: Mutex<Vec<Arc<MockBrowser>>>,
}

impl MockDriver {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self {
			started_at: Instant::now(),
			launch_delay: Mutex::new(Duration::ZERO),
			fail_launch: AtomicBool::new(false),
			disconnect_on_launch: AtomicBool::new(false),
			close_during_goto: Arc::new(AtomicUsize::new(0)),
			fail_goto: AtomicBool::new(false),
			fail_close: AtomicBool::new(false),
			launches: Mutex::new(Vec::new()),
			browsers: Mutex::new(Vec::new()),
		})
	}

	pub(crate) fn fail_launch(&self) {
		self.fail_launch.store(true, Ordering::SeqCst);
	}

	/// Makes `launch` take `delay` on tokio's clock.
	pub(crate) fn slow_launch(&self, delay: Duration) {
		*self.launch_delay.lock() = delay;
	}

	/// Launched browsers lose their connection before `launch` returns.
	pub(crate) fn disconnect_on_launch(&self) {
		self.disconnect_on_launch.store(true, Ordering::SeqCst);
	}

	/// The next `count` navigations close their page, then fail.
	pub(crate) fn close_during_goto(&self, count: usize) {
		self.close_during_goto.store(count, Ordering::SeqCst);
	}

	/// Every page of browsers launched afterwards fails to navigate.
	pub(crate) fn fail_goto(&self) {
		self.fail_goto.store(true, Ordering::SeqCst);
	}

	pub(crate) fn fail_close(&self) {
		self.fail_close.store(true, Ordering::SeqCst);
	}

	pub(crate) fn launches(&self) -> Vec<LaunchOptions> {
		self.launches.lock().clone()
	}

	/// Most recently launched browser.
	pub(crate) fn browser(&self) -> Arc<MockBrowser> {
		self.browsers.lock().last().cloned().expect("no browser launched")
	}
}

#[async_trait]
impl BrowserDriver for MockDriver {
	async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserHandle>> {
		self.launches.lock().push(options.clone());
		let delay = *self.launch_delay.lock();
		tokio::time::sleep(delay).await;
		if self.fail_launch.load(Ordering::SeqCst) {
			return Err(Error::Driver("chromium not found".into()));
		}
		let browser = Arc::new(MockBrowser::new(
			self.started_at,
			self.fail_goto.load(Ordering::SeqCst),
			self.fail_close.load(Ordering::SeqCst),
			Arc::clone(&self.close_during_goto),
		));
		self.browsers.lock().push(Arc::clone(&browser));
		if self.disconnect_on_launch.load(Ordering::SeqCst) {
			browser.disconnect();
		}
		Ok(browser)
	}
}

pub(crate) struct MockBrowser {
	started_at: Instant,
	fail_goto: bool,
	fail_close: bool,
	close_during_goto: Arc<AtomicUsize>,
	events: broadcast::Sender<BrowserEvent>,
	pages: Mutex<Vec<Arc<MockPage>>>,
	opened_at: Mutex<Vec<Duration>>,
	closed: AtomicBool,
	disconnected: AtomicBool,
}

impl MockBrowser {
	fn new(started_at: Instant, fail_goto: bool, fail_close: bool, close_during_goto: Arc<AtomicUsize>) -> Self {
		let (events, _) = broadcast::channel(16);
		Self {
			started_at,
			fail_goto,
			fail_close,
			close_during_goto,
			events,
			pages: Mutex::new(Vec::new()),
			opened_at: Mutex::new(Vec::new()),
			closed: AtomicBool::new(false),
			disconnected: AtomicBool::new(false),
		}
	}

	/// Offsets from driver creation at which `new_page` was called.
	pub(crate) fn opened_at(&self) -> Vec<Duration> {
		self.opened_at.lock().clone()
	}

	pub(crate) fn opened_at_ms(&self) -> Vec<u128> {
		self.opened_at().iter().map(Duration::as_millis).collect()
	}

	/// Every page ever created, closed ones included.
	pub(crate) fn all_pages(&self) -> Vec<Arc<MockPage>> {
		self.pages.lock().clone()
	}

	/// Pages that are still open and were navigated to `url`.
	pub(crate) fn live_pages_at(&self, url: &str) -> usize {
		self.pages
			.lock()
			.iter()
			.filter(|page| !page.is_closed() && page.url().as_deref() == Some(url))
			.count()
	}

	pub(crate) fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	pub(crate) fn disconnect(&self) {
		self.disconnected.store(true, Ordering::SeqCst);
		let _ = self.events.send(BrowserEvent::Disconnected);
	}
}

#[async_trait]
impl BrowserHandle for MockBrowser {
	async fn new_page(&self) -> Result<Arc<dyn PageHandle>> {
		if self.is_closed() {
			return Err(Error::BrowserGone);
		}
		self.opened_at.lock().push(self.started_at.elapsed());
		let page = Arc::new(MockPage::new(self.fail_goto, Arc::clone(&self.close_during_goto)));
		self.pages.lock().push(Arc::clone(&page));
		Ok(page)
	}

	async fn pages(&self) -> Result<Vec<Arc<dyn PageHandle>>> {
		Ok(self
			.pages
			.lock()
			.iter()
			.filter(|page| !page.is_closed())
			.map(|page| Arc::clone(page) as Arc<dyn PageHandle>)
			.collect())
	}

	async fn close(&self) -> Result<()> {
		if self.fail_close {
			return Err(Error::Driver("target closed".into()));
		}
		self.closed.store(true, Ordering::SeqCst);
		for page in self.all_pages() {
			page.close();
		}
		self.disconnect();
		Ok(())
	}

	fn pid(&self) -> Option<u32> {
		Some(MOCK_PID)
	}

	fn is_connected(&self) -> bool {
		!self.disconnected.load(Ordering::SeqCst)
	}

	fn events(&self) -> broadcast::Receiver<BrowserEvent> {
		self.events.subscribe()
	}
}

pub(crate) struct MockPage {
	fail_goto: bool,
	close_during_goto: Arc<AtomicUsize>,
	events: broadcast::Sender<PageEvent>,
	exposed: Mutex<HashMap<String, ExposedFn>>,
	actions: Mutex<Vec<MockAction>>,
	url: Mutex<Option<String>>,
	closed: AtomicBool,
}

impl MockPage {
	fn new(fail_goto: bool, close_during_goto: Arc<AtomicUsize>) -> Self {
		let (events, _) = broadcast::channel(64);
		Self {
			fail_goto,
			close_during_goto,
			events,
			exposed: Mutex::new(HashMap::new()),
			actions: Mutex::new(Vec::new()),
			url: Mutex::new(None),
			closed: AtomicBool::new(false),
		}
	}

	pub(crate) fn actions(&self) -> Vec<MockAction> {
		self.actions.lock().clone()
	}

	pub(crate) fn scripts(&self) -> Vec<ScriptTag> {
		self.actions()
			.into_iter()
			.filter_map(|action| match action {
				MockAction::AddScript(tag) => Some(tag),
				_ => None,
			})
			.collect()
	}

	pub(crate) fn url(&self) -> Option<String> {
		self.url.lock().clone()
	}

	pub(crate) fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Simulates the page calling `window[name](...args)`.
	pub(crate) async fn call(&self, name: &str, args: Value) -> Result<()> {
		let handler = self.exposed.lock().get(name).cloned();
		match handler {
			Some(handler) => handler(args).await,
			None => Err(Error::Driver(format!("{name} is not exposed"))),
		}
	}

	pub(crate) fn console(&self, text: &str) {
		let _ = self.events.send(PageEvent::Console(text.to_string()));
	}

	/// Closes the page as if the user shut the tab.
	pub(crate) fn close(&self) {
		if !self.closed.swap(true, Ordering::SeqCst) {
			let _ = self.events.send(PageEvent::Close);
		}
	}
}

#[async_trait]
impl PageHandle for MockPage {
	async fn goto(&self, url: &str) -> Result<()> {
		self.actions.lock().push(MockAction::Goto(url.to_string()));
		if self.close_during_goto.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1)).is_ok() {
			self.close();
			tokio::task::yield_now().await;
			return Err(Error::Driver("target closed".into()));
		}
		if self.fail_goto {
			return Err(Error::Driver("net::ERR_NAME_NOT_RESOLVED".into()));
		}
		*self.url.lock() = Some(url.to_string());
		let _ = self.events.send(PageEvent::DomContentLoaded);
		Ok(())
	}

	async fn expose_function(&self, name: &str, handler: ExposedFn) -> Result<()> {
		self.actions.lock().push(MockAction::Expose(name.to_string()));
		self.exposed.lock().insert(name.to_string(), handler);
		Ok(())
	}

	async fn add_script_tag(&self, tag: ScriptTag) -> Result<()> {
		self.actions.lock().push(MockAction::AddScript(tag));
		Ok(())
	}

	async fn bring_to_front(&self) -> Result<()> {
		self.actions.lock().push(MockAction::BringToFront);
		Ok(())
	}

	fn events(&self) -> broadcast::Receiver<PageEvent> {
		self.events.subscribe()
	}
}

/// [`ProcessStatsProvider`] returning canned results after an optional delay.
pub(crate) struct MockStats {
	started_at: Instant,
	delay: Duration,
	results: Mutex<Vec<Result<ProcessStats>>>,
	calls: Mutex<Vec<(Duration, u32)>>,
	polls: AtomicUsize,
}

impl MockStats {
	pub(crate) fn new() -> Arc<Self> {
		Self::with_delay(Duration::ZERO)
	}

	pub(crate) fn with_delay(delay: Duration) -> Arc<Self> {
		Arc::new(Self {
			started_at: Instant::now(),
			delay,
			results: Mutex::new(Vec::new()),
			calls: Mutex::new(Vec::new()),
			polls: AtomicUsize::new(0),
		})
	}

	/// Queues the result of the next poll; once the queue is empty polls return defaults.
	pub(crate) fn push(&self, result: Result<ProcessStats>) {
		self.results.lock().push(result);
	}

	/// Offsets (from construction) at which polls started, with the pid asked for.
	pub(crate) fn calls(&self) -> Vec<(Duration, u32)> {
		self.calls.lock().clone()
	}

	pub(crate) fn polls(&self) -> usize {
		self.polls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ProcessStatsProvider for MockStats {
	async fn process_stats(&self, pid: u32) -> Result<ProcessStats> {
		self.calls.lock().push((self.started_at.elapsed(), pid));
		tokio::time::sleep(self.delay).await;
		self.polls.fetch_add(1, Ordering::SeqCst);
		let mut results = self.results.lock();
		if results.is_empty() {
			Ok(ProcessStats::default())
		} else {
			results.remove(0)
		}
	}
}
