//! Browser-driver capability consumed by the session engine.
//!
//! The engine never launches or drives a browser itself. An automation backend
//! implements these traits; the engine only asks it to launch a browser, open
//! pages, navigate, expose a callback, inject scripts, and report lifecycle
//! events.
//!
//! Events are delivered over tokio broadcast channels. Subscribers only see
//! events emitted after they subscribed, so the engine subscribes to a page's
//! events before navigating it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::handlers::ExposedFn;
use crate::launch::LaunchOptions;

/// Launches browser instances.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
	/// Starts a browser with session-scoped launch options.
	async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserHandle>>;
}

/// One running browser instance, owned by exactly one session.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
	/// Opens a new blank page.
	async fn new_page(&self) -> Result<Arc<dyn PageHandle>>;

	/// Returns all currently open pages, in creation order.
	async fn pages(&self) -> Result<Vec<Arc<dyn PageHandle>>>;

	/// Closes the browser and every page in it.
	async fn close(&self) -> Result<()>;

	/// OS process id of the browser's main process, if it is local.
	fn pid(&self) -> Option<u32>;

	/// Whether the connection to the browser is still up.
	///
	/// Must read false before [`BrowserEvent::Disconnected`] is sent, so a
	/// subscriber that checks it after subscribing cannot miss a disconnect.
	fn is_connected(&self) -> bool;

	/// Subscribes to browser lifecycle events.
	fn events(&self) -> broadcast::Receiver<BrowserEvent>;
}

/// One browser tab.
#[async_trait]
pub trait PageHandle: Send + Sync {
	/// Navigates the page and waits for the load to commit.
	async fn goto(&self, url: &str) -> Result<()>;

	/// Installs `window[name]` in the page; calls are forwarded to `handler`
	/// in call order, with the call's arguments as one JSON array.
	async fn expose_function(&self, name: &str, handler: ExposedFn) -> Result<()>;

	/// Injects a `<script>` element into the current document.
	async fn add_script_tag(&self, tag: ScriptTag) -> Result<()>;

	/// Activates the page's tab.
	async fn bring_to_front(&self) -> Result<()>;

	/// Subscribes to page lifecycle events.
	fn events(&self) -> broadcast::Receiver<PageEvent>;
}

/// Events emitted by a [`BrowserHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
	/// The browser process exited or the connection to it was lost.
	Disconnected,
}

/// Events emitted by a [`PageHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
	/// The document finished parsing.
	DomContentLoaded,
	/// Text of a `console.*` call made by the page.
	Console(String),
	/// The page was closed. No further events follow.
	Close,
}

/// Script injected via [`PageHandle::add_script_tag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptTag {
	/// `<script src=...>`
	Url(String),
	/// Inline script body.
	Content(String),
}

impl ScriptTag {
	/// Returns the inline body, if this is an inline script.
	pub fn content(&self) -> Option<&str> {
		match self {
			ScriptTag::Content(body) => Some(body),
			ScriptTag::Url(_) => None,
		}
	}
}
