//! rtcswarm: browser-tab session orchestration with WebRTC telemetry aggregation
//!
//! A [`Session`] owns one browser instance and a fixed number of tabs. Each tab
//! is supervised independently: it is opened on a staggered schedule, pushes
//! WebRTC sample batches through an exposed page callback, and is re-opened a
//! fixed delay after it closes. Samples are folded into a [`MetricStore`] that
//! derives bitrates and jitter-buffer delays and forgets keys that stop
//! reporting.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Session                      │  lifecycle, stagger, stats timer
//! │  ┌────────────┐ ┌──────────┐ │
//! │  │ Tab 0..N   │ │ Stats    │ │  respawn loop / process poller
//! │  └─────┬──────┘ └────┬─────┘ │
//! │  ┌─────▼──────┐      │       │
//! │  │ Ingestor   │      │       │  sample batch -> store updates
//! │  └─────┬──────┘      │       │
//! │  ┌─────▼─────────────▼─────┐ │
//! │  │ MetricStore / snapshot  │ │
//! │  └─────────────────────────┘ │
//! └──────────────┬───────────────┘
//!                │ BrowserDriver / ProcessStatsProvider
//!          external capabilities
//! ```
//!
//! The browser itself is reached only through the [`driver`] traits, so the
//! engine runs unchanged against any automation backend (or a test double).

pub mod config;
pub mod driver;
pub mod error;
pub mod handlers;
pub mod instrumentation;
pub mod launch;
pub mod metrics;
pub mod process;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SwarmConfig;
pub use driver::{BrowserDriver, BrowserEvent, BrowserHandle, PageEvent, PageHandle, ScriptTag};
pub use error::{Error, Result};
pub use launch::{LaunchConfig, LaunchOptions, Viewport};
pub use metrics::{IngestReport, MetricKey, MetricState, MetricStore, SampleIngestor, Timestamp};
pub use process::{ProcessStats, ProcessStatsProvider, SysinfoProcessStats};
pub use rtcswarm_protocol as protocol;
pub use session::{Session, SessionEvent, SessionId, SessionState, TabState};
