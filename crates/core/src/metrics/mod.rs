//! Metric aggregation: keyed per-stream state derived from sample batches.

mod ingest;
mod key;
pub mod rate;
mod store;

use std::time::{SystemTime, UNIX_EPOCH};

pub use ingest::{IngestReport, SampleIngestor, SharedStore};
pub use key::MetricKey;
pub use store::{Counter, MetricState, MetricStore};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`].
pub fn now_ms() -> Timestamp {
	SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as Timestamp)
}
