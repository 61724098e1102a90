use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rtcswarm_protocol::PeerConnectionSample;
use serde_json::Value;
use tracing::{debug, warn};

use super::{MetricKey, MetricStore, Timestamp};

/// Store shared by every tab of a session.
pub type SharedStore = Arc<Mutex<MetricStore>>;

/// Outcome of ingesting one sample batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
	/// Store writes performed (received, sent and jitter updates).
	pub updated: usize,
	/// Records in a raw payload that did not match the sample schema.
	pub rejected: usize,
	/// Keys dropped by the sweep that followed the batch.
	pub expired: Vec<MetricKey>,
}

/// Folds sample batches from one tab into the session's [`MetricStore`].
#[derive(Clone)]
pub struct SampleIngestor {
	tab: usize,
	store: SharedStore,
	ttl: Duration,
}

impl SampleIngestor {
	pub fn new(tab: usize, store: SharedStore, ttl: Duration) -> Self {
		Self { tab, store, ttl }
	}

	pub fn tab(&self) -> usize {
		self.tab
	}

	/// Applies one batch, then sweeps expired keys.
	///
	/// The store stays locked for the whole batch, so readers and other tabs
	/// never observe it half-applied.
	pub fn ingest(&self, samples: &[PeerConnectionSample], now: Timestamp) -> IngestReport {
		let mut report = IngestReport::default();
		let mut store = self.store.lock();

		for sample in samples {
			let connection = sample.peer_connection_id.as_str();

			for stat in &sample.receiver_stats.inbound_rtp_stats {
				let Some(bytes) = stat.bytes_received else {
					debug!(target = "rtcswarm.metrics", tab = self.tab, connection, stat = %stat.id, "inbound stat without byte counter");
					continue;
				};
				store.upsert_received(MetricKey::new(self.tab, connection, &stat.id), bytes, now);
				report.updated += 1;
			}

			for track in &sample.receiver_stats.tracks {
				if track.jitter_buffer_emitted_count == 0 {
					continue;
				}
				let key = MetricKey::new(self.tab, connection, &track.id);
				if store.upsert_jitter(key, track.jitter_buffer_delay, track.jitter_buffer_emitted_count, track.media_type, now) {
					report.updated += 1;
				}
			}

			for stat in &sample.sender_stats.outbound_rtp_stats {
				let Some(bytes) = stat.bytes_sent else {
					debug!(target = "rtcswarm.metrics", tab = self.tab, connection, stat = %stat.id, "outbound stat without byte counter");
					continue;
				};
				store.upsert_sent(MetricKey::new(self.tab, connection, &stat.id), bytes, now);
				report.updated += 1;
			}
		}

		report.expired = store.sweep_expired(now, self.ttl);
		drop(store);

		for key in &report.expired {
			debug!(target = "rtcswarm.metrics", key = %key, "expired stat");
		}
		report
	}

	/// Decodes a raw sample list as delivered by the page, then ingests it.
	///
	/// Records that do not match the schema are skipped individually; a
	/// payload that is not a list is rejected as a whole.
	pub fn ingest_json(&self, payload: Value, now: Timestamp) -> IngestReport {
		let Value::Array(records) = payload else {
			warn!(target = "rtcswarm.metrics", tab = self.tab, "sample payload is not a list; dropped");
			let mut report = self.ingest(&[], now);
			report.rejected = 1;
			return report;
		};

		let mut rejected = 0;
		let samples: Vec<PeerConnectionSample> = records
			.into_iter()
			.filter_map(|record| match serde_json::from_value(record) {
				Ok(sample) => Some(sample),
				Err(err) => {
					warn!(target = "rtcswarm.metrics", tab = self.tab, error = %err, "malformed sample record skipped");
					rejected += 1;
					None
				}
			})
			.collect();

		let mut report = self.ingest(&samples, now);
		report.rejected = rejected;
		report
	}
}
