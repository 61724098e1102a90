use std::collections::HashMap;
use std::time::Duration;

use rtcswarm_protocol::{MediaType, StatsSnapshot};

use super::rate::{avg_jitter_buffer_delay, bitrate};
use super::{MetricKey, Timestamp};

/// Last observation of a cumulative byte counter and the rate derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Counter {
	pub bytes: u64,
	pub observed_at: Timestamp,
	/// Bits per millisecond; `None` until the counter was observed twice.
	pub bitrate: Option<f64>,
}

impl Counter {
	fn first(bytes: u64, now: Timestamp) -> Self {
		Self {
			bytes,
			observed_at: now,
			bitrate: None,
		}
	}

	fn advance(&mut self, bytes: u64, now: Timestamp) {
		if let Some(rate) = bitrate(self.bytes, bytes, self.observed_at, now) {
			self.bitrate = Some(rate);
		}
		self.bytes = bytes;
		self.observed_at = now;
	}
}

/// Everything known about one [`MetricKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricState {
	/// Time of the most recent write of any kind; drives expiry.
	pub last_seen: Timestamp,
	pub received: Option<Counter>,
	pub sent: Option<Counter>,
	pub avg_audio_jitter_buffer_delay: Option<f64>,
	pub avg_video_jitter_buffer_delay: Option<f64>,
}

impl MetricState {
	fn new(now: Timestamp) -> Self {
		Self {
			last_seen: now,
			received: None,
			sent: None,
			avg_audio_jitter_buffer_delay: None,
			avg_video_jitter_buffer_delay: None,
		}
	}
}

/// Per-key metric table.
///
/// One record per key, so removing a key drops every value derived for it at
/// once; the legacy map-per-metric shape is only produced by [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct MetricStore {
	entries: HashMap<MetricKey, MetricState>,
}

impl MetricStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a received-bytes observation, deriving the receive bitrate from the previous one.
	pub fn upsert_received(&mut self, key: MetricKey, bytes_received: u64, now: Timestamp) {
		let state = self.entries.entry(key).or_insert_with(|| MetricState::new(now));
		match state.received.as_mut() {
			Some(counter) => counter.advance(bytes_received, now),
			None => state.received = Some(Counter::first(bytes_received, now)),
		}
		state.last_seen = now;
	}

	/// Records a sent-bytes observation, deriving the send bitrate from the previous one.
	pub fn upsert_sent(&mut self, key: MetricKey, bytes_sent: u64, now: Timestamp) {
		let state = self.entries.entry(key).or_insert_with(|| MetricState::new(now));
		match state.sent.as_mut() {
			Some(counter) => counter.advance(bytes_sent, now),
			None => state.sent = Some(Counter::first(bytes_sent, now)),
		}
		state.last_seen = now;
	}

	/// Records the averaged jitter-buffer delay of a track.
	///
	/// Nothing is written (not even a zero) when `emitted_count` is zero or the
	/// media type is neither audio nor video. Returns whether a value was stored.
	pub fn upsert_jitter(&mut self, key: MetricKey, delay: f64, emitted_count: u64, media_type: MediaType, now: Timestamp) -> bool {
		let Some(avg) = avg_jitter_buffer_delay(delay, emitted_count) else {
			return false;
		};
		let is_audio = match media_type {
			MediaType::Audio => true,
			MediaType::Video => false,
			MediaType::Other => return false,
		};

		let state = self.entries.entry(key).or_insert_with(|| MetricState::new(now));
		if is_audio {
			state.avg_audio_jitter_buffer_delay = Some(avg);
		} else {
			state.avg_video_jitter_buffer_delay = Some(avg);
		}
		state.last_seen = now;
		true
	}

	/// Removes every key silent for longer than `ttl` and returns them, sorted.
	///
	/// Age is measured from each key's own last write, so a key written in the
	/// batch that triggers the sweep always survives it.
	pub fn sweep_expired(&mut self, now: Timestamp, ttl: Duration) -> Vec<MetricKey> {
		let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
		let mut expired = Vec::new();
		self.entries.retain(|key, state| {
			let keep = now.saturating_sub(state.last_seen) <= ttl_ms;
			if !keep {
				expired.push(key.clone());
			}
			keep
		});
		expired.sort();
		expired
	}

	pub fn get(&self, key: &MetricKey) -> Option<&MetricState> {
		self.entries.get(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Copies the table into the legacy per-metric map shape.
	///
	/// `cpu` and `memory` are left at zero; the session fills them in.
	pub fn snapshot(&self) -> StatsSnapshot {
		let mut snapshot = StatsSnapshot::default();
		for (key, state) in &self.entries {
			let name = key.to_string();
			if let Some(counter) = state.received {
				snapshot.bytes_received.insert(name.clone(), counter.bytes);
				if let Some(rate) = counter.bitrate {
					snapshot.recv_bitrates.insert(name.clone(), rate);
				}
			}
			if let Some(counter) = state.sent {
				snapshot.bytes_sent.insert(name.clone(), counter.bytes);
				if let Some(rate) = counter.bitrate {
					snapshot.send_bitrates.insert(name.clone(), rate);
				}
			}
			if let Some(avg) = state.avg_audio_jitter_buffer_delay {
				snapshot.avg_audio_jitter_buffer_delay.insert(name.clone(), avg);
			}
			if let Some(avg) = state.avg_video_jitter_buffer_delay {
				snapshot.avg_video_jitter_buffer_delay.insert(name.clone(), avg);
			}
			snapshot.timestamps.insert(name, state.last_seen);
		}
		snapshot
	}
}
