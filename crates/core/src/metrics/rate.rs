//! Rates derived from cumulative counters.

use super::Timestamp;

/// Bitrate between two observations of a cumulative byte counter.
///
/// Timestamps are milliseconds, so the result is bits per millisecond
/// (numerically kbit/s). Returns `None` unless `cur_ts > prev_ts`.
pub fn bitrate(prev_bytes: u64, cur_bytes: u64, prev_ts: Timestamp, cur_ts: Timestamp) -> Option<f64> {
	if cur_ts <= prev_ts {
		return None;
	}
	let rate = 8.0 * (cur_bytes as f64 - prev_bytes as f64) / (cur_ts - prev_ts) as f64;
	rate.is_finite().then_some(rate)
}

/// Average jitter-buffer delay per emitted sample; `None` before anything was emitted.
pub fn avg_jitter_buffer_delay(delay_sum: f64, emitted_count: u64) -> Option<f64> {
	if emitted_count == 0 {
		return None;
	}
	let avg = delay_sum / emitted_count as f64;
	avg.is_finite().then_some(avg)
}
