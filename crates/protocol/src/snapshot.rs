//! Aggregated session stats as read by external consumers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Point-in-time copy of a session's aggregated stats.
///
/// Every map is keyed by the rendered metric key (`{tab}_{connection}_{stat}`).
/// A key present in any value map is also present in `timestamps`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
	/// CPU usage of the browser process tree, in percent of one core.
	pub cpu: f64,
	/// Resident memory of the browser process tree, in bytes.
	pub memory: u64,
	/// Last write time of each key, in milliseconds.
	pub timestamps: BTreeMap<String, u64>,
	pub bytes_received: BTreeMap<String, u64>,
	/// Receive bitrate in bits per millisecond (kbit/s).
	pub recv_bitrates: BTreeMap<String, f64>,
	pub bytes_sent: BTreeMap<String, u64>,
	/// Send bitrate in bits per millisecond (kbit/s).
	pub send_bitrates: BTreeMap<String, f64>,
	pub avg_audio_jitter_buffer_delay: BTreeMap<String, f64>,
	pub avg_video_jitter_buffer_delay: BTreeMap<String, f64>,
}

impl StatsSnapshot {
	/// Number of metric keys tracked in this snapshot.
	pub fn key_count(&self) -> usize {
		self.timestamps.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serializes_with_legacy_field_names() {
		let mut snapshot = StatsSnapshot::default();
		snapshot.recv_bitrates.insert("0_pc_A".into(), 16.0);
		snapshot.avg_audio_jitter_buffer_delay.insert("0_pc_T".into(), 0.09);

		let value = serde_json::to_value(&snapshot).unwrap();
		assert_eq!(value["recvBitrates"]["0_pc_A"], 16.0);
		assert_eq!(value["avgAudioJitterBufferDelay"]["0_pc_T"], 0.09);
		for field in ["cpu", "memory", "timestamps", "bytesReceived", "bytesSent", "sendBitrates", "avgVideoJitterBufferDelay"] {
			assert!(value.get(field).is_some(), "missing field {field}");
		}
	}
}
