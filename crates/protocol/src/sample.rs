//! Sample batch schema pushed from a tab's instrumentation layer.
//!
//! One call of the exposed page callback delivers a JSON array of
//! [`PeerConnectionSample`] records, one per observed `RTCPeerConnection`.
//! Field names follow the instrumentation's output (`peerConnectionId`,
//! `inboundRTPStats`, ...); the shorter descriptive names (`connectionId`,
//! `inboundStreamStats`, ...) are accepted as aliases.

use serde::{Deserialize, Serialize};

/// Statistics sampled from one peer connection at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerConnectionSample {
	/// Identifier the instrumentation assigned to the peer connection.
	#[serde(alias = "connectionId")]
	pub peer_connection_id: String,
	/// Receive-side report.
	#[serde(default)]
	pub receiver_stats: ReceiverStats,
	/// Send-side report.
	#[serde(default)]
	pub sender_stats: SenderStats,
}

/// Receive-side sub-report of a [`PeerConnectionSample`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverStats {
	#[serde(default, rename = "inboundRTPStats", alias = "inboundStreamStats")]
	pub inbound_rtp_stats: Vec<InboundRtpStat>,
	#[serde(default, alias = "trackStats")]
	pub tracks: Vec<TrackStat>,
}

/// Send-side sub-report of a [`PeerConnectionSample`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenderStats {
	#[serde(default, rename = "outboundRTPStats", alias = "outboundStreamStats")]
	pub outbound_rtp_stats: Vec<OutboundRtpStat>,
}

/// Cumulative counters of one inbound RTP stream.
///
/// Streams that have not reported a counter yet omit `bytesReceived`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRtpStat {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bytes_received: Option<u64>,
}

/// Cumulative counters of one outbound RTP stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRtpStat {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bytes_sent: Option<u64>,
}

/// Receive-track statistics carrying jitter-buffer counters.
///
/// `jitter_buffer_delay` is the cumulative delay sum reported by the browser and
/// `jitter_buffer_emitted_count` the number of samples it covers; tracks that
/// have not emitted anything yet omit both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStat {
	pub id: String,
	pub media_type: MediaType,
	#[serde(default)]
	pub jitter_buffer_delay: f64,
	#[serde(default)]
	pub jitter_buffer_emitted_count: u64,
}

/// Kind of media carried by a stream or track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
	Audio,
	Video,
	/// Anything the instrumentation reports that is neither audio nor video.
	#[serde(other)]
	Other,
}

/// One sample batch as captured for offline replay.
///
/// Recordings are newline-delimited JSON, one batch per line, with the
/// millisecond timestamp at which the batch was delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedBatch {
	/// Tab index the batch originated from.
	pub tab: usize,
	/// Delivery time in milliseconds.
	pub timestamp: u64,
	pub samples: Vec<PeerConnectionSample>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_instrumentation_output() {
		let json = r#"[{
			"peerConnectionId": "pc-1",
			"receiverStats": {
				"inboundRTPStats": [
					{ "id": "RTCInboundRTPAudioStream_362585473", "bytesReceived": 923, "mediaType": "audio", "jitter": 0 }
				],
				"tracks": [
					{ "id": "RTCMediaStreamTrack_receiver_5", "mediaType": "audio",
					  "jitterBufferDelay": 2659.2, "jitterBufferEmittedCount": 29760, "ended": false }
				]
			},
			"senderStats": {
				"outboundRTPStats": [
					{ "id": "RTCOutboundRTPVideoStream_505023861", "bytesSent": 245987, "mediaType": "video" }
				]
			}
		}]"#;

		let samples: Vec<PeerConnectionSample> = serde_json::from_str(json).unwrap();
		assert_eq!(samples.len(), 1);
		let sample = &samples[0];
		assert_eq!(sample.peer_connection_id, "pc-1");
		assert_eq!(sample.receiver_stats.inbound_rtp_stats[0].bytes_received, Some(923));
		assert_eq!(sample.receiver_stats.tracks[0].jitter_buffer_emitted_count, 29760);
		assert_eq!(sample.sender_stats.outbound_rtp_stats[0].bytes_sent, Some(245987));
	}

	#[test]
	fn accepts_descriptive_aliases() {
		let json = r#"{
			"connectionId": "conn1",
			"receiverStats": { "inboundStreamStats": [{ "id": "A", "bytesReceived": 1000 }], "trackStats": [] },
			"senderStats": { "outboundStreamStats": [] }
		}"#;

		let sample: PeerConnectionSample = serde_json::from_str(json).unwrap();
		assert_eq!(sample.peer_connection_id, "conn1");
		assert_eq!(sample.receiver_stats.inbound_rtp_stats[0].id, "A");
		assert!(sample.sender_stats.outbound_rtp_stats.is_empty());
	}

	#[test]
	fn missing_reports_default_to_empty() {
		let sample: PeerConnectionSample = serde_json::from_str(r#"{ "peerConnectionId": "pc" }"#).unwrap();
		assert!(sample.receiver_stats.inbound_rtp_stats.is_empty());
		assert!(sample.receiver_stats.tracks.is_empty());
		assert!(sample.sender_stats.outbound_rtp_stats.is_empty());
	}

	#[test]
	fn stream_without_byte_counter_still_parses() {
		let json = r#"{
			"peerConnectionId": "pc",
			"receiverStats": { "inboundRTPStats": [{ "id": "warming-up" }] },
			"senderStats": { "outboundRTPStats": [{ "id": "out", "bytesSent": 7 }] }
		}"#;

		let sample: PeerConnectionSample = serde_json::from_str(json).unwrap();
		assert_eq!(sample.receiver_stats.inbound_rtp_stats[0].bytes_received, None);
		assert_eq!(sample.sender_stats.outbound_rtp_stats[0].bytes_sent, Some(7));
	}

	#[test]
	fn track_without_jitter_counters_defaults_to_zero() {
		let track: TrackStat = serde_json::from_str(r#"{ "id": "t", "mediaType": "video" }"#).unwrap();
		assert_eq!(track.jitter_buffer_emitted_count, 0);
		assert_eq!(track.jitter_buffer_delay, 0.0);
	}

	#[test]
	fn unknown_media_type_maps_to_other() {
		let track: TrackStat = serde_json::from_str(r#"{ "id": "t", "mediaType": "data" }"#).unwrap();
		assert_eq!(track.media_type, MediaType::Other);
	}

	#[test]
	fn recorded_batch_line() {
		let line = r#"{"tab":2,"timestamp":1500,"samples":[{"peerConnectionId":"pc"}]}"#;
		let batch: RecordedBatch = serde_json::from_str(line).unwrap();
		assert_eq!(batch.tab, 2);
		assert_eq!(batch.timestamp, 1500);
		assert_eq!(batch.samples.len(), 1);
	}
}
