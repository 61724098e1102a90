use std::fmt;

/// Identity of one reported sub-stream: an inbound or outbound RTP stream, or a track.
///
/// The struct itself is the store key. [`Display`](fmt::Display) renders the
/// `{tab}_{connection}_{stat}` form used by [`StatsSnapshot`]; `_` and `%` in
/// the connection id are percent-escaped so the first two `_` always delimit
/// the fields. Stat ids are rendered verbatim.
///
/// [`StatsSnapshot`]: rtcswarm_protocol::StatsSnapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
	pub tab: usize,
	pub connection: String,
	pub stat: String,
}

impl MetricKey {
	pub fn new(tab: usize, connection: impl Into<String>, stat: impl Into<String>) -> Self {
		Self {
			tab,
			connection: connection.into(),
			stat: stat.into(),
		}
	}
}

impl fmt::Display for MetricKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}_", self.tab)?;
		for ch in self.connection.chars() {
			match ch {
				'%' => f.write_str("%25")?,
				'_' => f.write_str("%5F")?,
				c => write!(f, "{c}")?,
			}
		}
		write!(f, "_{}", self.stat)
	}
}
