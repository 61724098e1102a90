//! `replay`: push recorded batches through the aggregation engine offline.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use rtcswarm::protocol::{RecordedBatch, StatsSnapshot};
use rtcswarm::{MetricStore, SampleIngestor, SwarmConfig};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::ReplayArgs;
use crate::error::{CliError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayData {
	pub batches: usize,
	pub tabs: usize,
	pub updates: usize,
	/// Keys dropped by TTL sweeps during the replay, in drop order.
	pub expired: Vec<String>,
	pub snapshot: StatsSnapshot,
}

pub async fn execute(args: &ReplayArgs, config: &SwarmConfig) -> Result<ReplayData> {
	let ttl = args.ttl.map_or_else(|| config.stats_ttl(), Duration::from_secs);
	let raw = tokio::fs::read_to_string(&args.input)
		.await
		.with_context(|| format!("reading {}", args.input.display()))?;

	let data = replay(&raw, &args.input, ttl)?;
	info!(
		target = "rtcswarm.cli",
		batches = data.batches,
		keys = data.snapshot.key_count(),
		expired = data.expired.len(),
		"replay finished"
	);
	Ok(data)
}

/// Applies every non-blank line of `raw` in file order.
fn replay(raw: &str, path: &Path, ttl: Duration) -> Result<ReplayData> {
	let store = Arc::new(Mutex::new(MetricStore::new()));
	let mut ingestors: BTreeMap<usize, SampleIngestor> = BTreeMap::new();
	let mut batches = 0;
	let mut updates = 0;
	let mut expired = Vec::new();

	for (index, line) in raw.lines().enumerate() {
		if line.trim().is_empty() {
			continue;
		}
		let batch: RecordedBatch = serde_json::from_str(line).map_err(|source| CliError::Recording {
			path: path.to_path_buf(),
			line: index + 1,
			source,
		})?;

		let ingestor = ingestors
			.entry(batch.tab)
			.or_insert_with(|| SampleIngestor::new(batch.tab, Arc::clone(&store), ttl));
		let report = ingestor.ingest(&batch.samples, batch.timestamp);
		debug!(target = "rtcswarm.cli", line = index + 1, tab = batch.tab, updated = report.updated, "batch applied");

		batches += 1;
		updates += report.updated;
		expired.extend(report.expired.iter().map(ToString::to_string));
	}

	if batches == 0 {
		return Err(CliError::InvalidInput(format!("{} contains no batches", path.display())));
	}

	let snapshot = store.lock().snapshot();
	Ok(ReplayData {
		batches,
		tabs: ingestors.len(),
		updates,
		expired,
		snapshot,
	})
}
