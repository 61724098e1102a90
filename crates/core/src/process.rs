//! Process-level resource sampling for a session's browser.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::error::{Error, Result};

/// CPU and memory of a browser process tree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessStats {
	/// Percent of one core, summed over the tree.
	pub cpu: f64,
	/// Resident memory in bytes, summed over the tree.
	pub memory: u64,
}

/// Samples resource usage of a process by pid.
#[async_trait]
pub trait ProcessStatsProvider: Send + Sync {
	async fn process_stats(&self, pid: u32) -> Result<ProcessStats>;
}

/// [`ProcessStatsProvider`] backed by `sysinfo`.
///
/// Reports the process and all of its descendants, since a browser spreads its
/// work over renderer and utility children. The `System` is kept between calls
/// so CPU usage is measured over the interval since the previous sample; the
/// first sample of a pid reports zero CPU.
#[derive(Clone)]
pub struct SysinfoProcessStats {
	system: Arc<Mutex<System>>,
}

impl SysinfoProcessStats {
	pub fn new() -> Self {
		Self {
			system: Arc::new(Mutex::new(System::new())),
		}
	}
}

impl Default for SysinfoProcessStats {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ProcessStatsProvider for SysinfoProcessStats {
	async fn process_stats(&self, pid: u32) -> Result<ProcessStats> {
		let system = Arc::clone(&self.system);
		let sampled = tokio::task::spawn_blocking(move || {
			let mut system = system.lock();
			system.refresh_processes(ProcessesToUpdate::All, true);
			let rows = system
				.processes()
				.iter()
				.filter(|(_, process)| process.thread_kind().is_none())
				.map(|(pid, process)| ProcessRow {
					pid: pid.as_u32(),
					parent: process.parent().map(Pid::as_u32),
					cpu: process.cpu_usage(),
					memory: process.memory(),
				})
				.collect::<Vec<_>>();
			aggregate_tree(pid, &rows)
		})
		.await
		.map_err(|err| Error::ProcessStats {
			pid,
			reason: err.to_string(),
		})?;

		sampled.ok_or_else(|| Error::ProcessStats {
			pid,
			reason: "no such process".to_string(),
		})
	}
}

#[derive(Debug, Clone, Copy)]
struct ProcessRow {
	pid: u32,
	parent: Option<u32>,
	cpu: f32,
	memory: u64,
}

/// Sums `root` and its descendants; `None` when `root` is not in `rows`.
fn aggregate_tree(root: u32, rows: &[ProcessRow]) -> Option<ProcessStats> {
	let by_pid: HashMap<u32, &ProcessRow> = rows.iter().map(|row| (row.pid, row)).collect();
	by_pid.get(&root)?;

	let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
	for row in rows {
		if let Some(parent) = row.parent {
			if parent != row.pid {
				children.entry(parent).or_default().push(row.pid);
			}
		}
	}

	let mut stats = ProcessStats::default();
	let mut pending = vec![root];
	while let Some(pid) = pending.pop() {
		if let Some(row) = by_pid.get(&pid) {
			stats.cpu += f64::from(row.cpu);
			stats.memory += row.memory;
		}
		if let Some(kids) = children.get(&pid) {
			pending.extend(kids);
		}
	}
	Some(stats)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn row(pid: u32, parent: Option<u32>, cpu: f32, memory: u64) -> ProcessRow {
		ProcessRow { pid, parent, cpu, memory }
	}

	#[test]
	fn sums_root_and_descendants_only() {
		let rows = [
			row(1, None, 1.0, 1),
			row(100, Some(1), 10.0, 1000),
			row(101, Some(100), 20.0, 2000),
			row(102, Some(101), 5.0, 500),
			row(200, Some(1), 50.0, 9999),
		];

		let stats = aggregate_tree(100, &rows).unwrap();
		assert_eq!(stats.cpu, 35.0);
		assert_eq!(stats.memory, 3500);
	}

	#[test]
	fn missing_root_is_none() {
		assert!(aggregate_tree(7, &[row(1, None, 0.0, 0)]).is_none());
	}

	#[tokio::test]
	async fn samples_own_process() {
		let provider = SysinfoProcessStats::new();
		let stats = provider.process_stats(std::process::id()).await.unwrap();
		assert!(stats.memory > 0);
	}
}
