//! Periodic job scheduler.
//!
//! Runs the reconciliation sweep, the order-count cache refresh and the
//! optional search reindex on fixed intervals. Every tick is gated by a
//! [`LeaderLock`], so deployments with several service instances elect one
//! runner per job instead of hammering the carrier from every replica.

use crate::engine::OrderEngine;
use async_trait::async_trait;
use orderflow_config::JobsConfig;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Election gate for periodic jobs.
///
/// `try_acquire` is non-blocking: a tick that loses the election is skipped,
/// not queued, since the next tick will retry anyway.
#[async_trait]
pub trait LeaderLock: Send + Sync {
	/// Attempts to become the runner of the named job.
	async fn try_acquire(&self, job: &str) -> bool;

	/// Releases the named job after a run.
	async fn release(&self, job: &str);
}

/// Leader lock for single-process deployments.
///
/// Serializes overlapping ticks of the same job within the process; a shared
/// backend (database lease, distributed lock) takes its place when several
/// instances run.
pub struct InProcessLeaderLock {
	held: Mutex<HashSet<String>>,
}

impl InProcessLeaderLock {
	/// Creates a lock with no jobs held.
	pub fn new() -> Self {
		Self {
			held: Mutex::new(HashSet::new()),
		}
	}
}

impl Default for InProcessLeaderLock {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl LeaderLock for InProcessLeaderLock {
	async fn try_acquire(&self, job: &str) -> bool {
		let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
		held.insert(job.to_string())
	}

	async fn release(&self, job: &str) {
		let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
		held.remove(job);
	}
}

/// Spawns and owns the periodic jobs of one engine.
pub struct Scheduler {
	engine: Arc<OrderEngine>,
	lock: Arc<dyn LeaderLock>,
	jobs: JobsConfig,
}

impl Scheduler {
	/// Creates a scheduler over the given engine and lock.
	pub fn new(engine: Arc<OrderEngine>, lock: Arc<dyn LeaderLock>, jobs: JobsConfig) -> Self {
		Self { engine, lock, jobs }
	}

	/// Spawns every enabled job and returns their task handles.
	pub fn spawn(self) -> Vec<JoinHandle<()>> {
		if !self.jobs.enabled {
			tracing::info!("Periodic jobs disabled by configuration");
			return Vec::new();
		}

		let mut handles = Vec::new();

		let engine = self.engine.clone();
		handles.push(spawn_job(
			"reconcile_shipments",
			Duration::from_secs(self.jobs.reconcile_interval_seconds),
			self.lock.clone(),
			move || {
				let engine = engine.clone();
				async move {
					match engine.reconcile_shipments().await {
						Ok(summary) => {
							tracing::debug!(
								scanned = summary.scanned,
								updated = summary.updated,
								"Reconciliation tick done"
							);
						},
						Err(e) => tracing::error!(error = %e, "Reconciliation tick failed"),
					}
				}
			},
		));

		let engine = self.engine.clone();
		handles.push(spawn_job(
			"refresh_order_count",
			Duration::from_secs(self.jobs.count_cache_interval_seconds),
			self.lock.clone(),
			move || {
				let engine = engine.clone();
				async move {
					if let Err(e) = engine.refresh_count_cache().await {
						tracing::error!(error = %e, "Order count refresh failed");
					}
				}
			},
		));

		if let Some(interval) = self.jobs.reindex_interval_seconds {
			let engine = self.engine.clone();
			handles.push(spawn_job(
				"reindex_search",
				Duration::from_secs(interval),
				self.lock.clone(),
				move || {
					let engine = engine.clone();
					async move {
						if let Err(e) = engine.reindex_search().await {
							tracing::error!(error = %e, "Search reindex failed");
						}
					}
				},
			));
		}

		tracing::info!(jobs = handles.len(), "Scheduler started");
		handles
	}
}

fn spawn_job<F, Fut>(
	name: &'static str,
	interval: Duration,
	lock: Arc<dyn LeaderLock>,
	run: F,
) -> JoinHandle<()>
where
	F: Fn() -> Fut + Send + 'static,
	Fut: Future<Output = ()> + Send,
{
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
		loop {
			ticker.tick().await;
			if !lock.try_acquire(name).await {
				tracing::debug!(job = name, "Tick skipped, another runner holds the job");
				continue;
			}
			run().await;
			lock.release(name).await;
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[tokio::test]
	async fn lock_admits_one_runner_per_job() {
		let lock = InProcessLeaderLock::new();
		assert!(lock.try_acquire("reconcile").await);
		assert!(!lock.try_acquire("reconcile").await);
		// Other jobs are independent.
		assert!(lock.try_acquire("reindex").await);

		lock.release("reconcile").await;
		assert!(lock.try_acquire("reconcile").await);
	}

	#[tokio::test]
	async fn losing_ticks_are_skipped_not_queued() {
		let lock: Arc<dyn LeaderLock> = Arc::new(InProcessLeaderLock::new());
		let runs = Arc::new(AtomicU32::new(0));

		// Hold the job, let a few ticks pass, then release.
		assert!(lock.try_acquire("job").await);
		let runs_in_job = runs.clone();
		let handle = spawn_job("job", Duration::from_millis(5), lock.clone(), move || {
			let runs = runs_in_job.clone();
			async move {
				runs.fetch_add(1, Ordering::SeqCst);
			}
		});

		tokio::time::sleep(Duration::from_millis(30)).await;
		assert_eq!(runs.load(Ordering::SeqCst), 0);

		lock.release("job").await;
		tokio::time::sleep(Duration::from_millis(30)).await;
		assert!(runs.load(Ordering::SeqCst) >= 1);
		handle.abort();
	}
}
