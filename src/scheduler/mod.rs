//! Periodic session garbage collection
//!
//! The manager never schedules its own sweeps; this module owns the timer.
//! The sweep runs in its own tokio task with an independent interval.

use crate::manager::Manager;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Outcome of one sweep, for logging
#[derive(Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    Removed(usize),
    Failed(String),
}

/// Run one sweep and log the result.
pub fn run_gc_once(manager: &Manager) -> SweepOutcome {
    match manager.gc() {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!(
                    "Scheduler: expired {} idle sessions ({} live)",
                    removed,
                    manager.session_count()
                );
            } else {
                tracing::debug!("Scheduler: GC completed (no expired sessions)");
            }
            SweepOutcome::Removed(removed)
        }
        Err(e) => {
            tracing::warn!("Scheduler: GC failed: {}", e);
            SweepOutcome::Failed(e.to_string())
        }
    }
}

/// Start the periodic GC task. Returns `None` when `interval` is zero.
pub fn start_gc_task(manager: Arc<Manager>, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("Scheduler: session GC is disabled");
        return None;
    }

    tracing::info!(
        "Scheduler: starting session GC (every {}s, max idle {}s)",
        interval.as_secs(),
        manager.max_lifetime().as_secs()
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        // Skip the first immediate tick (sweeps run after the interval, not immediately)
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_gc_once(&manager);
        }
    }))
}
