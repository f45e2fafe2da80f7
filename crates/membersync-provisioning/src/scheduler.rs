//! Periodic cycle scheduling.
//!
//! Runs one cycle per interval, never two at once. A failed cycle is logged
//! and the loop keeps going; only the shutdown signal ends it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::cycle::CycleDriver;

/// Counters kept across cycles for the lifetime of a scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Cycles that completed.
    pub completed: u64,
    /// Cycles that aborted with an error.
    pub aborted: u64,
}

/// Runs a [`CycleDriver`] on a fixed interval.
pub struct CycleScheduler {
    driver: Arc<CycleDriver>,
    interval: Duration,
}

impl CycleScheduler {
    /// Create a scheduler; the first cycle runs immediately.
    #[must_use]
    pub fn new(driver: Arc<CycleDriver>, interval: Duration) -> Self {
        Self { driver, interval }
    }

    /// Interval between cycle starts.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// A cycle in progress is always allowed to finish; the signal is only
    /// observed between cycles and while sleeping.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> SchedulerSummary {
        info!(
            interval_secs = self.interval.as_secs(),
            guardrail_threshold = self.driver.config().guardrail_threshold,
            dry_run = self.driver.config().dry_run,
            "Cycle scheduler started"
        );

        let mut summary = SchedulerSummary::default();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown channel closed, stopping scheduler");
                        break;
                    }
                    continue;
                }
            }

            if *shutdown.borrow() {
                break;
            }

            match self.driver.run_cycle().await {
                Ok(_) => summary.completed += 1,
                Err(e) => {
                    summary.aborted += 1;
                    error!(
                        kind = e.kind(),
                        retryable = e.is_retryable(),
                        error = %e,
                        "Cycle aborted, retrying at next interval"
                    );
                }
            }
        }

        info!(
            completed = summary.completed,
            aborted = summary.aborted,
            "Cycle scheduler stopped"
        );
        summary
    }
}
