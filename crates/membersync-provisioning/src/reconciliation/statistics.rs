//! Cycle statistics tracking.
//!
//! Counters are accumulated through a [`StatisticsTracker`] while mutations
//! run (possibly several at once) and frozen into [`CycleStatistics`] at the
//! end of the cycle.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Counters for one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStatistics {
    /// Accounts reported by the directory (after exclusions).
    #[serde(default)]
    pub directory_accounts: u32,
    /// Accounts newly added to the store this cycle.
    #[serde(default)]
    pub accounts_provisioned: u32,
    /// Store rows with at least one mapped id.
    #[serde(default)]
    pub accounts_mapped: u32,
    /// Members in the snapshot.
    #[serde(default)]
    pub snapshot_size: u32,
    /// Transitions decided by the engine.
    #[serde(default)]
    pub transitions_planned: u32,
    /// Transitions applied to both directory and store.
    #[serde(default)]
    pub transitions_applied: u32,
    /// Transitions rejected by the directory.
    #[serde(default)]
    pub transitions_failed: u32,
    /// Transitions applied to the directory but not recorded in the store.
    #[serde(default)]
    pub transitions_indeterminate: u32,
    /// Transitions whose directory account no longer exists.
    #[serde(default)]
    pub transitions_skipped: u32,
    /// Unmapped members.
    #[serde(default)]
    pub drift: u32,
    /// Warnings raised by the engine.
    #[serde(default)]
    pub warnings: u32,
    /// Wall-clock duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl CycleStatistics {
    /// Create new empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every planned transition was fully applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.transitions_applied == self.transitions_planned
    }

    /// Transitions that will be retried next cycle.
    #[must_use]
    pub fn pending_retries(&self) -> u32 {
        self.transitions_failed + self.transitions_indeterminate
    }
}

/// Thread-safe tracker for the mutation phase.
pub struct StatisticsTracker {
    applied: AtomicU32,
    failed: AtomicU32,
    indeterminate: AtomicU32,
    skipped: AtomicU32,
    start_time: Instant,
}

impl StatisticsTracker {
    /// Create a new tracker; the cycle clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            applied: AtomicU32::new(0),
            failed: AtomicU32::new(0),
            indeterminate: AtomicU32::new(0),
            skipped: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a transition applied to directory and store.
    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a transition the directory rejected.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a transition left indeterminate.
    pub fn record_indeterminate(&self) {
        self.indeterminate.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a transition skipped for a missing directory account.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    /// Fold the mutation counters into `stats` and stamp the duration.
    pub fn finish(&self, stats: &mut CycleStatistics) {
        stats.transitions_applied = self.applied.load(Ordering::SeqCst);
        stats.transitions_failed = self.failed.load(Ordering::SeqCst);
        stats.transitions_indeterminate = self.indeterminate.load(Ordering::SeqCst);
        stats.transitions_skipped = self.skipped.load(Ordering::SeqCst);
        stats.duration_ms = u64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
    }
}

impl Default for StatisticsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_finish() {
        let tracker = StatisticsTracker::new();
        tracker.record_applied();
        tracker.record_applied();
        tracker.record_failed();
        tracker.record_indeterminate();
        tracker.record_skipped();

        let mut stats = CycleStatistics {
            transitions_planned: 5,
            ..CycleStatistics::new()
        };
        tracker.finish(&mut stats);

        assert_eq!(stats.transitions_applied, 2);
        assert_eq!(stats.pending_retries(), 2);
        assert_eq!(stats.transitions_skipped, 1);
        assert!(!stats.is_clean());
    }

    #[test]
    fn test_empty_cycle_is_clean() {
        assert!(CycleStatistics::new().is_clean());
    }
}
