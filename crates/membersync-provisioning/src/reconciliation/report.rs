//! Cycle report and its log rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::statistics::CycleStatistics;
use super::types::{DriftEntry, Transition, Warning};

/// Where a transition stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The directory account no longer exists.
    Orphaned,
    /// The directory rejected the change; the store row is untouched.
    Directory,
    /// The directory changed but the store write failed.
    Store,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Orphaned => write!(f, "orphaned"),
            Self::Directory => write!(f, "directory"),
            Self::Store => write!(f, "store"),
        }
    }
}

/// A transition that was not fully applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionFailure {
    /// The transition.
    pub transition: Transition,
    /// Stage that failed.
    pub stage: FailureStage,
    /// Error text for operators.
    pub error: String,
}

/// Complete report of one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Cycle ID, also attached to every log event of the cycle.
    pub cycle_id: Uuid,
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// When the cycle completed.
    pub completed_at: DateTime<Utc>,
    /// Whether mutations were suppressed.
    pub dry_run: bool,
    /// Whether the guardrail tripped.
    pub guardrail_tripped: bool,
    /// Accounts added to the store.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub provisioned: Vec<String>,
    /// Transitions applied (or, in a dry run, planned).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub applied: Vec<Transition>,
    /// Transitions that were not fully applied.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<TransitionFailure>,
    /// Unmapped members.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub drift: Vec<DriftEntry>,
    /// Engine warnings.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<Warning>,
    /// Counters.
    pub statistics: CycleStatistics,
}

impl CycleReport {
    /// Failures at a given stage.
    pub fn failures_at(&self, stage: FailureStage) -> impl Iterator<Item = &TransitionFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }

    /// Emit the drift report and the summary line.
    pub fn log(&self) {
        log_drift(self.cycle_id, &self.drift);

        let stats = &self.statistics;
        info!(
            cycle_id = %self.cycle_id,
            dry_run = self.dry_run,
            guardrail_tripped = self.guardrail_tripped,
            provisioned = stats.accounts_provisioned,
            planned = stats.transitions_planned,
            applied = stats.transitions_applied,
            failed = stats.transitions_failed,
            indeterminate = stats.transitions_indeterminate,
            skipped = stats.transitions_skipped,
            drift = stats.drift,
            warnings = stats.warnings,
            duration_ms = stats.duration_ms,
            "Cycle completed"
        );
    }
}

/// Log each engine warning.
pub fn log_warnings(cycle_id: Uuid, warnings: &[Warning]) {
    for warning in warnings {
        match warning {
            Warning::GuardrailTripped { observed, expected } => warn!(
                cycle_id = %cycle_id,
                observed,
                expected,
                "{warning}"
            ),
            Warning::DuplicateMapping { member_id, accounts } => warn!(
                cycle_id = %cycle_id,
                member_id = %member_id,
                accounts = ?accounts,
                "{warning}"
            ),
        }
    }
}

/// Log members of the group that are mapped to no account.
pub fn log_drift(cycle_id: Uuid, drift: &[DriftEntry]) {
    if drift.is_empty() {
        return;
    }
    info!(cycle_id = %cycle_id, count = drift.len(), "Members without a mapped account");
    for entry in drift {
        info!(
            cycle_id = %cycle_id,
            member_id = %entry.member_id,
            member = %entry.profile.label(),
            "Unmapped member"
        );
    }
}
