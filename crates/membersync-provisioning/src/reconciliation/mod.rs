//! # Reconciliation Engine
//!
//! Decides which directory accounts should be enabled, given the mapping
//! store and a fresh membership snapshot.
//!
//! ## Overview
//!
//! - An account is enabled exactly when one of its mapped member ids is in
//!   the group
//! - Accounts with no mapped ids are never touched
//! - A snapshot smaller than the guardrail threshold is distrusted and the
//!   whole cycle is skipped
//! - Members mapped to no account are reported as drift
//! - Member ids mapped to several accounts are reported, not resolved
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ MappingStore │   │  Membership  │
//! │   (load)     │   │   Snapshot   │
//! └──────┬───────┘   └──────┬───────┘
//!        │                  │
//!        ▼                  ▼
//!      ┌──────────────────────┐
//!      │      reconcile()     │  pure, no I/O
//!      └──────────┬───────────┘
//!                 │
//!    ┌────────────┼─────────────┐
//!    ▼            ▼             ▼
//! transitions   drift        warnings
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use membersync_provisioning::reconciliation::{reconcile, MembershipSnapshot};
//!
//! let accounts = store.load().await?;
//! let snapshot = MembershipSnapshot::from_members(source.list_members().await?);
//! let outcome = reconcile(&accounts, &snapshot, 5);
//! for transition in &outcome.transitions {
//!     println!("{transition}");
//! }
//! ```

pub mod engine;
pub mod report;
pub mod statistics;
pub mod types;

pub use engine::{apply_transitions, reconcile};
pub use report::{log_drift, log_warnings, CycleReport, FailureStage, TransitionFailure};
pub use statistics::{CycleStatistics, StatisticsTracker};
pub use types::{DriftEntry, MembershipSnapshot, ReconcileOutcome, Transition, Warning};
