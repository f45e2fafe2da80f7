//! # Membership Provisioning
//!
//! Keeps directory accounts enabled exactly while the people behind them are
//! members of an external group.
//!
//! This crate provides:
//! - The pure reconciliation engine with its guardrail and drift report
//! - The cycle driver that applies engine decisions through the connectors
//! - A scheduler that runs cycles on a fixed interval
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ AccountDirectory │────►│ MappingStore │◄────│ MembershipSource │
//! │  (list accounts) │     │  (provision) │     │  (list members)  │
//! └────────┬─────────┘     └──────┬───────┘     └────────┬─────────┘
//!          │                      ▼                      │
//!          │              ┌───────────────┐              │
//!          │              │  reconcile()  │◄─────────────┘
//!          │              └───────┬───────┘
//!          │     transitions      │      drift, warnings
//!          ◄──────────────────────┘─────────────► logs
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use membersync_provisioning::{CycleConfig, CycleDriver, CycleScheduler};
//!
//! let driver = Arc::new(CycleDriver::new(source, directory, store, CycleConfig::default()));
//! let (tx, rx) = tokio::sync::watch::channel(false);
//! CycleScheduler::new(driver, Duration::from_secs(3600)).run(rx).await;
//! ```

pub mod cycle;
pub mod error;
pub mod reconciliation;
pub mod scheduler;

pub use cycle::{CycleConfig, CycleDriver};
pub use error::{CycleError, CycleResult};
pub use reconciliation::{
    reconcile, CycleReport, CycleStatistics, DriftEntry, FailureStage, MembershipSnapshot,
    ReconcileOutcome, Transition, TransitionFailure, Warning,
};
pub use scheduler::{CycleScheduler, SchedulerSummary};
