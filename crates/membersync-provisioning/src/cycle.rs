//! Cycle driver.
//!
//! One cycle pulls the directory, provisions newly seen accounts, takes a
//! membership snapshot, asks the engine what to change and applies it. Errors
//! that make the whole cycle meaningless (enumeration, authentication, store
//! unavailable) abort it before any mutation; a failure of one transition is
//! logged and the rest continue.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use membersync_connector::traits::{AccountDirectory, MembershipSource};
use membersync_connector::types::DirectoryAccount;
use membersync_db::{Account, MappingStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{CycleError, CycleResult};
use crate::reconciliation::{
    log_warnings, reconcile, CycleReport, CycleStatistics, FailureStage, MembershipSnapshot,
    StatisticsTracker, Transition, TransitionFailure,
};

/// Cycle driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Minimum snapshot size the engine trusts.
    #[serde(default = "default_guardrail_threshold")]
    pub guardrail_threshold: usize,
    /// Compute and report without mutating the directory or the store.
    #[serde(default)]
    pub dry_run: bool,
    /// Directory mutations in flight at once.
    #[serde(default = "default_mutation_concurrency")]
    pub mutation_concurrency: usize,
    /// Reserved account names, matched case-insensitively.
    #[serde(default = "default_excluded_accounts")]
    pub excluded_accounts: Vec<String>,
}

fn default_guardrail_threshold() -> usize {
    5
}

fn default_mutation_concurrency() -> usize {
    1
}

fn default_excluded_accounts() -> Vec<String> {
    vec!["root".to_string()]
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            guardrail_threshold: default_guardrail_threshold(),
            dry_run: false,
            mutation_concurrency: default_mutation_concurrency(),
            excluded_accounts: default_excluded_accounts(),
        }
    }
}

impl CycleConfig {
    /// Whether `name` is a reserved account.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_accounts
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
    }
}

/// Directory ids from the current pull, used to route each transition.
struct DirectoryIndex {
    ids: HashSet<String>,
    by_name: HashMap<String, String>,
}

impl DirectoryIndex {
    fn new(accounts: &[DirectoryAccount]) -> Self {
        Self {
            ids: accounts.iter().map(|a| a.directory_id.clone()).collect(),
            by_name: accounts
                .iter()
                .map(|a| (a.name.clone(), a.directory_id.clone()))
                .collect(),
        }
    }

    /// Prefer the stored id while the directory still knows it; otherwise
    /// fall back to the account name. `None` means the account is gone.
    fn resolve(&self, transition: &Transition) -> Option<String> {
        if !transition.directory_id.is_empty() && self.ids.contains(&transition.directory_id) {
            return Some(transition.directory_id.clone());
        }
        self.by_name.get(&transition.account).cloned()
    }
}

/// Runs reconciliation cycles against one source, directory and store.
pub struct CycleDriver {
    source: Arc<dyn MembershipSource>,
    directory: Arc<dyn AccountDirectory>,
    store: Arc<dyn MappingStore>,
    config: CycleConfig,
}

impl CycleDriver {
    /// Create a new driver.
    pub fn new(
        source: Arc<dyn MembershipSource>,
        directory: Arc<dyn AccountDirectory>,
        store: Arc<dyn MappingStore>,
        config: CycleConfig,
    ) -> Self {
        Self {
            source,
            directory,
            store,
            config,
        }
    }

    /// Toggle dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Run one complete cycle.
    ///
    /// # Errors
    ///
    /// Returns a [`CycleError`] when the cycle aborts before its mutation
    /// phase. Per-transition failures are reported in the returned
    /// [`CycleReport`] instead.
    #[instrument(
        name = "cycle",
        skip(self),
        fields(
            cycle_id = tracing::field::Empty,
            source = self.source.display_name(),
            directory = self.directory.display_name(),
            dry_run = self.config.dry_run,
        )
    )]
    pub async fn run_cycle(&self) -> CycleResult<CycleReport> {
        let cycle_id = Uuid::new_v4();
        tracing::Span::current().record("cycle_id", tracing::field::display(cycle_id));
        let started_at = Utc::now();
        let tracker = StatisticsTracker::new();
        let mut stats = CycleStatistics::new();

        info!(cycle_id = %cycle_id, "Starting reconciliation cycle");

        let directory_accounts: Vec<DirectoryAccount> = self
            .directory
            .list_accounts()
            .await
            .map_err(CycleError::DirectoryFetch)?
            .into_iter()
            .filter(|account| {
                let reserved = self.config.is_excluded(&account.name);
                if reserved {
                    debug!(account = %account.name, "Skipping reserved account");
                }
                !reserved
            })
            .collect();
        stats.directory_accounts = count(directory_accounts.len());

        let provisioned = self.provision(cycle_id, &directory_accounts).await?;
        stats.accounts_provisioned = count(provisioned.len());

        // Reserved rows still count as known ids for drift; they are never mutated.
        let accounts: Vec<Account> = self.store.load().await?;
        stats.accounts_mapped = count(
            accounts
                .iter()
                .filter(|a| a.is_provisioned() && !self.config.is_excluded(&a.name))
                .count(),
        );

        self.source
            .authenticate()
            .await
            .map_err(CycleError::membership)?;
        let members = self
            .source
            .list_members()
            .await
            .map_err(CycleError::membership)?;
        let snapshot = MembershipSnapshot::from_members(members);
        stats.snapshot_size = count(snapshot.len());
        debug!(
            cycle_id = %cycle_id,
            members = snapshot.len(),
            fetched_at = %snapshot.fetched_at(),
            "Fetched membership snapshot"
        );

        let outcome = reconcile(&accounts, &snapshot, self.config.guardrail_threshold);
        log_warnings(cycle_id, &outcome.warnings);
        if outcome.is_noop() {
            debug!(cycle_id = %cycle_id, "Directory already matches membership");
        }
        let transitions: Vec<Transition> = outcome
            .transitions
            .into_iter()
            .filter(|transition| {
                let reserved = self.config.is_excluded(&transition.account);
                if reserved {
                    debug!(account = %transition.account, "Leaving reserved account untouched");
                }
                !reserved
            })
            .collect();
        stats.transitions_planned = count(transitions.len());
        stats.drift = count(outcome.drift.len());
        stats.warnings = count(outcome.warnings.len());

        let (mut applied, mut failures) = if self.config.dry_run {
            for transition in &transitions {
                info!(
                    cycle_id = %cycle_id,
                    account = %transition.account,
                    from = transition.from,
                    to = transition.to,
                    "Dry run: would change account state"
                );
            }
            (transitions.clone(), Vec::new())
        } else if transitions.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            self.store.ping().await?;
            self.apply(cycle_id, &directory_accounts, &transitions, &tracker)
                .await
        };
        applied.sort_by(|a, b| a.account.cmp(&b.account));
        failures.sort_by(|a, b| a.transition.account.cmp(&b.transition.account));

        tracker.finish(&mut stats);

        let report = CycleReport {
            cycle_id,
            started_at,
            completed_at: Utc::now(),
            dry_run: self.config.dry_run,
            guardrail_tripped: outcome.guardrail_tripped,
            provisioned,
            applied,
            failures,
            drift: outcome.drift,
            warnings: outcome.warnings,
            statistics: stats,
        };
        report.log();

        Ok(report)
    }

    /// Add directory accounts the store has never seen.
    async fn provision(
        &self,
        cycle_id: Uuid,
        directory_accounts: &[DirectoryAccount],
    ) -> CycleResult<Vec<String>> {
        let mut provisioned = Vec::new();

        if self.config.dry_run {
            let known: BTreeSet<String> = self
                .store
                .load()
                .await?
                .into_iter()
                .map(|account| account.name)
                .collect();
            for account in directory_accounts {
                if !known.contains(&account.name) {
                    info!(
                        cycle_id = %cycle_id,
                        account = %account.name,
                        enabled = account.enabled,
                        "Dry run: would provision new account"
                    );
                    provisioned.push(account.name.clone());
                }
            }
            return Ok(provisioned);
        }

        for account in directory_accounts {
            let inserted = self
                .store
                .upsert_unmapped(&account.name, &account.directory_id, account.enabled)
                .await?;
            if inserted {
                info!(
                    cycle_id = %cycle_id,
                    account = %account.name,
                    enabled = account.enabled,
                    "Provisioned new account without member ids"
                );
                provisioned.push(account.name.clone());
            }
        }

        Ok(provisioned)
    }

    /// Apply transitions with bounded concurrency.
    async fn apply(
        &self,
        cycle_id: Uuid,
        directory_accounts: &[DirectoryAccount],
        transitions: &[Transition],
        tracker: &StatisticsTracker,
    ) -> (Vec<Transition>, Vec<TransitionFailure>) {
        let index = DirectoryIndex::new(directory_accounts);
        let concurrency = self.config.mutation_concurrency.max(1);

        let pending: Vec<_> = transitions
            .iter()
            .map(|transition| {
                let directory_id = index.resolve(transition);
                self.apply_one(cycle_id, transition, directory_id, tracker)
            })
            .collect();
        let results: Vec<Result<Transition, TransitionFailure>> = stream::iter(pending)
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut applied = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(transition) => applied.push(transition),
                Err(failure) => failures.push(failure),
            }
        }
        (applied, failures)
    }

    async fn apply_one(
        &self,
        cycle_id: Uuid,
        transition: &Transition,
        directory_id: Option<String>,
        tracker: &StatisticsTracker,
    ) -> Result<Transition, TransitionFailure> {
        let fail = |stage: FailureStage, error: String| TransitionFailure {
            transition: transition.clone(),
            stage,
            error,
        };

        let Some(directory_id) = directory_id else {
            warn!(
                cycle_id = %cycle_id,
                account = %transition.account,
                "Account no longer exists in the directory, skipping"
            );
            tracker.record_skipped();
            return Err(fail(
                FailureStage::Orphaned,
                "account not found in directory".to_string(),
            ));
        };

        if let Err(e) = self.directory.set_enabled(&directory_id, transition.to).await {
            error!(
                cycle_id = %cycle_id,
                account = %transition.account,
                from = transition.from,
                to = transition.to,
                error = %e,
                transient = e.is_transient(),
                "Directory rejected state change, will retry next cycle"
            );
            tracker.record_failed();
            return Err(fail(FailureStage::Directory, e.to_string()));
        }

        info!(
            cycle_id = %cycle_id,
            account = %transition.account,
            from = transition.from,
            to = transition.to,
            retry = transition.retry,
            "Account state changed"
        );

        if let Err(e) = self.store.set_enabled(&transition.account, transition.to).await {
            error!(
                cycle_id = %cycle_id,
                account = %transition.account,
                error = %e,
                "Directory changed but mapping store write failed, marking indeterminate"
            );
            if let Err(mark_err) = self.store.mark_indeterminate(&transition.account).await {
                warn!(
                    cycle_id = %cycle_id,
                    account = %transition.account,
                    error = %mark_err,
                    "Could not mark account indeterminate"
                );
            }
            tracker.record_indeterminate();
            return Err(fail(FailureStage::Store, e.to_string()));
        }

        tracker.record_applied();
        Ok(transition.clone())
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
