//! Reconciliation engine.
//!
//! Compares the mapping store against a membership snapshot and decides which
//! accounts change state. The engine performs no I/O; the cycle driver applies
//! what it returns.

use std::collections::{BTreeMap, BTreeSet};

use membersync_connector::ids::MemberId;
use membersync_db::Account;

use super::types::{DriftEntry, MembershipSnapshot, ReconcileOutcome, Transition, Warning};

/// Compute transitions, drift and warnings for one cycle.
///
/// Accounts without mapped ids are ignored entirely. When the snapshot holds
/// fewer than `guardrail_threshold` members the outcome carries no
/// transitions, no drift and exactly one [`Warning::GuardrailTripped`].
///
/// Accounts flagged `state_indeterminate` always produce a transition toward
/// their desired state, even when the stored flag already matches it.
#[must_use]
pub fn reconcile(
    accounts: &[Account],
    snapshot: &MembershipSnapshot,
    guardrail_threshold: usize,
) -> ReconcileOutcome {
    if snapshot.len() < guardrail_threshold {
        return ReconcileOutcome {
            warnings: vec![Warning::GuardrailTripped {
                observed: snapshot.len(),
                expected: guardrail_threshold,
            }],
            guardrail_tripped: true,
            ..ReconcileOutcome::default()
        };
    }

    let mut provisioned: Vec<&Account> = accounts.iter().filter(|a| a.is_provisioned()).collect();
    provisioned.sort_by(|a, b| a.name.cmp(&b.name));

    let mut owners: BTreeMap<&MemberId, BTreeSet<&str>> = BTreeMap::new();
    for account in &provisioned {
        for id in &account.mapped_ids {
            owners.entry(id).or_default().insert(account.name.as_str());
        }
    }

    let transitions = provisioned
        .iter()
        .filter_map(|account| {
            let desired = account.mapped_ids.iter().any(|id| snapshot.contains(id));
            (desired != account.enabled || account.state_indeterminate).then(|| Transition {
                account: account.name.clone(),
                directory_id: account.directory_id.clone(),
                from: account.enabled,
                to: desired,
                retry: account.state_indeterminate,
            })
        })
        .collect();

    let drift = snapshot
        .ids()
        .filter(|id| !owners.contains_key(id))
        .map(|id| DriftEntry {
            member_id: id.clone(),
            profile: snapshot.profile(id).cloned().unwrap_or_default(),
        })
        .collect();

    let warnings = owners
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(id, names)| Warning::DuplicateMapping {
            member_id: id.clone(),
            accounts: names.into_iter().map(str::to_string).collect(),
        })
        .collect();

    ReconcileOutcome {
        transitions,
        drift,
        warnings,
        guardrail_tripped: false,
    }
}

/// Apply transitions to a copy of `accounts` as if every mutation succeeded.
///
/// Used to preview the state after a cycle and to check convergence.
#[must_use]
pub fn apply_transitions(accounts: &[Account], transitions: &[Transition]) -> Vec<Account> {
    let targets: BTreeMap<&str, bool> = transitions
        .iter()
        .map(|t| (t.account.as_str(), t.to))
        .collect();

    accounts
        .iter()
        .cloned()
        .map(|mut account| {
            if let Some(&to) = targets.get(account.name.as_str()) {
                account.enabled = to;
                account.state_indeterminate = false;
            }
            account
        })
        .collect()
}
