//! Types produced and consumed by the reconciliation engine.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use membersync_connector::ids::MemberId;
use membersync_connector::types::{Member, MemberProfile};
use serde::{Deserialize, Serialize};

/// Immutable set of group members captured at one fetch instant.
///
/// Duplicate ids reported by a source collapse into one entry; the last
/// profile seen wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    members: BTreeMap<MemberId, MemberProfile>,
    fetched_at: DateTime<Utc>,
}

impl MembershipSnapshot {
    /// Build a snapshot from members fetched just now.
    pub fn from_members(members: impl IntoIterator<Item = Member>) -> Self {
        Self::captured_at(members, Utc::now())
    }

    /// Build a snapshot with an explicit capture time.
    fn captured_at(members: impl IntoIterator<Item = Member>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            members: members
                .into_iter()
                .map(|member| (member.id, member.profile))
                .collect(),
            fetched_at,
        }
    }

    /// Snapshot of bare ids without display metadata.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MemberId>,
    {
        Self::from_members(
            ids.into_iter()
                .map(|id| Member::new(id, String::new(), None)),
        )
    }

    /// Number of distinct member ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the snapshot holds no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `id` is currently a member.
    #[must_use]
    pub fn contains(&self, id: &MemberId) -> bool {
        self.members.contains_key(id)
    }

    /// Display metadata for a member.
    #[must_use]
    pub fn profile(&self, id: &MemberId) -> Option<&MemberProfile> {
        self.members.get(id)
    }

    /// Iterate member ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &MemberId> {
        self.members.keys()
    }

    /// When the snapshot was captured.
    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// A change of an account's enabled flag decided by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Account name.
    pub account: String,
    /// Directory id as stored for the account.
    pub directory_id: String,
    /// Stored enabled state.
    pub from: bool,
    /// Desired enabled state.
    pub to: bool,
    /// The stored state was indeterminate; the transition re-asserts `to`
    /// even when it equals `from`.
    #[serde(default)]
    pub retry: bool,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.account,
            enabled_label(self.from),
            enabled_label(self.to)
        )?;
        if self.retry {
            f.write_str(" (retry)")?;
        }
        Ok(())
    }
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// A member present in the group but mapped to no account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftEntry {
    /// Member id.
    pub member_id: MemberId,
    /// Display metadata from the snapshot.
    pub profile: MemberProfile,
}

/// Non-fatal condition reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The snapshot was smaller than the guardrail threshold; nothing was done.
    GuardrailTripped {
        /// Members observed in the snapshot.
        observed: usize,
        /// Minimum acceptable snapshot size.
        expected: usize,
    },
    /// One member id is mapped to several accounts.
    DuplicateMapping {
        /// The shared member id.
        member_id: MemberId,
        /// Every owning account, sorted by name.
        accounts: Vec<String>,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::GuardrailTripped { observed, expected } => write!(
                f,
                "membership snapshot has {observed} members, fewer than the guardrail threshold of {expected}; skipping all changes this cycle"
            ),
            Warning::DuplicateMapping {
                member_id,
                accounts,
            } => write!(
                f,
                "member id {member_id} is mapped to multiple accounts: {}",
                accounts.join(", ")
            ),
        }
    }
}

/// Everything one `reconcile` call decided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Enabled-flag changes to apply, in account name order.
    pub transitions: Vec<Transition>,
    /// Unmapped members, in member id order.
    pub drift: Vec<DriftEntry>,
    /// Guardrail and configuration warnings.
    pub warnings: Vec<Warning>,
    /// Whether the guardrail suppressed this cycle.
    pub guardrail_tripped: bool,
}

impl ReconcileOutcome {
    /// Whether there is nothing to apply or report.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.transitions.is_empty() && self.drift.is_empty() && self.warnings.is_empty()
    }
}
