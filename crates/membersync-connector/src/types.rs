//! Records exchanged with connectors.

use serde::{Deserialize, Serialize};

use crate::ids::MemberId;

/// Display metadata of a group member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    /// Human readable name (may be empty).
    pub display_name: String,
    /// Public handle / username, when the member has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl MemberProfile {
    /// Short label used in log lines, e.g. `Alice (@alice)`.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.handle, self.display_name.is_empty()) {
            (Some(handle), false) => format!("{} (@{handle})", self.display_name),
            (Some(handle), true) => format!("@{handle}"),
            (None, false) => self.display_name.clone(),
            (None, true) => "<unnamed>".to_string(),
        }
    }
}

/// One member of the external group as returned by a [`MembershipSource`].
///
/// [`MembershipSource`]: crate::traits::MembershipSource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member identifier.
    pub id: MemberId,
    /// Display metadata.
    #[serde(flatten)]
    pub profile: MemberProfile,
}

impl Member {
    /// Create a member.
    pub fn new(
        id: impl Into<MemberId>,
        display_name: impl Into<String>,
        handle: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            profile: MemberProfile {
                display_name: display_name.into(),
                handle,
            },
        }
    }
}

/// An account as currently reported by an [`AccountDirectory`].
///
/// [`AccountDirectory`]: crate::traits::AccountDirectory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryAccount {
    /// Account name, unique and case-sensitive.
    pub name: String,
    /// Directory-side identifier used for mutations.
    pub directory_id: String,
    /// Whether the account can currently log in.
    pub enabled: bool,
}

impl DirectoryAccount {
    /// Create a directory account record.
    pub fn new(name: impl Into<String>, directory_id: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            directory_id: directory_id.into(),
            enabled,
        }
    }
}
