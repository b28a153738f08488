//! Credential status presentation.
//!
//! The console renders a credential's status as a badge. The mapping is a
//! fixed table; any status string outside it is shown verbatim with the
//! default variant so an unexpected value never breaks the page.

use serde::{Deserialize, Serialize};

use crate::models::enums::CredentialStatus;

/// Visual treatment of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeVariant {
    Default,
    Secondary,
    Destructive,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBadge {
    pub variant: BadgeVariant,
    pub label: String,
}

fn known_badge(status: CredentialStatus) -> (BadgeVariant, &'static str) {
    match status {
        CredentialStatus::Active => (BadgeVariant::Success, "Active"),
        CredentialStatus::ExpiringSoon => (BadgeVariant::Warning, "Expiring Soon"),
        CredentialStatus::Expired => (BadgeVariant::Destructive, "Expired"),
        CredentialStatus::PendingVerification => (BadgeVariant::Secondary, "Pending Verification"),
        CredentialStatus::Revoked => (BadgeVariant::Destructive, "Revoked"),
    }
}

/// Look up the badge for a raw status string.
pub fn status_badge(status: &str) -> StatusBadge {
    match status.parse::<CredentialStatus>() {
        Ok(known) => {
            let (variant, label) = known_badge(known);
            StatusBadge { variant, label: label.to_string() }
        }
        Err(_) => StatusBadge {
            variant: BadgeVariant::Default,
            label: status.to_string(),
        },
    }
}

/// The full table, keyed by status string, in declaration order.
pub fn status_badge_table() -> Vec<(&'static str, StatusBadge)> {
    CredentialStatus::ALL
        .iter()
        .map(|s| (s.as_str(), status_badge(s.as_str())))
        .collect()
}
