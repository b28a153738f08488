use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::CredentialStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub requires_expiration: bool,
    pub created_at: NaiveDateTime,
}

/// Renewal reminder bookkeeping. `last_threshold` is the smallest
/// days-before-expiry threshold already reminded for the current
/// expiration date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTracking {
    pub last_reminder_at: Option<NaiveDateTime>,
    pub last_threshold: Option<u32>,
    pub reminder_count: u32,
}

/// A license or certification attached to a staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub credential_type_id: Uuid,
    pub license_number: Option<String>,
    pub issuing_authority: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub status: CredentialStatus,
    pub document_urls: Vec<String>,
    pub notes: Option<String>,
    pub reminder: ReminderTracking,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Credential {
    /// Days until expiry, negative once expired. `None` when the
    /// credential does not expire.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiration_date
            .map(|exp| exp.signed_duration_since(today).num_days())
    }
}
