//! Renewal reminders.
//!
//! Thresholds are days-before-expiry (e.g. 60, 30, 7). A credential is
//! due when it has crossed a threshold tighter than the last one it was
//! reminded for, so each threshold fires at most once per expiration date.
//! Renewing the credential clears the tracking (see `service`).

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::{list_credentials, record_credential_reminder};
use crate::db::DatabaseError;
use crate::models::{Credential, CredentialFilter};

#[derive(Debug, Clone, Serialize)]
pub struct DueReminder {
    pub credential_id: Uuid,
    pub staff_id: Uuid,
    pub expiration_date: NaiveDate,
    pub days_left: i64,
    pub threshold: u32,
}

/// The tightest threshold `days_left` has crossed, if any.
fn crossed_threshold(days_left: i64, thresholds: &[u32]) -> Option<u32> {
    thresholds
        .iter()
        .copied()
        .filter(|t| days_left <= i64::from(*t))
        .min()
}

/// Whether `cred` owes a reminder on `today`, and for which threshold.
pub fn reminder_due(cred: &Credential, today: NaiveDate, thresholds: &[u32]) -> Option<DueReminder> {
    if cred.status.is_manual() {
        return None;
    }
    let expiration = cred.expiration_date?;
    let days_left = cred.days_until_expiry(today)?;
    if days_left < 0 {
        return None;
    }
    let threshold = crossed_threshold(days_left, thresholds)?;
    if let Some(last) = cred.reminder.last_threshold {
        if threshold >= last {
            return None;
        }
    }
    Some(DueReminder {
        credential_id: cred.id,
        staff_id: cred.staff_id,
        expiration_date: expiration,
        days_left,
        threshold,
    })
}

/// Credentials owing a reminder on `today`, soonest expiry first. Read-only.
pub fn due_reminders(
    conn: &Connection,
    today: NaiveDate,
    thresholds: &[u32],
) -> Result<Vec<DueReminder>, DatabaseError> {
    let credentials = list_credentials(conn, &CredentialFilter::default())?;
    Ok(credentials
        .iter()
        .filter_map(|c| reminder_due(c, today, thresholds))
        .collect())
}

/// Find due reminders and stamp each one as sent.
pub fn record_due_reminders(
    conn: &Connection,
    today: NaiveDate,
    thresholds: &[u32],
    sent_at: &NaiveDateTime,
) -> Result<Vec<DueReminder>, DatabaseError> {
    let due = due_reminders(conn, today, thresholds)?;
    for reminder in &due {
        record_credential_reminder(conn, &reminder.credential_id, reminder.threshold, sent_at)?;
        tracing::info!(
            credential_id = %reminder.credential_id,
            staff_id = %reminder.staff_id,
            days_left = reminder.days_left,
            threshold = reminder.threshold,
            "Credential renewal reminder due"
        );
    }
    Ok(due)
}
