//! Validated credential writes.
//!
//! The HTTP layer hands over a `CredentialInput`; this module checks it
//! against the staff member and credential type, derives the status and
//! keeps reminder tracking consistent with the expiration date.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use super::lifecycle::derive_status;
use crate::db::repository::{
    get_credential, get_credential_type, get_staff, insert_credential, update_credential,
};
use crate::db::{timestamp_now, DatabaseError};
use crate::models::enums::CredentialStatus;
use crate::models::{Credential, ReminderTracking};

static LICENSE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9./ -]{0,39}$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Create/update payload. `status` is only honoured for the manual states
/// (PENDING_VERIFICATION, REVOKED); any other value clears a manual state
/// and lets the dates decide.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialInput {
    pub staff_id: Uuid,
    pub credential_type_id: Uuid,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub issuing_authority: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<CredentialStatus>,
    #[serde(default)]
    pub document_urls: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(conn: &Connection, input: &CredentialInput) -> Result<(), CredentialError> {
    if get_staff(conn, &input.staff_id)?.is_none() {
        return Err(CredentialError::NotFound(format!("Staff {} not found", input.staff_id)));
    }
    let ct = get_credential_type(conn, &input.credential_type_id)?.ok_or_else(|| {
        CredentialError::NotFound(format!("Credential type {} not found", input.credential_type_id))
    })?;

    if let Some(number) = input.license_number.as_deref().map(str::trim) {
        if !number.is_empty() && !LICENSE_NUMBER.is_match(number) {
            return Err(CredentialError::Invalid(format!("Invalid license number: {number}")));
        }
    }
    if let (Some(issued), Some(expires)) = (input.issue_date, input.expiration_date) {
        if issued > expires {
            return Err(CredentialError::Invalid(
                "Issue date must not be after expiration date".into(),
            ));
        }
    }
    let manual = input.status.is_some_and(|s| s.is_manual());
    if ct.requires_expiration && input.expiration_date.is_none() && !manual {
        return Err(CredentialError::Invalid(format!(
            "{} requires an expiration date",
            ct.name
        )));
    }
    Ok(())
}

fn resolve_status(
    requested: Option<CredentialStatus>,
    expiration_date: Option<NaiveDate>,
    today: NaiveDate,
    window_days: u32,
) -> CredentialStatus {
    // Passing a non-manual value as `current` makes derive_status date-driven.
    let seed = requested
        .filter(|s| s.is_manual())
        .unwrap_or(CredentialStatus::Active);
    derive_status(seed, expiration_date, today, window_days)
}

fn clean_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

pub fn create_credential(
    conn: &Connection,
    input: CredentialInput,
    today: NaiveDate,
    window_days: u32,
) -> Result<Credential, CredentialError> {
    validate(conn, &input)?;
    let now = timestamp_now();
    let credential = Credential {
        id: Uuid::new_v4(),
        staff_id: input.staff_id,
        credential_type_id: input.credential_type_id,
        license_number: non_blank(input.license_number),
        issuing_authority: non_blank(input.issuing_authority),
        issue_date: input.issue_date,
        expiration_date: input.expiration_date,
        status: resolve_status(input.status, input.expiration_date, today, window_days),
        document_urls: clean_urls(input.document_urls),
        notes: non_blank(input.notes),
        reminder: ReminderTracking::default(),
        created_at: now,
        updated_at: now,
    };
    insert_credential(conn, &credential)?;
    tracing::info!(
        credential_id = %credential.id,
        staff_id = %credential.staff_id,
        status = credential.status.as_str(),
        "Credential created"
    );
    Ok(credential)
}

/// Replace a credential's fields. A changed expiration date is a renewal
/// and resets reminder tracking. The owning staff member cannot change.
pub fn update_credential_record(
    conn: &Connection,
    id: &Uuid,
    input: CredentialInput,
    today: NaiveDate,
    window_days: u32,
) -> Result<Credential, CredentialError> {
    let existing = get_credential(conn, id)?
        .ok_or_else(|| CredentialError::NotFound(format!("Credential {id} not found")))?;
    if existing.staff_id != input.staff_id {
        return Err(CredentialError::Invalid(
            "Credential cannot be moved to another staff member".into(),
        ));
    }
    validate(conn, &input)?;

    let reminder = if existing.expiration_date != input.expiration_date {
        ReminderTracking::default()
    } else {
        existing.reminder.clone()
    };

    let updated = Credential {
        credential_type_id: input.credential_type_id,
        license_number: non_blank(input.license_number),
        issuing_authority: non_blank(input.issuing_authority),
        issue_date: input.issue_date,
        expiration_date: input.expiration_date,
        status: resolve_status(input.status, input.expiration_date, today, window_days),
        document_urls: clean_urls(input.document_urls),
        notes: non_blank(input.notes),
        reminder,
        updated_at: timestamp_now(),
        ..existing
    };
    update_credential(conn, &updated)?;
    tracing::info!(
        credential_id = %updated.id,
        status = updated.status.as_str(),
        "Credential updated"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::{get_credential_type_by_name, record_credential_reminder};
    use crate::db::sqlite::open_memory_database;

    const WINDOW: u32 = 30;

    fn today() -> NaiveDate {
        date(2025, 3, 10)
    }

    fn input_for(conn: &Connection, staff_id: Uuid) -> CredentialInput {
        CredentialInput {
            staff_id,
            credential_type_id: rn_license_type(conn).id,
            license_number: Some(" RN-445566 ".into()),
            issuing_authority: Some("Board of Nursing".into()),
            issue_date: Some(date(2023, 4, 1)),
            expiration_date: Some(date(2025, 3, 31)),
            status: None,
            document_urls: vec!["/uploads/a.pdf".into(), "  ".into(), "/uploads/b.png".into()],
            notes: Some("   ".into()),
        }
    }

    #[test]
    fn create_derives_status_and_cleans_fields() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let cred = create_credential(&conn, input_for(&conn, staff.id), today(), WINDOW).unwrap();
        assert_eq!(cred.status, CredentialStatus::ExpiringSoon);
        assert_eq!(cred.license_number.as_deref(), Some("RN-445566"));
        assert_eq!(cred.document_urls, vec!["/uploads/a.pdf", "/uploads/b.png"]);
        assert!(cred.notes.is_none());
    }

    #[test]
    fn requested_manual_status_is_kept() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let mut input = input_for(&conn, staff.id);
        input.status = Some(CredentialStatus::PendingVerification);
        input.expiration_date = None;
        let cred = create_credential(&conn, input, today(), WINDOW).unwrap();
        assert_eq!(cred.status, CredentialStatus::PendingVerification);
    }

    #[test]
    fn requested_derived_status_is_ignored() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let mut input = input_for(&conn, staff.id);
        input.status = Some(CredentialStatus::Active);
        input.expiration_date = Some(date(2025, 1, 1));
        let cred = create_credential(&conn, input, today(), WINDOW).unwrap();
        assert_eq!(cred.status, CredentialStatus::Expired);
    }

    #[test]
    fn missing_required_expiration_is_invalid() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let mut input = input_for(&conn, staff.id);
        input.expiration_date = None;
        let err = create_credential(&conn, input, today(), WINDOW).unwrap_err();
        assert!(matches!(err, CredentialError::Invalid(_)));
    }

    #[test]
    fn background_check_needs_no_expiration() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let mut input = input_for(&conn, staff.id);
        input.credential_type_id = get_credential_type_by_name(&conn, "Background Check")
            .unwrap()
            .unwrap()
            .id;
        input.expiration_date = None;
        let cred = create_credential(&conn, input, today(), WINDOW).unwrap();
        assert_eq!(cred.status, CredentialStatus::Active);
    }

    #[test]
    fn inverted_dates_and_bad_license_are_invalid() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");

        let mut inverted = input_for(&conn, staff.id);
        inverted.issue_date = Some(date(2026, 1, 1));
        assert!(matches!(
            create_credential(&conn, inverted, today(), WINDOW).unwrap_err(),
            CredentialError::Invalid(_)
        ));

        let mut bad_license = input_for(&conn, staff.id);
        bad_license.license_number = Some("RN#<script>".into());
        assert!(matches!(
            create_credential(&conn, bad_license, today(), WINDOW).unwrap_err(),
            CredentialError::Invalid(_)
        ));
    }

    #[test]
    fn unknown_staff_or_type_is_not_found() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");

        let mut ghost_staff = input_for(&conn, staff.id);
        ghost_staff.staff_id = Uuid::new_v4();
        assert!(matches!(
            create_credential(&conn, ghost_staff, today(), WINDOW).unwrap_err(),
            CredentialError::NotFound(_)
        ));

        let mut ghost_type = input_for(&conn, staff.id);
        ghost_type.credential_type_id = Uuid::new_v4();
        assert!(matches!(
            create_credential(&conn, ghost_type, today(), WINDOW).unwrap_err(),
            CredentialError::NotFound(_)
        ));
    }

    #[test]
    fn renewal_resets_reminders_and_status() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let cred = create_credential(&conn, input_for(&conn, staff.id), today(), WINDOW).unwrap();
        record_credential_reminder(&conn, &cred.id, 30, &timestamp_now()).unwrap();

        let mut renewal = input_for(&conn, staff.id);
        renewal.expiration_date = Some(date(2027, 3, 31));
        let updated = update_credential_record(&conn, &cred.id, renewal, today(), WINDOW).unwrap();
        assert_eq!(updated.status, CredentialStatus::Active);
        assert_eq!(updated.reminder, ReminderTracking::default());
        assert_eq!(updated.created_at, cred.created_at);
    }

    #[test]
    fn edit_without_date_change_keeps_reminders() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let cred = create_credential(&conn, input_for(&conn, staff.id), today(), WINDOW).unwrap();
        record_credential_reminder(&conn, &cred.id, 30, &timestamp_now()).unwrap();

        let mut edit = input_for(&conn, staff.id);
        edit.notes = Some("Verified with board website".into());
        let updated = update_credential_record(&conn, &cred.id, edit, today(), WINDOW).unwrap();
        assert_eq!(updated.reminder.last_threshold, Some(30));
        assert_eq!(updated.notes.as_deref(), Some("Verified with board website"));
    }

    #[test]
    fn moving_to_other_staff_is_rejected() {
        let conn = open_memory_database().unwrap();
        let ada = make_staff(&conn, "Ada", "Okafor");
        let bo = make_staff(&conn, "Bo", "Lindqvist");
        let cred = create_credential(&conn, input_for(&conn, ada.id), today(), WINDOW).unwrap();
        let err = update_credential_record(&conn, &cred.id, input_for(&conn, bo.id), today(), WINDOW)
            .unwrap_err();
        assert!(matches!(err, CredentialError::Invalid(_)));
    }
}
