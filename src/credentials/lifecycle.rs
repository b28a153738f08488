//! Date-driven credential status.
//!
//! REVOKED and PENDING_VERIFICATION are set by an administrator and never
//! change here. Everything else follows the expiration date.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::{list_credentials, update_credential_status};
use crate::db::{timestamp_now, DatabaseError};
use crate::models::enums::CredentialStatus;
use crate::models::{Credential, CredentialFilter};

/// Status a credential should carry on `today`.
///
/// A credential expiring today is still valid (EXPIRING_SOON); it is
/// EXPIRED from the following day.
pub fn derive_status(
    current: CredentialStatus,
    expiration_date: Option<NaiveDate>,
    today: NaiveDate,
    window_days: u32,
) -> CredentialStatus {
    if current.is_manual() {
        return current;
    }
    let Some(expiration) = expiration_date else {
        return CredentialStatus::Active;
    };
    let days_left = expiration.signed_duration_since(today).num_days();
    if days_left < 0 {
        CredentialStatus::Expired
    } else if days_left <= i64::from(window_days) {
        CredentialStatus::ExpiringSoon
    } else {
        CredentialStatus::Active
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub credential_id: Uuid,
    pub staff_id: Uuid,
    pub from: CredentialStatus,
    pub to: CredentialStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSummary {
    pub examined: usize,
    pub changes: Vec<StatusChange>,
}

/// Re-derive every stored credential's status and persist the ones that moved.
pub fn refresh_statuses(
    conn: &Connection,
    today: NaiveDate,
    window_days: u32,
) -> Result<RefreshSummary, DatabaseError> {
    let credentials = list_credentials(conn, &CredentialFilter::default())?;
    apply_refresh(conn, credentials, today, window_days)
}

/// Persist derived statuses for a snapshot. A credential edited after the
/// snapshot was read (revoked, renewed) is skipped; the next run sees it.
fn apply_refresh(
    conn: &Connection,
    credentials: Vec<Credential>,
    today: NaiveDate,
    window_days: u32,
) -> Result<RefreshSummary, DatabaseError> {
    let now = timestamp_now();
    let mut summary = RefreshSummary {
        examined: credentials.len(),
        changes: Vec::new(),
    };

    let tx = conn.unchecked_transaction()?;
    for cred in credentials {
        let next = derive_status(cred.status, cred.expiration_date, today, window_days);
        if next == cred.status {
            continue;
        }
        if !update_credential_status(&tx, &cred, next, &now)? {
            tracing::debug!(credential_id = %cred.id, "Credential changed during refresh, skipped");
            continue;
        }
        tracing::info!(
            credential_id = %cred.id,
            staff_id = %cred.staff_id,
            from = cred.status.as_str(),
            to = next.as_str(),
            "Credential status changed"
        );
        summary.changes.push(StatusChange {
            credential_id: cred.id,
            staff_id: cred.staff_id,
            from: cred.status,
            to: next,
        });
    }
    tx.commit()?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::{get_credential, update_credential};
    use crate::db::sqlite::{open_database, open_memory_database};

    const WINDOW: u32 = 30;

    fn today() -> NaiveDate {
        date(2025, 3, 10)
    }

    #[test]
    fn no_expiration_is_active() {
        assert_eq!(
            derive_status(CredentialStatus::Expired, None, today(), WINDOW),
            CredentialStatus::Active
        );
    }

    #[test]
    fn expiry_boundaries() {
        let cases = [
            (date(2025, 3, 9), CredentialStatus::Expired),
            (date(2025, 3, 10), CredentialStatus::ExpiringSoon),
            (date(2025, 4, 9), CredentialStatus::ExpiringSoon), // exactly 30 days
            (date(2025, 4, 10), CredentialStatus::Active),      // 31 days
        ];
        for (expiration, expected) in cases {
            assert_eq!(
                derive_status(CredentialStatus::Active, Some(expiration), today(), WINDOW),
                expected,
                "expiration {expiration}"
            );
        }
    }

    #[test]
    fn manual_statuses_are_sticky() {
        for manual in [CredentialStatus::Revoked, CredentialStatus::PendingVerification] {
            assert_eq!(
                derive_status(manual, Some(date(2020, 1, 1)), today(), WINDOW),
                manual
            );
            assert_eq!(derive_status(manual, None, today(), WINDOW), manual);
        }
    }

    #[test]
    fn renewal_moves_expired_back_to_active() {
        assert_eq!(
            derive_status(CredentialStatus::Expired, Some(date(2027, 1, 1)), today(), WINDOW),
            CredentialStatus::Active
        );
    }

    #[test]
    fn zero_window_only_flags_same_day() {
        assert_eq!(
            derive_status(CredentialStatus::Active, Some(date(2025, 3, 11)), today(), 0),
            CredentialStatus::Active
        );
        assert_eq!(
            derive_status(CredentialStatus::Active, Some(today()), today(), 0),
            CredentialStatus::ExpiringSoon
        );
    }

    #[test]
    fn refresh_persists_only_changed_statuses() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let expired = make_credential(&conn, staff.id, Some(date(2025, 2, 1)), CredentialStatus::Active);
        let soon = make_credential(&conn, staff.id, Some(date(2025, 3, 20)), CredentialStatus::Active);
        let fine = make_credential(&conn, staff.id, Some(date(2026, 3, 20)), CredentialStatus::Active);
        let revoked = make_credential(&conn, staff.id, Some(date(2024, 1, 1)), CredentialStatus::Revoked);

        let summary = refresh_statuses(&conn, today(), WINDOW).unwrap();
        assert_eq!(summary.examined, 4);
        assert_eq!(summary.changes.len(), 2);

        let status_of = |id| get_credential(&conn, id).unwrap().unwrap().status;
        assert_eq!(status_of(&expired.id), CredentialStatus::Expired);
        assert_eq!(status_of(&soon.id), CredentialStatus::ExpiringSoon);
        assert_eq!(status_of(&fine.id), CredentialStatus::Active);
        assert_eq!(status_of(&revoked.id), CredentialStatus::Revoked);

        let again = refresh_statuses(&conn, today(), WINDOW).unwrap();
        assert!(again.changes.is_empty());
    }

    #[test]
    fn revocation_during_refresh_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("homecare.db");
        let sweep_conn = open_database(&path).unwrap();
        let admin_conn = open_database(&path).unwrap();

        let staff = make_staff(&admin_conn, "Ada", "Okafor");
        let cred = make_credential(&admin_conn, staff.id, Some(date(2025, 2, 1)), CredentialStatus::Active);

        let snapshot = list_credentials(&sweep_conn, &CredentialFilter::default()).unwrap();

        let revoked = Credential {
            status: CredentialStatus::Revoked,
            ..cred.clone()
        };
        update_credential(&admin_conn, &revoked).unwrap();

        let summary = apply_refresh(&sweep_conn, snapshot, today(), WINDOW).unwrap();
        assert!(summary.changes.is_empty());
        let stored = get_credential(&admin_conn, &cred.id).unwrap().unwrap();
        assert_eq!(stored.status, CredentialStatus::Revoked);
    }

    #[test]
    fn renewal_during_refresh_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("homecare.db");
        let sweep_conn = open_database(&path).unwrap();
        let admin_conn = open_database(&path).unwrap();

        let staff = make_staff(&admin_conn, "Ada", "Okafor");
        let cred = make_credential(&admin_conn, staff.id, Some(date(2025, 2, 1)), CredentialStatus::Active);

        let snapshot = list_credentials(&sweep_conn, &CredentialFilter::default()).unwrap();
        let renewed = Credential {
            expiration_date: Some(date(2027, 2, 1)),
            ..cred.clone()
        };
        update_credential(&admin_conn, &renewed).unwrap();

        apply_refresh(&sweep_conn, snapshot, today(), WINDOW).unwrap();
        let stored = get_credential(&admin_conn, &cred.id).unwrap().unwrap();
        assert_eq!(stored.status, CredentialStatus::Active);
    }
}
