//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table. All public functions are re-exported here.
//! Dates are stored as `YYYY-MM-DD`, times as `HH:MM:SS`, timestamps as
//! `YYYY-MM-DD HH:MM:SS` (UTC).

mod assessment;
mod audit;
mod credential;
mod credential_type;
mod schedule;
mod staff;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use super::DatabaseError;

pub use assessment::*;
pub use audit::*;
pub use credential::*;
pub use credential_type::*;
pub use schedule::*;
pub use staff::*;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S";
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn corrupt(field: &str, value: &str) -> DatabaseError {
    DatabaseError::CorruptValue {
        field: field.into(),
        value: value.into(),
    }
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|_| corrupt("uuid", value))
}

pub(crate) fn parse_required_date(value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| corrupt("date", value))
}

pub(crate) fn parse_date(value: Option<String>) -> Result<Option<NaiveDate>, DatabaseError> {
    value.as_deref().map(parse_required_date).transpose()
}

pub(crate) fn parse_time(value: Option<String>) -> Result<Option<NaiveTime>, DatabaseError> {
    value
        .map(|t| NaiveTime::parse_from_str(&t, TIME_FORMAT).map_err(|_| corrupt("time", &t)))
        .transpose()
}

pub(crate) fn parse_timestamp(value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| corrupt("timestamp", value))
}

/// A JSON column that no longer parses.
pub(crate) fn corrupt_json(field: &str, err: serde_json::Error) -> DatabaseError {
    corrupt(field, &err.to_string())
}

pub(crate) fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Map a foreign-key or unique failure to a readable constraint error.
pub(crate) fn constraint_error(err: rusqlite::Error, context: &str) -> DatabaseError {
    match err {
        rusqlite::Error::SqliteFailure(code, detail)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(format!(
                "{context}: {}",
                detail.unwrap_or_else(|| "constraint failed".into())
            ))
        }
        other => DatabaseError::Sqlite(other),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared builders for repository and workflow tests.

    use chrono::NaiveDate;
    use rusqlite::Connection;
    use uuid::Uuid;

    use super::*;
    use crate::db::timestamp_now;
    use crate::models::enums::*;
    use crate::models::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    pub fn make_staff(conn: &Connection, first: &str, last: &str) -> Staff {
        let now = timestamp_now();
        let staff = Staff {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: last.into(),
            email: Some(format!("{}.{}@agency.test", first.to_lowercase(), last.to_lowercase())),
            phone: None,
            role: StaffRole::RegisteredNurse,
            status: StaffStatus::Active,
            hire_date: Some(date(2022, 3, 1)),
            created_at: now,
            updated_at: now,
        };
        insert_staff(conn, &staff).unwrap();
        staff
    }

    pub fn rn_license_type(conn: &Connection) -> CredentialType {
        get_credential_type_by_name(conn, "RN License").unwrap().unwrap()
    }

    pub fn make_credential(
        conn: &Connection,
        staff_id: Uuid,
        expiration: Option<NaiveDate>,
        status: CredentialStatus,
    ) -> Credential {
        let now = timestamp_now();
        let credential = Credential {
            id: Uuid::new_v4(),
            staff_id,
            credential_type_id: rn_license_type(conn).id,
            license_number: Some("RN-000123".into()),
            issuing_authority: Some("State Board of Nursing".into()),
            issue_date: Some(date(2023, 1, 1)),
            expiration_date: expiration,
            status,
            document_urls: vec![],
            notes: None,
            reminder: ReminderTracking::default(),
            created_at: now,
            updated_at: now,
        };
        insert_credential(conn, &credential).unwrap();
        credential
    }

    pub fn make_schedule(conn: &Connection, staff_id: Uuid) -> Schedule {
        let schedule = Schedule {
            id: Uuid::new_v4(),
            patient_name: "Jane Roe".into(),
            patient_mrn: Some("MRN-7781".into()),
            staff_id,
            discipline: Some("SN".into()),
            start_date: date(2024, 5, 1),
            end_date: date(2024, 6, 29),
            created_at: timestamp_now(),
        };
        insert_schedule(conn, &schedule).unwrap();
        schedule
    }

    pub fn make_assessment(conn: &Connection, schedule: &Schedule) -> Assessment {
        let now = timestamp_now();
        let assessment = Assessment {
            id: Uuid::new_v4(),
            schedule_id: schedule.id,
            staff_id: schedule.staff_id,
            form_type: FormType::SnVisitNote,
            visit_date: Some(date(2024, 5, 14)),
            time_in: Some(time(9, 0)),
            time_out: Some(time(10, 15)),
            form_data: serde_json::json!({"vitals": {"bp": "128/82", "pulse": 76}}),
            qa_status: QaStatus::Draft,
            qa_comment: None,
            submitted_at: None,
            reviewed_at: None,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        };
        insert_assessment(conn, &assessment).unwrap();
        assessment
    }
}
