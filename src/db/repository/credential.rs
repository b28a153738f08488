use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{
    constraint_error, corrupt_json, format_timestamp, parse_date, parse_timestamp, parse_uuid,
};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const CREDENTIAL_COLUMNS: &str = "id, staff_id, credential_type_id, license_number,
     issuing_authority, issue_date, expiration_date, status, document_urls, notes,
     last_reminder_at, last_reminder_threshold, reminder_count, created_at, updated_at";

struct CredentialRow {
    id: String,
    staff_id: String,
    credential_type_id: String,
    license_number: Option<String>,
    issuing_authority: Option<String>,
    issue_date: Option<String>,
    expiration_date: Option<String>,
    status: String,
    document_urls: String,
    notes: Option<String>,
    last_reminder_at: Option<String>,
    last_reminder_threshold: Option<i64>,
    reminder_count: i64,
    created_at: String,
    updated_at: String,
}

fn credential_row_from_rusqlite(row: &Row<'_>) -> rusqlite::Result<CredentialRow> {
    Ok(CredentialRow {
        id: row.get(0)?,
        staff_id: row.get(1)?,
        credential_type_id: row.get(2)?,
        license_number: row.get(3)?,
        issuing_authority: row.get(4)?,
        issue_date: row.get(5)?,
        expiration_date: row.get(6)?,
        status: row.get(7)?,
        document_urls: row.get(8)?,
        notes: row.get(9)?,
        last_reminder_at: row.get(10)?,
        last_reminder_threshold: row.get(11)?,
        reminder_count: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn credential_from_row(row: CredentialRow) -> Result<Credential, DatabaseError> {
    let document_urls: Vec<String> = serde_json::from_str(&row.document_urls)
        .map_err(|e| corrupt_json("document_urls", e))?;

    Ok(Credential {
        id: parse_uuid(&row.id)?,
        staff_id: parse_uuid(&row.staff_id)?,
        credential_type_id: parse_uuid(&row.credential_type_id)?,
        license_number: row.license_number,
        issuing_authority: row.issuing_authority,
        issue_date: parse_date(row.issue_date)?,
        expiration_date: parse_date(row.expiration_date)?,
        status: CredentialStatus::from_str(&row.status)?,
        document_urls,
        notes: row.notes,
        reminder: ReminderTracking {
            last_reminder_at: row.last_reminder_at.as_deref().map(parse_timestamp).transpose()?,
            last_threshold: row.last_reminder_threshold.map(|t| t.max(0) as u32),
            reminder_count: row.reminder_count.max(0) as u32,
        },
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

fn encode_urls(urls: &[String]) -> String {
    serde_json::to_string(urls).unwrap_or_else(|_| "[]".to_string())
}

pub fn insert_credential(conn: &Connection, cred: &Credential) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO credentials ({CREDENTIAL_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            cred.id.to_string(),
            cred.staff_id.to_string(),
            cred.credential_type_id.to_string(),
            cred.license_number,
            cred.issuing_authority,
            cred.issue_date.map(|d| d.to_string()),
            cred.expiration_date.map(|d| d.to_string()),
            cred.status.as_str(),
            encode_urls(&cred.document_urls),
            cred.notes,
            cred.reminder.last_reminder_at.as_ref().map(format_timestamp),
            cred.reminder.last_threshold,
            cred.reminder.reminder_count,
            format_timestamp(&cred.created_at),
            format_timestamp(&cred.updated_at),
        ],
    )
    .map_err(|e| constraint_error(e, "credential references unknown staff or type"))?;
    Ok(())
}

pub fn get_credential(conn: &Connection, id: &Uuid) -> Result<Option<Credential>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE id = ?1"))?;

    match stmt.query_row(params![id.to_string()], credential_row_from_rusqlite) {
        Ok(row) => Ok(Some(credential_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List credentials, soonest expiration first (non-expiring last).
pub fn list_credentials(
    conn: &Connection,
    filter: &CredentialFilter,
) -> Result<Vec<Credential>, DatabaseError> {
    let mut sql = format!("SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE 1=1");
    let mut values: Vec<String> = Vec::new();

    if let Some(staff_id) = &filter.staff_id {
        values.push(staff_id.to_string());
        sql.push_str(&format!(" AND staff_id = ?{}", values.len()));
    }
    if let Some(status) = &filter.status {
        values.push(status.as_str().to_string());
        sql.push_str(&format!(" AND status = ?{}", values.len()));
    }
    if let Some(type_id) = &filter.credential_type_id {
        values.push(type_id.to_string());
        sql.push_str(&format!(" AND credential_type_id = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY expiration_date IS NULL, expiration_date, created_at");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(values.iter()),
        credential_row_from_rusqlite,
    )?;

    let mut creds = Vec::new();
    for row in rows {
        creds.push(credential_from_row(row?)?);
    }
    Ok(creds)
}

/// Overwrite the editable fields, status and reminder tracking.
pub fn update_credential(conn: &Connection, cred: &Credential) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE credentials SET credential_type_id = ?2, license_number = ?3,
             issuing_authority = ?4, issue_date = ?5, expiration_date = ?6, status = ?7,
             document_urls = ?8, notes = ?9, last_reminder_at = ?10,
             last_reminder_threshold = ?11, reminder_count = ?12, updated_at = ?13
             WHERE id = ?1",
            params![
                cred.id.to_string(),
                cred.credential_type_id.to_string(),
                cred.license_number,
                cred.issuing_authority,
                cred.issue_date.map(|d| d.to_string()),
                cred.expiration_date.map(|d| d.to_string()),
                cred.status.as_str(),
                encode_urls(&cred.document_urls),
                cred.notes,
                cred.reminder.last_reminder_at.as_ref().map(format_timestamp),
                cred.reminder.last_threshold,
                cred.reminder.reminder_count,
                format_timestamp(&cred.updated_at),
            ],
        )
        .map_err(|e| constraint_error(e, "credential references unknown type"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("credential", cred.id));
    }
    Ok(())
}

/// Move a credential from the status it had in `seen` to `status`.
///
/// Applies only while the stored status and expiration date still match
/// `seen`. Returns `false` when another writer got there first.
pub fn update_credential_status(
    conn: &Connection,
    seen: &Credential,
    status: CredentialStatus,
    updated_at: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE credentials SET status = ?2, updated_at = ?3
         WHERE id = ?1 AND status = ?4 AND expiration_date IS ?5",
        params![
            seen.id.to_string(),
            status.as_str(),
            format_timestamp(updated_at),
            seen.status.as_str(),
            seen.expiration_date.map(|d| d.to_string()),
        ],
    )?;
    Ok(changed > 0)
}

/// Stamp a sent reminder for the given threshold.
pub fn record_credential_reminder(
    conn: &Connection,
    id: &Uuid,
    threshold: u32,
    sent_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE credentials SET last_reminder_at = ?2, last_reminder_threshold = ?3,
         reminder_count = reminder_count + 1
         WHERE id = ?1",
        params![id.to_string(), format_timestamp(sent_at), threshold],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("credential", id));
    }
    Ok(())
}

pub fn delete_credential(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM credentials WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("credential", id));
    }
    Ok(())
}
