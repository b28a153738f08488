use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{
    constraint_error, corrupt_json, format_timestamp, parse_date, parse_time, parse_timestamp,
    parse_uuid, TIME_FORMAT,
};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const ASSESSMENT_COLUMNS: &str = "id, schedule_id, staff_id, form_type, visit_date, time_in,
     time_out, form_data, qa_status, qa_comment, submitted_at, reviewed_at, reviewed_by,
     created_at, updated_at";

struct AssessmentRow {
    id: String,
    schedule_id: String,
    staff_id: String,
    form_type: String,
    visit_date: Option<String>,
    time_in: Option<String>,
    time_out: Option<String>,
    form_data: String,
    qa_status: String,
    qa_comment: Option<String>,
    submitted_at: Option<String>,
    reviewed_at: Option<String>,
    reviewed_by: Option<String>,
    created_at: String,
    updated_at: String,
}

fn assessment_row_from_rusqlite(row: &Row<'_>) -> rusqlite::Result<AssessmentRow> {
    Ok(AssessmentRow {
        id: row.get(0)?,
        schedule_id: row.get(1)?,
        staff_id: row.get(2)?,
        form_type: row.get(3)?,
        visit_date: row.get(4)?,
        time_in: row.get(5)?,
        time_out: row.get(6)?,
        form_data: row.get(7)?,
        qa_status: row.get(8)?,
        qa_comment: row.get(9)?,
        submitted_at: row.get(10)?,
        reviewed_at: row.get(11)?,
        reviewed_by: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn assessment_from_row(row: AssessmentRow) -> Result<Assessment, DatabaseError> {
    let form_data =
        serde_json::from_str(&row.form_data).map_err(|e| corrupt_json("form_data", e))?;

    Ok(Assessment {
        id: parse_uuid(&row.id)?,
        schedule_id: parse_uuid(&row.schedule_id)?,
        staff_id: parse_uuid(&row.staff_id)?,
        form_type: FormType::from_str(&row.form_type)?,
        visit_date: parse_date(row.visit_date)?,
        time_in: parse_time(row.time_in)?,
        time_out: parse_time(row.time_out)?,
        form_data,
        qa_status: QaStatus::from_str(&row.qa_status)?,
        qa_comment: row.qa_comment,
        submitted_at: row.submitted_at.as_deref().map(parse_timestamp).transpose()?,
        reviewed_at: row.reviewed_at.as_deref().map(parse_timestamp).transpose()?,
        reviewed_by: row.reviewed_by.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

pub fn insert_assessment(conn: &Connection, a: &Assessment) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO assessments ({ASSESSMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            a.id.to_string(),
            a.schedule_id.to_string(),
            a.staff_id.to_string(),
            a.form_type.as_str(),
            a.visit_date.map(|d| d.to_string()),
            a.time_in.map(|t| t.format(TIME_FORMAT).to_string()),
            a.time_out.map(|t| t.format(TIME_FORMAT).to_string()),
            a.form_data.to_string(),
            a.qa_status.as_str(),
            a.qa_comment,
            a.submitted_at.as_ref().map(format_timestamp),
            a.reviewed_at.as_ref().map(format_timestamp),
            a.reviewed_by.map(|id| id.to_string()),
            format_timestamp(&a.created_at),
            format_timestamp(&a.updated_at),
        ],
    )
    .map_err(|e| constraint_error(e, "assessment references unknown schedule or staff"))?;
    Ok(())
}

pub fn get_assessment(conn: &Connection, id: &Uuid) -> Result<Option<Assessment>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?1"))?;

    match stmt.query_row(params![id.to_string()], assessment_row_from_rusqlite) {
        Ok(row) => Ok(Some(assessment_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List assessments, most recently updated first.
pub fn list_assessments(
    conn: &Connection,
    filter: &AssessmentFilter,
) -> Result<Vec<Assessment>, DatabaseError> {
    let mut sql = format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE 1=1");
    let mut values: Vec<String> = Vec::new();

    if let Some(status) = &filter.qa_status {
        values.push(status.as_str().to_string());
        sql.push_str(&format!(" AND qa_status = ?{}", values.len()));
    }
    if let Some(staff_id) = &filter.staff_id {
        values.push(staff_id.to_string());
        sql.push_str(&format!(" AND staff_id = ?{}", values.len()));
    }
    if let Some(schedule_id) = &filter.schedule_id {
        values.push(schedule_id.to_string());
        sql.push_str(&format!(" AND schedule_id = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY updated_at DESC, created_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(values.iter()),
        assessment_row_from_rusqlite,
    )?;

    let mut out = Vec::new();
    for row in rows {
        out.push(assessment_from_row(row?)?);
    }
    Ok(out)
}

/// Overwrite the caregiver-editable fields (visit window and form body).
///
/// Only applies while the stored status still equals `a.qa_status`.
/// Returns `false` when no row matched: the record is gone or has moved
/// to another status since it was read.
pub fn update_assessment_content(conn: &Connection, a: &Assessment) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE assessments SET visit_date = ?2, time_in = ?3, time_out = ?4, form_data = ?5,
         updated_at = ?6
         WHERE id = ?1 AND qa_status = ?7",
        params![
            a.id.to_string(),
            a.visit_date.map(|d| d.to_string()),
            a.time_in.map(|t| t.format(TIME_FORMAT).to_string()),
            a.time_out.map(|t| t.format(TIME_FORMAT).to_string()),
            a.form_data.to_string(),
            format_timestamp(&a.updated_at),
            a.qa_status.as_str(),
        ],
    )?;
    Ok(changed > 0)
}

/// Move a record from `from` to SENT_TO_QA, stamping the submission time.
/// Returns `false` when the stored status is no longer `from`.
pub fn mark_assessment_submitted(
    conn: &Connection,
    id: &Uuid,
    from: QaStatus,
    submitted_at: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let ts = format_timestamp(submitted_at);
    let changed = conn.execute(
        "UPDATE assessments SET qa_status = ?2, submitted_at = ?3, updated_at = ?3
         WHERE id = ?1 AND qa_status = ?4",
        params![id.to_string(), QaStatus::SentToQa.as_str(), ts, from.as_str()],
    )?;
    Ok(changed > 0)
}

/// Apply a reviewer decision: `{status, recordId, comment}` in one statement.
/// Only a SENT_TO_QA record is reviewable; returns `false` otherwise.
pub fn update_qa_status(
    conn: &Connection,
    id: &Uuid,
    status: QaStatus,
    comment: Option<&str>,
    reviewer: Option<&Uuid>,
    reviewed_at: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let ts = format_timestamp(reviewed_at);
    let changed = conn.execute(
        "UPDATE assessments SET qa_status = ?2, qa_comment = ?3, reviewed_by = ?4,
         reviewed_at = ?5, updated_at = ?5
         WHERE id = ?1 AND qa_status = ?6",
        params![
            id.to_string(),
            status.as_str(),
            comment,
            reviewer.map(|r| r.to_string()),
            ts,
            QaStatus::SentToQa.as_str(),
        ],
    )?;
    Ok(changed > 0)
}

/// Delete a record still in `expected` status. Returns `false` when the
/// record is gone or has moved on.
pub fn delete_assessment(
    conn: &Connection,
    id: &Uuid,
    expected: QaStatus,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM assessments WHERE id = ?1 AND qa_status = ?2",
        params![id.to_string(), expected.as_str()],
    )?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;
    use crate::db::timestamp_now;

    #[test]
    fn assessment_round_trip() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let schedule = make_schedule(&conn, staff.id);
        let a = make_assessment(&conn, &schedule);

        let loaded = get_assessment(&conn, &a.id).unwrap().unwrap();
        assert_eq!(loaded.form_type, FormType::SnVisitNote);
        assert_eq!(loaded.qa_status, QaStatus::Draft);
        assert_eq!(loaded.time_in, Some(time(9, 0)));
        assert_eq!(loaded.time_out, Some(time(10, 15)));
        assert_eq!(loaded.form_data["vitals"]["pulse"], 76);
        assert!(loaded.submitted_at.is_none());
    }

    #[test]
    fn content_update_leaves_qa_fields() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let schedule = make_schedule(&conn, staff.id);
        let mut a = make_assessment(&conn, &schedule);
        a.form_data = serde_json::json!({"narrative": "Patient tolerated visit well"});
        a.time_out = Some(time(11, 0));
        assert!(update_assessment_content(&conn, &a).unwrap());

        let loaded = get_assessment(&conn, &a.id).unwrap().unwrap();
        assert_eq!(loaded.form_data["narrative"], "Patient tolerated visit well");
        assert_eq!(loaded.time_out, Some(time(11, 0)));
        assert_eq!(loaded.qa_status, QaStatus::Draft);
    }

    #[test]
    fn submit_then_review_updates_status_and_comment() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let reviewer = make_staff(&conn, "Quinn", "Reviewer");
        let schedule = make_schedule(&conn, staff.id);
        let a = make_assessment(&conn, &schedule);
        let now = timestamp_now();

        assert!(mark_assessment_submitted(&conn, &a.id, QaStatus::Draft, &now).unwrap());
        let queue = list_assessments(
            &conn,
            &AssessmentFilter { qa_status: Some(QaStatus::SentToQa), ..Default::default() },
        )
        .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].submitted_at, Some(now));

        let applied = update_qa_status(
            &conn,
            &a.id,
            QaStatus::Rejected,
            Some("Missing wound measurements"),
            Some(&reviewer.id),
            &now,
        )
        .unwrap();
        assert!(applied);
        let loaded = get_assessment(&conn, &a.id).unwrap().unwrap();
        assert_eq!(loaded.qa_status, QaStatus::Rejected);
        assert_eq!(loaded.qa_comment.as_deref(), Some("Missing wound measurements"));
        assert_eq!(loaded.reviewed_by, Some(reviewer.id));
    }

    #[test]
    fn qa_update_on_missing_record_matches_nothing() {
        let conn = open_memory_database().unwrap();
        let applied = update_qa_status(
            &conn,
            &Uuid::new_v4(),
            QaStatus::Approved,
            None,
            None,
            &timestamp_now(),
        )
        .unwrap();
        assert!(!applied);
    }

    #[test]
    fn writes_from_a_stale_read_do_not_touch_an_approved_record() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let schedule = make_schedule(&conn, staff.id);
        let stale = make_assessment(&conn, &schedule);
        let now = timestamp_now();
        assert!(mark_assessment_submitted(&conn, &stale.id, QaStatus::Draft, &now).unwrap());
        assert!(update_qa_status(&conn, &stale.id, QaStatus::Approved, Some("ok"), None, &now).unwrap());

        let mut edit = stale.clone();
        edit.form_data = serde_json::json!({"narrative": "late edit"});
        assert!(!update_assessment_content(&conn, &edit).unwrap());
        assert!(!mark_assessment_submitted(&conn, &stale.id, QaStatus::Draft, &now).unwrap());
        assert!(!update_qa_status(&conn, &stale.id, QaStatus::Rejected, None, None, &now).unwrap());

        let loaded = get_assessment(&conn, &stale.id).unwrap().unwrap();
        assert_eq!(loaded.qa_status, QaStatus::Approved);
        assert_eq!(loaded.qa_comment.as_deref(), Some("ok"));
        assert_eq!(loaded.form_data["vitals"]["pulse"], 76);
    }

    #[test]
    fn delete_requires_expected_status() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let schedule = make_schedule(&conn, staff.id);
        let a = make_assessment(&conn, &schedule);

        assert!(!delete_assessment(&conn, &a.id, QaStatus::Rejected).unwrap());
        assert!(get_assessment(&conn, &a.id).unwrap().is_some());
        assert!(delete_assessment(&conn, &a.id, QaStatus::Draft).unwrap());
        assert!(get_assessment(&conn, &a.id).unwrap().is_none());
    }

    #[test]
    fn corrupt_uuid_and_timestamp_are_reported() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let schedule = make_schedule(&conn, staff.id);
        let a = make_assessment(&conn, &schedule);

        conn.execute(
            "UPDATE assessments SET reviewed_by = 'reviewer-7' WHERE id = ?1",
            params![a.id.to_string()],
        )
        .unwrap();
        assert!(matches!(
            get_assessment(&conn, &a.id).unwrap_err(),
            DatabaseError::CorruptValue { ref field, .. } if field == "uuid"
        ));

        conn.execute(
            "UPDATE assessments SET reviewed_by = NULL, submitted_at = 'yesterday' WHERE id = ?1",
            params![a.id.to_string()],
        )
        .unwrap();
        assert!(matches!(
            get_assessment(&conn, &a.id).unwrap_err(),
            DatabaseError::CorruptValue { ref field, .. } if field == "timestamp"
        ));
    }
}
