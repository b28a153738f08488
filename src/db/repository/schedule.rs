use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{
    constraint_error, format_timestamp, parse_required_date, parse_timestamp, parse_uuid,
};
use crate::db::DatabaseError;
use crate::models::*;

struct ScheduleRow {
    id: String,
    patient_name: String,
    patient_mrn: Option<String>,
    staff_id: String,
    discipline: Option<String>,
    start_date: String,
    end_date: String,
    created_at: String,
}

fn schedule_row_from_rusqlite(row: &Row<'_>) -> rusqlite::Result<ScheduleRow> {
    Ok(ScheduleRow {
        id: row.get(0)?,
        patient_name: row.get(1)?,
        patient_mrn: row.get(2)?,
        staff_id: row.get(3)?,
        discipline: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn schedule_from_row(row: ScheduleRow) -> Result<Schedule, DatabaseError> {
    Ok(Schedule {
        id: parse_uuid(&row.id)?,
        patient_name: row.patient_name,
        patient_mrn: row.patient_mrn,
        staff_id: parse_uuid(&row.staff_id)?,
        discipline: row.discipline,
        start_date: parse_required_date(&row.start_date)?,
        end_date: parse_required_date(&row.end_date)?,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

pub fn insert_schedule(conn: &Connection, schedule: &Schedule) -> Result<(), DatabaseError> {
    if schedule.end_date < schedule.start_date {
        return Err(DatabaseError::ConstraintViolation(
            "schedule end_date precedes start_date".into(),
        ));
    }
    conn.execute(
        "INSERT INTO schedules (id, patient_name, patient_mrn, staff_id, discipline,
         start_date, end_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            schedule.id.to_string(),
            schedule.patient_name,
            schedule.patient_mrn,
            schedule.staff_id.to_string(),
            schedule.discipline,
            schedule.start_date.to_string(),
            schedule.end_date.to_string(),
            format_timestamp(&schedule.created_at),
        ],
    )
    .map_err(|e| constraint_error(e, "schedule references unknown staff"))?;
    Ok(())
}

pub fn get_schedule(conn: &Connection, id: &Uuid) -> Result<Option<Schedule>, DatabaseError> {
    let result = conn.query_row(
        &format!("{SCHEDULE_SELECT} WHERE id = ?1"),
        params![id.to_string()],
        schedule_row_from_rusqlite,
    );
    match result {
        Ok(row) => Ok(Some(schedule_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

const SCHEDULE_SELECT: &str = "SELECT id, patient_name, patient_mrn, staff_id, discipline,
     start_date, end_date, created_at FROM schedules";

/// List schedules by start date, optionally for one caregiver.
pub fn list_schedules(
    conn: &Connection,
    staff_id: Option<&Uuid>,
) -> Result<Vec<Schedule>, DatabaseError> {
    let rows = match staff_id {
        Some(id) => {
            let mut stmt = conn.prepare(&format!(
                "{SCHEDULE_SELECT} WHERE staff_id = ?1 ORDER BY start_date, patient_name"
            ))?;
            let rows = stmt.query_map(params![id.to_string()], schedule_row_from_rusqlite)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("{SCHEDULE_SELECT} ORDER BY start_date, patient_name"))?;
            let rows = stmt.query_map([], schedule_row_from_rusqlite)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };
    rows.into_iter().map(schedule_from_row).collect()
}

pub fn update_schedule(conn: &Connection, schedule: &Schedule) -> Result<(), DatabaseError> {
    if schedule.end_date < schedule.start_date {
        return Err(DatabaseError::ConstraintViolation(
            "schedule end_date precedes start_date".into(),
        ));
    }
    let changed = conn
        .execute(
            "UPDATE schedules SET patient_name = ?2, patient_mrn = ?3, staff_id = ?4,
             discipline = ?5, start_date = ?6, end_date = ?7
             WHERE id = ?1",
            params![
                schedule.id.to_string(),
                schedule.patient_name,
                schedule.patient_mrn,
                schedule.staff_id.to_string(),
                schedule.discipline,
                schedule.start_date.to_string(),
                schedule.end_date.to_string(),
            ],
        )
        .map_err(|e| constraint_error(e, "schedule references unknown staff"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("schedule", schedule.id));
    }
    Ok(())
}

/// Fails with `ConstraintViolation` while assessments still reference it.
pub fn delete_schedule(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM schedules WHERE id = ?1", params![id.to_string()])
        .map_err(|e| constraint_error(e, "schedule is still referenced"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("schedule", id));
    }
    Ok(())
}
