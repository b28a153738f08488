use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{constraint_error, format_timestamp, parse_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const STAFF_COLUMNS: &str = "id, first_name, last_name, email, phone, role, status, hire_date,
     created_at, updated_at";

struct StaffRow {
    id: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    role: String,
    status: String,
    hire_date: Option<String>,
    created_at: String,
    updated_at: String,
}

fn staff_row_from_rusqlite(row: &Row<'_>) -> rusqlite::Result<StaffRow> {
    Ok(StaffRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        role: row.get(5)?,
        status: row.get(6)?,
        hire_date: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn staff_from_row(row: StaffRow) -> Result<Staff, DatabaseError> {
    Ok(Staff {
        id: parse_uuid(&row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        phone: row.phone,
        role: StaffRole::from_str(&row.role)?,
        status: StaffStatus::from_str(&row.status)?,
        hire_date: parse_date(row.hire_date)?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

pub fn insert_staff(conn: &Connection, staff: &Staff) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO staff (id, first_name, last_name, email, phone, role, status, hire_date,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            staff.id.to_string(),
            staff.first_name,
            staff.last_name,
            staff.email,
            staff.phone,
            staff.role.as_str(),
            staff.status.as_str(),
            staff.hire_date.map(|d| d.to_string()),
            format_timestamp(&staff.created_at),
            format_timestamp(&staff.updated_at),
        ],
    )
    .map_err(|e| constraint_error(e, "staff"))?;
    Ok(())
}

pub fn get_staff(conn: &Connection, id: &Uuid) -> Result<Option<Staff>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"))?;

    match stmt.query_row(params![id.to_string()], staff_row_from_rusqlite) {
        Ok(row) => Ok(Some(staff_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_staff(conn: &Connection, filter: &StaffFilter) -> Result<Vec<Staff>, DatabaseError> {
    let mut sql = format!("SELECT {STAFF_COLUMNS} FROM staff WHERE 1=1");
    let mut values: Vec<String> = Vec::new();

    if let Some(role) = &filter.role {
        values.push(role.as_str().to_string());
        sql.push_str(&format!(" AND role = ?{}", values.len()));
    }
    if let Some(status) = &filter.status {
        values.push(status.as_str().to_string());
        sql.push_str(&format!(" AND status = ?{}", values.len()));
    }
    if let Some(name) = &filter.name {
        values.push(format!("%{name}%"));
        let n = values.len();
        sql.push_str(&format!(
            " AND (LOWER(first_name) LIKE LOWER(?{n}) OR LOWER(last_name) LIKE LOWER(?{n}))"
        ));
    }
    sql.push_str(" ORDER BY last_name, first_name");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), staff_row_from_rusqlite)?;

    let mut staff = Vec::new();
    for row in rows {
        staff.push(staff_from_row(row?)?);
    }
    Ok(staff)
}

/// Overwrite every mutable column. Last write wins.
pub fn update_staff(conn: &Connection, staff: &Staff) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE staff SET first_name = ?2, last_name = ?3, email = ?4, phone = ?5,
             role = ?6, status = ?7, hire_date = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                staff.id.to_string(),
                staff.first_name,
                staff.last_name,
                staff.email,
                staff.phone,
                staff.role.as_str(),
                staff.status.as_str(),
                staff.hire_date.map(|d| d.to_string()),
                format_timestamp(&staff.updated_at),
            ],
        )
        .map_err(|e| constraint_error(e, "staff"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("staff", staff.id));
    }
    Ok(())
}

/// Fails with `ConstraintViolation` while credentials, schedules, or
/// assessments still reference the staff member.
pub fn delete_staff(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM staff WHERE id = ?1", params![id.to_string()])
        .map_err(|e| constraint_error(e, "staff is still referenced"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("staff", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn staff_insert_and_retrieve() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let loaded = get_staff(&conn, &staff.id).unwrap().unwrap();
        assert_eq!(loaded.full_name(), "Ada Okafor");
        assert_eq!(loaded.role, StaffRole::RegisteredNurse);
        assert_eq!(loaded.hire_date, Some(date(2022, 3, 1)));
        assert_eq!(loaded.created_at, staff.created_at);
    }

    #[test]
    fn get_missing_staff_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_staff(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_filters_by_name_and_status() {
        let conn = open_memory_database().unwrap();
        make_staff(&conn, "Ada", "Okafor");
        let mut bo = make_staff(&conn, "Bo", "Lindqvist");
        bo.status = StaffStatus::OnLeave;
        update_staff(&conn, &bo).unwrap();

        let by_name = list_staff(
            &conn,
            &StaffFilter { name: Some("okaf".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].first_name, "Ada");

        let on_leave = list_staff(
            &conn,
            &StaffFilter { status: Some(StaffStatus::OnLeave), ..Default::default() },
        )
        .unwrap();
        assert_eq!(on_leave.len(), 1);
        assert_eq!(on_leave[0].id, bo.id);

        let all = list_staff(&conn, &StaffFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].last_name, "Lindqvist");
    }

    #[test]
    fn duplicate_email_is_constraint_violation() {
        let conn = open_memory_database().unwrap();
        let first = make_staff(&conn, "Ada", "Okafor");
        let mut clone = first.clone();
        clone.id = Uuid::new_v4();
        let err = insert_staff(&conn, &clone).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn update_missing_staff_is_not_found() {
        let conn = open_memory_database().unwrap();
        let ghost = make_staff(&conn, "Ada", "Okafor");
        delete_staff(&conn, &ghost.id).unwrap();
        let err = update_staff(&conn, &ghost).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn delete_referenced_staff_is_rejected() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        make_credential(&conn, staff.id, Some(date(2030, 1, 1)), CredentialStatus::Active);
        let err = delete_staff(&conn, &staff.id).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
        assert!(get_staff(&conn, &staff.id).unwrap().is_some());
    }
}
