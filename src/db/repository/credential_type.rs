use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{constraint_error, format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

fn credential_type_from_rusqlite(row: &Row<'_>) -> rusqlite::Result<(String, String, Option<String>, i32, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn credential_type_from_row(
    (id, name, description, requires_expiration, created_at): (String, String, Option<String>, i32, String),
) -> Result<CredentialType, DatabaseError> {
    Ok(CredentialType {
        id: parse_uuid(&id)?,
        name,
        description,
        requires_expiration: requires_expiration != 0,
        created_at: parse_timestamp(&created_at)?,
    })
}

pub fn insert_credential_type(conn: &Connection, ct: &CredentialType) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO credential_types (id, name, description, requires_expiration, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            ct.id.to_string(),
            ct.name,
            ct.description,
            ct.requires_expiration as i32,
            format_timestamp(&ct.created_at),
        ],
    )
    .map_err(|e| constraint_error(e, "credential type name already exists"))?;
    Ok(())
}

pub fn get_credential_type(conn: &Connection, id: &Uuid) -> Result<Option<CredentialType>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, description, requires_expiration, created_at
         FROM credential_types WHERE id = ?1",
        params![id.to_string()],
        credential_type_from_rusqlite,
    );
    match result {
        Ok(row) => Ok(Some(credential_type_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_credential_type_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<CredentialType>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, description, requires_expiration, created_at
         FROM credential_types WHERE LOWER(name) = LOWER(?1)",
        params![name],
        credential_type_from_rusqlite,
    );
    match result {
        Ok(row) => Ok(Some(credential_type_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_credential_types(conn: &Connection) -> Result<Vec<CredentialType>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, requires_expiration, created_at
         FROM credential_types ORDER BY name",
    )?;
    let rows = stmt.query_map([], credential_type_from_rusqlite)?;
    rows.map(|r| credential_type_from_row(r?)).collect()
}

pub fn update_credential_type(conn: &Connection, ct: &CredentialType) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE credential_types SET name = ?2, description = ?3, requires_expiration = ?4
             WHERE id = ?1",
            params![
                ct.id.to_string(),
                ct.name,
                ct.description,
                ct.requires_expiration as i32,
            ],
        )
        .map_err(|e| constraint_error(e, "credential type name already exists"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("credential_type", ct.id));
    }
    Ok(())
}

/// Fails with `ConstraintViolation` while credentials still use the type.
pub fn delete_credential_type(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM credential_types WHERE id = ?1", params![id.to_string()])
        .map_err(|e| constraint_error(e, "credential type is still in use"))?;
    if changed == 0 {
        return Err(DatabaseError::not_found("credential_type", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;
    use crate::db::timestamp_now;
    use crate::models::enums::CredentialStatus;

    #[test]
    fn seeded_types_are_listed_alphabetically() {
        let conn = open_memory_database().unwrap();
        let types = list_credential_types(&conn).unwrap();
        assert_eq!(types.len(), 8);
        assert_eq!(types[0].name, "Auto Insurance");
        let background = types.iter().find(|t| t.name == "Background Check").unwrap();
        assert!(!background.requires_expiration);
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        let conn = open_memory_database().unwrap();
        let found = get_credential_type_by_name(&conn, "cpr certification").unwrap();
        assert!(found.is_some());
        assert!(get_credential_type_by_name(&conn, "Pilot License").unwrap().is_none());
    }

    #[test]
    fn insert_custom_type_and_reject_duplicate_name() {
        let conn = open_memory_database().unwrap();
        let ct = CredentialType {
            id: Uuid::new_v4(),
            name: "Wound Care Certification".into(),
            description: Some("WOCN".into()),
            requires_expiration: true,
            created_at: timestamp_now(),
        };
        insert_credential_type(&conn, &ct).unwrap();
        let loaded = get_credential_type(&conn, &ct.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Wound Care Certification");

        let dup = CredentialType { id: Uuid::new_v4(), ..ct };
        let err = insert_credential_type(&conn, &dup).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn update_and_delete_unused_type() {
        let conn = open_memory_database().unwrap();
        let mut ct = CredentialType {
            id: Uuid::new_v4(),
            name: "Hospice Aide".into(),
            description: None,
            requires_expiration: false,
            created_at: timestamp_now(),
        };
        insert_credential_type(&conn, &ct).unwrap();

        ct.requires_expiration = true;
        ct.description = Some("State hospice aide certificate".into());
        update_credential_type(&conn, &ct).unwrap();
        let loaded = get_credential_type(&conn, &ct.id).unwrap().unwrap();
        assert!(loaded.requires_expiration);

        delete_credential_type(&conn, &ct.id).unwrap();
        assert!(get_credential_type(&conn, &ct.id).unwrap().is_none());
    }

    #[test]
    fn type_in_use_cannot_be_deleted() {
        let conn = open_memory_database().unwrap();
        let staff = make_staff(&conn, "Ada", "Okafor");
        let cred = make_credential(&conn, staff.id, None, CredentialStatus::Active);
        let err = delete_credential_type(&conn, &cred.credential_type_id).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn renaming_onto_existing_name_conflicts() {
        let conn = open_memory_database().unwrap();
        let mut rn = rn_license_type(&conn);
        rn.name = "CPR Certification".into();
        let err = update_credential_type(&conn, &rn).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }
}
