//! Connection setup and schema migrations.
//!
//! Every request opens its own connection, so setup is cheap: pragmas plus a
//! version check that is a no-op once the schema is current.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Applied in order; each one runs in its own transaction.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial",
        sql: include_str!("../../resources/migrations/001_initial.sql"),
    },
    Migration {
        version: 2,
        name: "seed_credential_types",
        sql: include_str!("../../resources/migrations/002_seed_credential_types.sql"),
    },
];

/// Latest schema version this build knows how to use.
pub fn supported_schema_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Open the database file at `path`, bringing its schema up to date.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    prepare(&conn)?;
    Ok(conn)
}

/// Open a private in-memory database with the full schema.
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<(), DatabaseError> {
    // In-memory databases report "memory"; files switch to "wal".
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::trace!(journal_mode = %mode, "Database opened");
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    run_migrations(conn)
}

/// Apply every migration newer than the stored schema version.
///
/// A database written by a newer build is refused rather than used with a
/// schema this build does not understand.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at TEXT NOT NULL DEFAULT (datetime('now'))
         );",
    )?;

    let current = schema_version(conn)?;
    let supported = supported_schema_version();
    if current > supported {
        return Err(DatabaseError::MigrationFailed {
            version: current,
            reason: format!("database schema is newer than supported version {supported}"),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        apply(conn, migration)?;
    }
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    let failed = |e: rusqlite::Error| DatabaseError::MigrationFailed {
        version: migration.version,
        reason: e.to_string(),
    };

    tracing::info!(version = migration.version, name = migration.name, "Applying migration");
    let tx = conn.unchecked_transaction().map_err(failed)?;
    tx.execute_batch(migration.sql).map_err(failed)?;
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        params![migration.version],
    )
    .map_err(failed)?;
    tx.commit().map_err(failed)
}

/// Highest applied migration, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let version: Option<i64> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn fresh_database_has_full_schema() {
        let conn = open_memory_database().unwrap();
        assert_eq!(
            table_names(&conn),
            [
                "assessments",
                "audit_log",
                "credential_types",
                "credentials",
                "schedules",
                "schema_version",
                "staff",
            ]
        );
        assert_eq!(schema_version(&conn).unwrap(), supported_schema_version());
        assert_eq!(supported_schema_version(), 2);
    }

    #[test]
    fn rerunning_migrations_changes_nothing() {
        let conn = open_memory_database().unwrap();
        run_migrations(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, MIGRATIONS.len() as i64);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let conn = open_memory_database().unwrap();
        let fk: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(fk);
    }

    #[test]
    fn newer_schema_is_refused() {
        let conn = open_memory_database().unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (99)", [])
            .unwrap();
        match run_migrations(&conn).unwrap_err() {
            DatabaseError::MigrationFailed { version, .. } => assert_eq!(version, 99),
            other => panic!("Expected MigrationFailed, got {other}"),
        }
    }

    #[test]
    fn file_database_uses_wal_and_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("homecare.db");
        {
            let conn = open_database(&path).unwrap();
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap();
            assert_eq!(mode, "wal");
            conn.execute(
                "INSERT INTO audit_log (timestamp, source, action, entity)
                 VALUES (datetime('now'), 'system', 'startup', 'server')",
                [],
            )
            .unwrap();
        }
        let conn = open_database(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let seeded: i64 = conn
            .query_row("SELECT COUNT(*) FROM credential_types", [], |row| row.get(0))
            .unwrap();
        assert_eq!(seeded, 8);
    }
}
