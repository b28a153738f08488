use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::DatabaseError;

/// A persisted audit row as returned by `/api/audit-logs`.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub source: String,
    pub action: String,
    pub entity: String,
}

/// Insert a batch of audit entries into the audit_log table.
/// Insert a batch atomically: all entries or none.
pub fn insert_audit_entries(
    conn: &Connection,
    entries: &[(String, String, String, String)], // (timestamp, source, action, entity)
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO audit_log (timestamp, source, action, entity) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (timestamp, source, action, entity) in entries {
            stmt.execute(params![timestamp, source, action, entity])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < datetime('now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}

/// Query recent audit entries, newest first. `action` matches as a prefix
/// so `PUT` or `qa_review` both narrow the result.
pub fn query_audit_log(
    conn: &Connection,
    action: Option<&str>,
    days: i64,
    limit: u32,
) -> Result<Vec<StoredAuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, source, action, entity FROM audit_log
         WHERE timestamp >= datetime('now', ?1)
           AND (?2 IS NULL OR action LIKE ?2 || '%')
         ORDER BY timestamp DESC, id DESC
         LIMIT ?3",
    )?;
    let rows = stmt
        .query_map(params![format!("-{days} days"), action, limit], |row| {
            Ok(StoredAuditEntry {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                source: row.get(2)?,
                action: row.get(3)?,
                entity: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn seed(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO audit_log (timestamp, source, action, entity) VALUES
                (datetime('now', '-100 days'), 'system', 'credential_sweep', 'credentials'),
                (datetime('now', '-1 minutes'), 'staff:abc', 'PUT /api/assessments/1/qa-status', 'status:200'),
                (datetime('now'), 'anonymous', 'GET /api/staff', 'status:200');",
        )
        .unwrap();
    }

    #[test]
    fn query_filters_by_window_and_prefix() {
        let conn = open_memory_database().unwrap();
        seed(&conn);

        let recent = query_audit_log(&conn, None, 30, 50).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "GET /api/staff");

        let puts = query_audit_log(&conn, Some("PUT"), 30, 50).unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].source, "staff:abc");

        let limited = query_audit_log(&conn, None, 365, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn prune_removes_old_entries() {
        let conn = open_memory_database().unwrap();
        seed(&conn);
        let deleted = prune_audit_log(&conn, 90).unwrap();
        assert_eq!(deleted, 1);
        let remaining = query_audit_log(&conn, None, 365, 50).unwrap();
        assert_eq!(remaining.len(), 2);
    }
}
