//! Shared application state.
//!
//! `CoreState` is built once at startup, wrapped in `Arc` and handed to
//! the HTTP layer and the background sweep. Each caller opens its own
//! SQLite connection through `open_db`.

use std::sync::Mutex;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db;
use crate::visit_window::ScheduleWindowValidator;

/// Maximum audit buffer size before flush.
const AUDIT_BUFFER_CAPACITY: usize = 100;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pub config: AppConfig,
    /// Audit log for all API access and background jobs.
    audit: AuditLogger,
    validator: ScheduleWindowValidator,
}

impl CoreState {
    pub fn new(config: AppConfig) -> Self {
        let validator = ScheduleWindowValidator::new(config.max_visit_hours);
        Self {
            config,
            audit: AuditLogger::new(),
            validator,
        }
    }

    /// Open a database connection, creating the file and running
    /// migrations on first use.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        let path = self.config.database_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Storage(e.to_string()))?;
        }
        db::open_database(&path).map_err(CoreError::Database)
    }

    /// Visit window gate used by send-to-QA.
    pub fn visit_validator(&self) -> &ScheduleWindowValidator {
        &self.validator
    }

    /// Agency-local calendar date used for status derivation and visit checks.
    pub fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    // ── Audit ──────────────────────────────────────────────

    /// Log an access event. Auto-flushes to DB when buffer is full.
    pub fn log_access(&self, source: AccessSource, action: &str, entity: &str) {
        let needs_flush = self.audit.log(source, action, entity);
        if needs_flush {
            if let Err(e) = self.flush_and_prune_audit() {
                tracing::warn!("Auto-flush audit failed: {e}");
            }
        }
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    /// Flush audit buffer to DB and prune entries past retention.
    pub fn flush_and_prune_audit(&self) -> Result<(), CoreError> {
        let conn = self.open_db()?;
        self.audit.flush_to_db(&conn)?;
        if let Err(e) = db::repository::prune_audit_log(&conn, self.config.audit_retention_days) {
            tracing::warn!("Failed to prune audit log: {e}");
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Storage error: {0}")]
    Storage(String),
}

// ═══════════════════════════════════════════════════════════
// Access source tracking
// ═══════════════════════════════════════════════════════════

/// Who caused an audited event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessSource {
    /// Background jobs (status sweep, reminders).
    System,
    /// A request that named its staff member in `X-Staff-Id`.
    Staff(Uuid),
    /// A request with no attribution.
    Anonymous,
}

impl std::fmt::Display for AccessSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Staff(id) => write!(f, "staff:{id}"),
            Self::Anonymous => write!(f, "anonymous"),
        }
    }
}

impl AccessSource {
    pub fn staff_id(&self) -> Option<Uuid> {
        match self {
            Self::Staff(id) => Some(*id),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Audit logger
// ═══════════════════════════════════════════════════════════

/// In-memory audit log buffer. Entries are flushed to SQLite
/// when the buffer reaches capacity or on explicit flush.
pub struct AuditLogger {
    buffer: Mutex<Vec<AuditEntry>>,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: chrono::NaiveDateTime,
    pub source: AccessSource,
    pub action: String,
    pub entity: String,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(AUDIT_BUFFER_CAPACITY)),
        }
    }

    /// Log an access event to the in-memory buffer.
    /// Returns `true` if the buffer has reached flush threshold.
    pub fn log(&self, source: AccessSource, action: &str, entity: &str) -> bool {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(AuditEntry {
                timestamp: db::timestamp_now(),
                source,
                action: action.to_string(),
                entity: entity.to_string(),
            });
            buf.len() >= AUDIT_BUFFER_CAPACITY
        } else {
            false
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|mut buf| buf.drain(..).collect())
            .unwrap_or_default()
    }

    /// Put entries that failed to persist back at the front of the buffer.
    fn requeue(&self, entries: Vec<AuditEntry>) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.splice(0..0, entries);
        }
    }

    /// Write buffered entries to SQLite in one transaction. On failure
    /// nothing is written and the entries stay buffered.
    pub fn flush_to_db(&self, conn: &rusqlite::Connection) -> Result<usize, CoreError> {
        let entries = self.drain();
        if entries.is_empty() {
            return Ok(0);
        }

        let tuples: Vec<(String, String, String, String)> = entries
            .iter()
            .map(|e| {
                (
                    db::repository::format_timestamp(&e.timestamp),
                    e.source.to_string(),
                    e.action.clone(),
                    e.entity.clone(),
                )
            })
            .collect();

        let count = tuples.len();
        if let Err(e) = db::repository::insert_audit_entries(conn, &tuples) {
            self.requeue(entries);
            return Err(e.into());
        }

        tracing::debug!(count, "Flushed audit entries to database");
        Ok(count)
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
