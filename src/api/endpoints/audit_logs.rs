//! `GET /api/audit-logs`: recent audit trail.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{query_audit_log, StoredAuditEntry};

const DEFAULT_DAYS: i64 = 7;
const DEFAULT_LIMIT: u32 = 200;
const MAX_LIMIT: u32 = 1000;

#[derive(Deserialize)]
pub struct AuditQuery {
    /// Prefix match, e.g. `PUT` or `PUT /api/assessments`.
    pub action: Option<String>,
    pub days: Option<i64>,
    pub limit: Option<u32>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<StoredAuditEntry>>, ApiError> {
    // Flush first so the caller sees everything logged so far.
    ctx.core.flush_and_prune_audit()?;

    let max_days = ctx.core.config.audit_retention_days.max(1);
    let days = query.days.unwrap_or(DEFAULT_DAYS).clamp(1, max_days);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let action = query.action.as_deref().map(str::trim).filter(|a| !a.is_empty());

    let conn = ctx.core.open_db()?;
    Ok(Json(query_audit_log(&conn, action, days, limit)?))
}
