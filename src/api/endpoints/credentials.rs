//! Credential endpoints.
//!
//! - `GET|POST /api/credentials`, `GET|PUT|DELETE /api/credentials/:id`
//! - `GET|POST /api/credentials/types`, `PUT|DELETE /api/credentials/types/:id`
//! - `GET /api/credentials/statuses`: badge table for the console
//! - `GET /api/credentials/reminders`: reminders due today (not recorded)
//! - `POST /api/credentials/refresh`: re-derive statuses now

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{parse_enum_param, parse_id, parse_optional_id, ApiContext};
use crate::credentials::service::{create_credential, update_credential_record, CredentialInput};
use crate::credentials::{
    due_reminders, refresh_statuses, status_badge, status_badge_table, BadgeVariant, DueReminder,
    RefreshSummary, StatusBadge,
};
use crate::db::repository;
use crate::db::timestamp_now;
use crate::models::{Credential, CredentialFilter, CredentialType};

/// A credential as the console shows it.
#[derive(Debug, Serialize)]
pub struct CredentialView {
    #[serde(flatten)]
    pub credential: Credential,
    pub badge: StatusBadge,
    pub days_until_expiry: Option<i64>,
}

impl CredentialView {
    pub fn new(credential: Credential, today: NaiveDate) -> Self {
        Self {
            badge: status_badge(credential.status.as_str()),
            days_until_expiry: credential.days_until_expiry(today),
            credential,
        }
    }
}

#[derive(Deserialize)]
pub struct CredentialListQuery {
    pub staff_id: Option<String>,
    pub status: Option<String>,
    pub credential_type_id: Option<String>,
}

/// `GET /api/credentials`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<CredentialListQuery>,
) -> Result<Json<Vec<CredentialView>>, ApiError> {
    let filter = CredentialFilter {
        staff_id: parse_optional_id(query.staff_id, "staff")?,
        status: parse_enum_param(query.status, "status")?,
        credential_type_id: parse_optional_id(query.credential_type_id, "credential type")?,
    };
    let conn = ctx.core.open_db()?;
    let today = ctx.core.today();
    let views = repository::list_credentials(&conn, &filter)?
        .into_iter()
        .map(|c| CredentialView::new(c, today))
        .collect();
    Ok(Json(views))
}

/// `POST /api/credentials`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<CredentialInput>,
) -> Result<(StatusCode, Json<CredentialView>), ApiError> {
    let conn = ctx.core.open_db()?;
    let today = ctx.core.today();
    let credential =
        create_credential(&conn, input, today, ctx.core.config.expiring_window_days)?;
    Ok((StatusCode::CREATED, Json(CredentialView::new(credential, today))))
}

/// `GET /api/credentials/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(credential_id): Path<String>,
) -> Result<Json<CredentialView>, ApiError> {
    let id = parse_id(&credential_id, "credential")?;
    let conn = ctx.core.open_db()?;
    let credential = repository::get_credential(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("Credential {id} not found")))?;
    Ok(Json(CredentialView::new(credential, ctx.core.today())))
}

/// `PUT /api/credentials/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(credential_id): Path<String>,
    Json(input): Json<CredentialInput>,
) -> Result<Json<CredentialView>, ApiError> {
    let id = parse_id(&credential_id, "credential")?;
    let conn = ctx.core.open_db()?;
    let today = ctx.core.today();
    let credential =
        update_credential_record(&conn, &id, input, today, ctx.core.config.expiring_window_days)?;
    Ok(Json(CredentialView::new(credential, today)))
}

/// `DELETE /api/credentials/:id`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(credential_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&credential_id, "credential")?;
    let conn = ctx.core.open_db()?;
    repository::delete_credential(&conn, &id)?;
    tracing::info!(credential_id = %id, "Credential deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Credential types ──────────────────────────────────────

#[derive(Deserialize)]
pub struct CredentialTypeRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_requires_expiration")]
    pub requires_expiration: bool,
}

fn default_requires_expiration() -> bool {
    true
}

/// `GET /api/credentials/types`
pub async fn list_types(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<CredentialType>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(repository::list_credential_types(&conn)?))
}

fn type_name(req: &CredentialTypeRequest) -> Result<String, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Credential type name is required".into()));
    }
    Ok(name.to_string())
}

/// `POST /api/credentials/types`
pub async fn create_type(
    State(ctx): State<ApiContext>,
    Json(req): Json<CredentialTypeRequest>,
) -> Result<(StatusCode, Json<CredentialType>), ApiError> {
    let credential_type = CredentialType {
        id: Uuid::new_v4(),
        name: type_name(&req)?,
        description: req.description.filter(|d| !d.trim().is_empty()),
        requires_expiration: req.requires_expiration,
        created_at: timestamp_now(),
    };
    let conn = ctx.core.open_db()?;
    repository::insert_credential_type(&conn, &credential_type)?;
    Ok((StatusCode::CREATED, Json(credential_type)))
}

/// `PUT /api/credentials/types/:id`
pub async fn update_type(
    State(ctx): State<ApiContext>,
    Path(type_id): Path<String>,
    Json(req): Json<CredentialTypeRequest>,
) -> Result<Json<CredentialType>, ApiError> {
    let id = parse_id(&type_id, "credential type")?;
    let name = type_name(&req)?;
    let conn = ctx.core.open_db()?;
    let existing = repository::get_credential_type(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("Credential type {id} not found")))?;
    let credential_type = CredentialType {
        name,
        description: req.description.filter(|d| !d.trim().is_empty()),
        requires_expiration: req.requires_expiration,
        ..existing
    };
    repository::update_credential_type(&conn, &credential_type)?;
    Ok(Json(credential_type))
}

/// `DELETE /api/credentials/types/:id`. 409 while credentials use the type.
pub async fn remove_type(
    State(ctx): State<ApiContext>,
    Path(type_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&type_id, "credential type")?;
    let conn = ctx.core.open_db()?;
    repository::delete_credential_type(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Status presentation, reminders, refresh ───────────────

#[derive(Serialize)]
pub struct StatusRow {
    pub status: &'static str,
    pub variant: BadgeVariant,
    pub label: String,
}

/// `GET /api/credentials/statuses`
pub async fn statuses() -> Json<Vec<StatusRow>> {
    Json(
        status_badge_table()
            .into_iter()
            .map(|(status, badge)| StatusRow {
                status,
                variant: badge.variant,
                label: badge.label,
            })
            .collect(),
    )
}

/// `GET /api/credentials/reminders`
pub async fn reminders(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<DueReminder>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let due = due_reminders(&conn, ctx.core.today(), &ctx.core.config.reminder_days)?;
    Ok(Json(due))
}

/// `POST /api/credentials/refresh`
pub async fn refresh(State(ctx): State<ApiContext>) -> Result<Json<RefreshSummary>, ApiError> {
    let conn = ctx.core.open_db()?;
    let summary = refresh_statuses(
        &conn,
        ctx.core.today(),
        ctx.core.config.expiring_window_days,
    )?;
    Ok(Json(summary))
}
