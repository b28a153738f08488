//! Staff (caregiver profile) endpoints.
//!
//! - `GET /api/staff`: list with role/status/name filters
//! - `POST /api/staff`: create
//! - `GET|PUT|DELETE /api/staff/:id`
//! - `GET /api/staff/:id/credentials`: credentials held by one staff member

use std::sync::LazyLock;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::endpoints::credentials::CredentialView;
use crate::api::error::ApiError;
use crate::api::types::{parse_enum_param, parse_id, ApiContext};
use crate::db::repository;
use crate::db::timestamp_now;
use crate::models::enums::{StaffRole, StaffStatus};
use crate::models::{CredentialFilter, Staff, StaffFilter};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Deserialize)]
pub struct StaffListQuery {
    pub role: Option<String>,
    pub status: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct StaffRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: StaffRole,
    #[serde(default)]
    pub status: Option<StaffStatus>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
}

/// Trimmed, validated field values shared by create and update.
struct StaffFields {
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
}

fn validate(req: &StaffRequest) -> Result<StaffFields, ApiError> {
    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(ApiError::BadRequest("First and last name are required".into()));
    }
    let email = req
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    if let Some(email) = &email {
        if !EMAIL.is_match(email) {
            return Err(ApiError::BadRequest(format!("Invalid email: {email}")));
        }
    }
    let phone = req
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from);
    Ok(StaffFields {
        first_name,
        last_name,
        email,
        phone,
    })
}

/// `GET /api/staff`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<StaffListQuery>,
) -> Result<Json<Vec<Staff>>, ApiError> {
    let filter = StaffFilter {
        role: parse_enum_param(query.role, "role")?,
        status: parse_enum_param(query.status, "status")?,
        name: query.name.filter(|n| !n.trim().is_empty()),
    };
    let conn = ctx.core.open_db()?;
    Ok(Json(repository::list_staff(&conn, &filter)?))
}

/// `POST /api/staff`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(req): Json<StaffRequest>,
) -> Result<(StatusCode, Json<Staff>), ApiError> {
    let fields = validate(&req)?;
    let now = timestamp_now();
    let staff = Staff {
        id: Uuid::new_v4(),
        first_name: fields.first_name,
        last_name: fields.last_name,
        email: fields.email,
        phone: fields.phone,
        role: req.role,
        status: req.status.unwrap_or(StaffStatus::Active),
        hire_date: req.hire_date,
        created_at: now,
        updated_at: now,
    };
    let conn = ctx.core.open_db()?;
    repository::insert_staff(&conn, &staff)?;
    tracing::info!(staff_id = %staff.id, role = staff.role.as_str(), "Staff created");
    Ok((StatusCode::CREATED, Json(staff)))
}

/// `GET /api/staff/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(staff_id): Path<String>,
) -> Result<Json<Staff>, ApiError> {
    let id = parse_id(&staff_id, "staff")?;
    let conn = ctx.core.open_db()?;
    repository::get_staff(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Staff {id} not found")))
}

/// `PUT /api/staff/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(staff_id): Path<String>,
    Json(req): Json<StaffRequest>,
) -> Result<Json<Staff>, ApiError> {
    let id = parse_id(&staff_id, "staff")?;
    let fields = validate(&req)?;
    let conn = ctx.core.open_db()?;
    let existing = repository::get_staff(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("Staff {id} not found")))?;

    let staff = Staff {
        first_name: fields.first_name,
        last_name: fields.last_name,
        email: fields.email,
        phone: fields.phone,
        role: req.role,
        status: req.status.unwrap_or(existing.status),
        hire_date: req.hire_date,
        updated_at: timestamp_now(),
        ..existing
    };
    repository::update_staff(&conn, &staff)?;
    Ok(Json(staff))
}

/// `DELETE /api/staff/:id`: refused while credentials or visit records
/// still reference the staff member.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(staff_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&staff_id, "staff")?;
    let conn = ctx.core.open_db()?;
    repository::delete_staff(&conn, &id)?;
    tracing::info!(staff_id = %id, "Staff deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/staff/:id/credentials`
pub async fn credentials(
    State(ctx): State<ApiContext>,
    Path(staff_id): Path<String>,
) -> Result<Json<Vec<CredentialView>>, ApiError> {
    let id = parse_id(&staff_id, "staff")?;
    let conn = ctx.core.open_db()?;
    if repository::get_staff(&conn, &id)?.is_none() {
        return Err(ApiError::NotFound(format!("Staff {id} not found")));
    }
    let filter = CredentialFilter {
        staff_id: Some(id),
        ..CredentialFilter::default()
    };
    let today = ctx.core.today();
    let views = repository::list_credentials(&conn, &filter)?
        .into_iter()
        .map(|c| CredentialView::new(c, today))
        .collect();
    Ok(Json(views))
}
