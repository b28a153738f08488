//! Patient schedule endpoints.
//!
//! - `GET /api/schedules?staff_id=`
//! - `POST /api/schedules`
//! - `GET|PUT|DELETE /api/schedules/:id`

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, parse_optional_id, ApiContext};
use crate::db::repository;
use crate::db::timestamp_now;
use crate::models::Schedule;

#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub patient_name: String,
    #[serde(default)]
    pub patient_mrn: Option<String>,
    pub staff_id: Uuid,
    #[serde(default)]
    pub discipline: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize)]
pub struct ScheduleQuery {
    pub staff_id: Option<String>,
}

fn validate(req: &ScheduleRequest) -> Result<(), ApiError> {
    if req.patient_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Patient name is required".into()));
    }
    if req.end_date < req.start_date {
        return Err(ApiError::BadRequest("Schedule end date precedes start date".into()));
    }
    Ok(())
}

fn require_staff(conn: &rusqlite::Connection, staff_id: &Uuid) -> Result<(), ApiError> {
    if repository::get_staff(conn, staff_id)?.is_none() {
        return Err(ApiError::NotFound(format!("Staff {staff_id} not found")));
    }
    Ok(())
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    let staff_id = parse_optional_id(query.staff_id, "staff")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(repository::list_schedules(&conn, staff_id.as_ref())?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Json(req): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<Schedule>), ApiError> {
    validate(&req)?;
    let patient_name = req.patient_name.trim();

    let conn = ctx.core.open_db()?;
    require_staff(&conn, &req.staff_id)?;
    let schedule = Schedule {
        id: Uuid::new_v4(),
        patient_name: patient_name.to_string(),
        patient_mrn: req.patient_mrn.filter(|m| !m.trim().is_empty()),
        staff_id: req.staff_id,
        discipline: req.discipline.filter(|d| !d.trim().is_empty()),
        start_date: req.start_date,
        end_date: req.end_date,
        created_at: timestamp_now(),
    };
    repository::insert_schedule(&conn, &schedule)?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(schedule_id): Path<String>,
) -> Result<Json<Schedule>, ApiError> {
    let id = parse_id(&schedule_id, "schedule")?;
    let conn = ctx.core.open_db()?;
    repository::get_schedule(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Schedule {id} not found")))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(schedule_id): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<Schedule>, ApiError> {
    let id = parse_id(&schedule_id, "schedule")?;
    validate(&req)?;

    let conn = ctx.core.open_db()?;
    let existing = repository::get_schedule(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("Schedule {id} not found")))?;
    require_staff(&conn, &req.staff_id)?;
    let schedule = Schedule {
        patient_name: req.patient_name.trim().to_string(),
        patient_mrn: req.patient_mrn.filter(|m| !m.trim().is_empty()),
        staff_id: req.staff_id,
        discipline: req.discipline.filter(|d| !d.trim().is_empty()),
        start_date: req.start_date,
        end_date: req.end_date,
        ..existing
    };
    repository::update_schedule(&conn, &schedule)?;
    Ok(Json(schedule))
}

/// Rejected with 409 while assessments reference the schedule.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(schedule_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&schedule_id, "schedule")?;
    let conn = ctx.core.open_db()?;
    repository::delete_schedule(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
