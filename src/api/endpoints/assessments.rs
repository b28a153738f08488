//! Assessment / visit note endpoints and the QA review workflow.
//!
//! - `GET|POST /api/assessments`, `GET|PUT|DELETE /api/assessments/:id`
//! - `POST /api/assessments/:id/send-to-qa`: visit window gate, then SENT_TO_QA
//! - `PUT /api/assessments/:id/qa-status`: reviewer decision `{status, comment}`

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{
    parse_clock_time, parse_enum_param, parse_id, parse_optional_id, ApiContext,
};
use crate::core_state::AccessSource;
use crate::db::repository;
use crate::db::timestamp_now;
use crate::models::enums::FormType;
use crate::models::{Assessment, AssessmentFilter};
use crate::qa_review::{self, DraftUpdate, NewAssessment, QaAction, QaOutcome};

#[derive(Deserialize)]
pub struct AssessmentListQuery {
    pub qa_status: Option<String>,
    pub staff_id: Option<String>,
    pub schedule_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateAssessmentRequest {
    pub schedule_id: Uuid,
    pub form_type: FormType,
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub time_in: Option<String>,
    #[serde(default)]
    pub time_out: Option<String>,
    #[serde(default)]
    pub form_data: Option<serde_json::Value>,
}

/// Omitted fields keep their stored value.
#[derive(Deserialize)]
pub struct SaveAssessmentRequest {
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub time_in: Option<String>,
    #[serde(default)]
    pub time_out: Option<String>,
    #[serde(default)]
    pub form_data: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct QaStatusResponse {
    /// `false` when no decision was selected and nothing changed.
    pub applied: bool,
    pub assessment: Option<Assessment>,
}

/// `GET /api/assessments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<AssessmentListQuery>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
    let filter = AssessmentFilter {
        qa_status: parse_enum_param(query.qa_status, "qa_status")?,
        staff_id: parse_optional_id(query.staff_id, "staff")?,
        schedule_id: parse_optional_id(query.schedule_id, "schedule")?,
    };
    let conn = ctx.core.open_db()?;
    Ok(Json(repository::list_assessments(&conn, &filter)?))
}

/// `POST /api/assessments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(req): Json<CreateAssessmentRequest>,
) -> Result<(StatusCode, Json<Assessment>), ApiError> {
    let input = NewAssessment {
        schedule_id: req.schedule_id,
        form_type: req.form_type,
        visit_date: req.visit_date,
        time_in: parse_clock_time(req.time_in.as_deref(), "time_in")?,
        time_out: parse_clock_time(req.time_out.as_deref(), "time_out")?,
        form_data: req.form_data,
    };
    let conn = ctx.core.open_db()?;
    let assessment = qa_review::create_assessment(&conn, input, timestamp_now())?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

/// `GET /api/assessments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(assessment_id): Path<String>,
) -> Result<Json<Assessment>, ApiError> {
    let id = parse_id(&assessment_id, "assessment")?;
    let conn = ctx.core.open_db()?;
    repository::get_assessment(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Assessment {id} not found")))
}

/// `PUT /api/assessments/:id`: save while DRAFT or REJECTED.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(assessment_id): Path<String>,
    Json(req): Json<SaveAssessmentRequest>,
) -> Result<Json<Assessment>, ApiError> {
    let id = parse_id(&assessment_id, "assessment")?;
    let update = DraftUpdate {
        visit_date: req.visit_date,
        time_in: parse_clock_time(req.time_in.as_deref(), "time_in")?,
        time_out: parse_clock_time(req.time_out.as_deref(), "time_out")?,
        form_data: req.form_data,
    };
    let conn = ctx.core.open_db()?;
    Ok(Json(qa_review::save_draft(&conn, &id, update, timestamp_now())?))
}

/// `DELETE /api/assessments/:id`: only while DRAFT or REJECTED.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(assessment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&assessment_id, "assessment")?;
    let conn = ctx.core.open_db()?;
    qa_review::discard_draft(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/assessments/:id/send-to-qa`
pub async fn send_to_qa(
    State(ctx): State<ApiContext>,
    Path(assessment_id): Path<String>,
) -> Result<Json<Assessment>, ApiError> {
    let id = parse_id(&assessment_id, "assessment")?;
    let conn = ctx.core.open_db()?;
    let assessment = qa_review::send_to_qa(
        &conn,
        &id,
        ctx.core.visit_validator(),
        ctx.core.today(),
        timestamp_now(),
    )?;
    Ok(Json(assessment))
}

/// `PUT /api/assessments/:id/qa-status`
pub async fn qa_status(
    State(ctx): State<ApiContext>,
    Extension(source): Extension<AccessSource>,
    Path(assessment_id): Path<String>,
    Json(action): Json<QaAction>,
) -> Result<Json<QaStatusResponse>, ApiError> {
    let id = parse_id(&assessment_id, "assessment")?;
    let conn = ctx.core.open_db()?;
    let outcome =
        qa_review::apply_qa_action(&conn, &id, action, source.staff_id(), timestamp_now())?;
    let response = match outcome {
        QaOutcome::NoSelection => QaStatusResponse {
            applied: false,
            assessment: None,
        },
        QaOutcome::Applied(assessment) => QaStatusResponse {
            applied: true,
            assessment: Some(assessment),
        },
    };
    Ok(Json(response))
}
