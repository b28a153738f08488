//! QA review workflow for assessments and visit notes.
//!
//! Status moves DRAFT → SENT_TO_QA → APPROVED | REJECTED. A rejected record
//! goes back to the caregiver and can be edited and re-sent; an approved
//! record is final.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::repository::{
    delete_assessment, get_assessment, get_schedule, insert_assessment,
    mark_assessment_submitted, update_assessment_content, update_qa_status,
};
use crate::db::DatabaseError;
use crate::models::enums::{FormType, QaDecision, QaStatus};
use crate::models::Assessment;
use crate::visit_window::{VisitValidator, VisitWindowViolation};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Assessment {0} not found")]
    NotFound(Uuid),

    #[error("Cannot {event} a record in {from} status")]
    InvalidTransition { from: QaStatus, event: &'static str },

    #[error("Visit date/time validation failed ({} problem(s))", .0.len())]
    VisitWindow(Vec<VisitWindowViolation>),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Something that can happen to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaEvent {
    Save,
    Discard,
    Send,
    Review(QaDecision),
}

impl QaEvent {
    fn verb(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Discard => "discard",
            Self::Send => "send to QA",
            Self::Review(_) => "review",
        }
    }
}

/// The workflow transition table. Returns the resulting status; for a
/// discard, the status the record is deleted from.
pub fn transition(from: QaStatus, event: QaEvent) -> Result<QaStatus, WorkflowError> {
    use QaStatus::*;
    let next = match (from, event) {
        (Draft | Rejected, QaEvent::Save | QaEvent::Discard) => Some(from),
        (Draft | Rejected, QaEvent::Send) => Some(SentToQa),
        (SentToQa, QaEvent::Review(decision)) => Some(decision.into()),
        _ => None,
    };
    next.ok_or(WorkflowError::InvalidTransition {
        from,
        event: event.verb(),
    })
}

/// A reviewer's choice. `target` is `None` until the reviewer picks one
/// of the fixed decisions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QaAction {
    #[serde(default, alias = "status")]
    pub target: Option<QaDecision>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub enum QaOutcome {
    NoSelection,
    Applied(Assessment),
}

/// Fields a caregiver edits while the record is a draft (or rejected).
/// A `None` field keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct DraftUpdate {
    pub visit_date: Option<NaiveDate>,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub form_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub schedule_id: Uuid,
    pub form_type: FormType,
    pub visit_date: Option<NaiveDate>,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub form_data: Option<serde_json::Value>,
}

fn load(conn: &Connection, id: &Uuid) -> Result<Assessment, WorkflowError> {
    get_assessment(conn, id)?.ok_or(WorkflowError::NotFound(*id))
}

/// A guarded write matched no row. Re-read to report why.
fn stale_write(conn: &Connection, id: &Uuid, event: QaEvent) -> WorkflowError {
    match get_assessment(conn, id) {
        Ok(Some(current)) => WorkflowError::InvalidTransition {
            from: current.qa_status,
            event: event.verb(),
        },
        Ok(None) => WorkflowError::NotFound(*id),
        Err(e) => e.into(),
    }
}

/// Open a new DRAFT record against a schedule; the caregiver is the one
/// assigned to the schedule.
pub fn create_assessment(
    conn: &Connection,
    input: NewAssessment,
    now: NaiveDateTime,
) -> Result<Assessment, WorkflowError> {
    let schedule = get_schedule(conn, &input.schedule_id)?
        .ok_or_else(|| DatabaseError::not_found("schedule", input.schedule_id))?;
    let assessment = Assessment {
        id: Uuid::new_v4(),
        schedule_id: schedule.id,
        staff_id: schedule.staff_id,
        form_type: input.form_type,
        visit_date: input.visit_date,
        time_in: input.time_in,
        time_out: input.time_out,
        form_data: input.form_data.unwrap_or_else(|| serde_json::json!({})),
        qa_status: QaStatus::Draft,
        qa_comment: None,
        submitted_at: None,
        reviewed_at: None,
        reviewed_by: None,
        created_at: now,
        updated_at: now,
    };
    insert_assessment(conn, &assessment)?;
    tracing::info!(
        assessment_id = %assessment.id,
        form_type = assessment.form_type.as_str(),
        "Assessment created"
    );
    Ok(assessment)
}

pub fn save_draft(
    conn: &Connection,
    id: &Uuid,
    update: DraftUpdate,
    now: NaiveDateTime,
) -> Result<Assessment, WorkflowError> {
    let mut record = load(conn, id)?;
    transition(record.qa_status, QaEvent::Save)?;

    if let Some(visit_date) = update.visit_date {
        record.visit_date = Some(visit_date);
    }
    if let Some(time_in) = update.time_in {
        record.time_in = Some(time_in);
    }
    if let Some(time_out) = update.time_out {
        record.time_out = Some(time_out);
    }
    if let Some(form_data) = update.form_data {
        record.form_data = form_data;
    }
    record.updated_at = now;
    if !update_assessment_content(conn, &record)? {
        return Err(stale_write(conn, id, QaEvent::Save));
    }
    Ok(record)
}

/// Delete a record the caregiver has not yet had approved or queued.
pub fn discard_draft(conn: &Connection, id: &Uuid) -> Result<(), WorkflowError> {
    let record = load(conn, id)?;
    let from = transition(record.qa_status, QaEvent::Discard)?;
    if !delete_assessment(conn, id, from)? {
        return Err(stale_write(conn, id, QaEvent::Discard));
    }
    tracing::info!(assessment_id = %id, "Assessment discarded");
    Ok(())
}

/// Submit for review. The visit window is checked first; when it fails
/// nothing is written and the record keeps its current status.
pub fn send_to_qa(
    conn: &Connection,
    id: &Uuid,
    validator: &dyn VisitValidator,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<Assessment, WorkflowError> {
    let record = load(conn, id)?;
    transition(record.qa_status, QaEvent::Send)?;

    let schedule = get_schedule(conn, &record.schedule_id)?
        .ok_or_else(|| DatabaseError::not_found("schedule", record.schedule_id))?;
    if let Err(violations) = validator.validate(&record, &schedule, today) {
        tracing::info!(
            assessment_id = %id,
            violations = violations.len(),
            "Send to QA blocked by visit window"
        );
        return Err(WorkflowError::VisitWindow(violations));
    }

    if !mark_assessment_submitted(conn, id, record.qa_status, &now)? {
        return Err(stale_write(conn, id, QaEvent::Send));
    }
    tracing::info!(assessment_id = %id, "Assessment sent to QA");
    load(conn, id)
}

/// Apply a reviewer decision. With no decision selected this does nothing.
pub fn apply_qa_action(
    conn: &Connection,
    id: &Uuid,
    action: QaAction,
    reviewer: Option<Uuid>,
    now: NaiveDateTime,
) -> Result<QaOutcome, WorkflowError> {
    let Some(decision) = action.target else {
        return Ok(QaOutcome::NoSelection);
    };

    let record = load(conn, id)?;
    let status = transition(record.qa_status, QaEvent::Review(decision))?;

    let comment = action
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if !update_qa_status(conn, id, status, comment, reviewer.as_ref(), &now)? {
        return Err(stale_write(conn, id, QaEvent::Review(decision)));
    }
    tracing::info!(
        assessment_id = %id,
        decision = decision.as_str(),
        has_comment = comment.is_some(),
        "QA decision applied"
    );
    Ok(QaOutcome::Applied(load(conn, id)?))
}
