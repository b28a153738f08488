use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{FormType, QaStatus};

/// A clinical assessment or visit note. The form body itself is opaque
/// JSON; only the visit window and QA fields are interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub staff_id: Uuid,
    pub form_type: FormType,
    pub visit_date: Option<NaiveDate>,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub form_data: serde_json::Value,
    pub qa_status: QaStatus,
    pub qa_comment: Option<String>,
    pub submitted_at: Option<NaiveDateTime>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
