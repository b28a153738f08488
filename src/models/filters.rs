use uuid::Uuid;

use super::enums::{CredentialStatus, QaStatus, StaffRole, StaffStatus};

#[derive(Debug, Default)]
pub struct StaffFilter {
    pub role: Option<StaffRole>,
    pub status: Option<StaffStatus>,
    pub name: Option<String>,
}

#[derive(Debug, Default)]
pub struct CredentialFilter {
    pub staff_id: Option<Uuid>,
    pub status: Option<CredentialStatus>,
    pub credential_type_id: Option<Uuid>,
}

#[derive(Debug, Default)]
pub struct AssessmentFilter {
    pub qa_status: Option<QaStatus>,
    pub staff_id: Option<Uuid>,
    pub schedule_id: Option<Uuid>,
}
