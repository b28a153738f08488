//! Shared types for the API layer.

use std::sync::Arc;

use chrono::NaiveTime;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

/// Header a client may set to attribute a request to a staff member.
/// Used for the audit trail and QA reviewer stamp only.
pub const STAFF_ID_HEADER: &str = "x-staff-id";

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Parse a path id, mapping garbage to 400.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what} ID")))
}

/// Parse an optional id query parameter. Empty means no filter.
pub fn parse_optional_id(raw: Option<String>, what: &str) -> Result<Option<Uuid>, ApiError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| parse_id(s.trim(), what))
        .transpose()
}

/// Parse an optional `HH:MM` or `HH:MM:SS` wall-clock time. Blank means unset.
pub fn parse_clock_time(raw: Option<&str>, field: &str) -> Result<Option<NaiveTime>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map(Some)
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}: expected HH:MM")))
}

/// Parse an optional enum query parameter. Empty means no filter.
pub fn parse_enum_param<T: std::str::FromStr>(
    raw: Option<String>,
    field: &str,
) -> Result<Option<T>, ApiError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<T>()
                .map_err(|_| ApiError::BadRequest(format!("Unknown {field}: {s}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid", "staff").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "staff").unwrap(), id);
    }

    #[test]
    fn clock_time_formats() {
        let t = NaiveTime::from_hms_opt(9, 5, 0).unwrap();
        assert_eq!(parse_clock_time(Some("09:05"), "time_in").unwrap(), Some(t));
        assert_eq!(parse_clock_time(Some("09:05:00"), "time_in").unwrap(), Some(t));
        assert_eq!(parse_clock_time(Some("  "), "time_in").unwrap(), None);
        assert_eq!(parse_clock_time(None, "time_in").unwrap(), None);
        assert!(parse_clock_time(Some("9am"), "time_in").is_err());
    }

    #[test]
    fn enum_params_parse_or_reject() {
        use crate::models::enums::StaffRole;
        let role: Option<StaffRole> = parse_enum_param(Some("QA_REVIEWER".into()), "role").unwrap();
        assert_eq!(role, Some(StaffRole::QaReviewer));
        assert!(parse_enum_param::<StaffRole>(Some("nurse".into()), "role").is_err());
        assert!(parse_enum_param::<StaffRole>(Some(String::new()), "role").unwrap().is_none());
    }
}
