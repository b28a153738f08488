//! Visit date/time window gate.
//!
//! A record may only go to QA when its visit date and times are plausible
//! for the schedule it belongs to. Every rule is checked and all failures
//! are returned together so the caregiver can fix them in one pass.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Assessment, Schedule};

/// One failed rule. `field` names the form field the message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum VisitWindowViolation {
    MissingVisitDate,
    VisitDateInFuture { visit_date: NaiveDate, today: NaiveDate },
    OutsideSchedule {
        visit_date: NaiveDate,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    MissingTimeIn,
    MissingTimeOut,
    TimeOutNotAfterTimeIn,
    VisitTooLong { minutes: i64, max_hours: u32 },
}

impl VisitWindowViolation {
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingVisitDate | Self::VisitDateInFuture { .. } | Self::OutsideSchedule { .. } => {
                "visit_date"
            }
            Self::MissingTimeIn => "time_in",
            Self::MissingTimeOut | Self::TimeOutNotAfterTimeIn | Self::VisitTooLong { .. } => {
                "time_out"
            }
        }
    }
}

impl std::fmt::Display for VisitWindowViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVisitDate => f.write_str("Visit date is required"),
            Self::VisitDateInFuture { visit_date, .. } => {
                write!(f, "Visit date {visit_date} is in the future")
            }
            Self::OutsideSchedule { visit_date, start_date, end_date } => write!(
                f,
                "Visit date {visit_date} is outside the schedule ({start_date} to {end_date})"
            ),
            Self::MissingTimeIn => f.write_str("Time in is required"),
            Self::MissingTimeOut => f.write_str("Time out is required"),
            Self::TimeOutNotAfterTimeIn => f.write_str("Time out must be after time in"),
            Self::VisitTooLong { minutes, max_hours } => write!(
                f,
                "Visit lasts {}h{:02}m, longer than the {max_hours} hour limit",
                minutes / 60,
                minutes % 60
            ),
        }
    }
}

/// Serialized shape of a violation in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ViolationReport {
    pub field: &'static str,
    pub message: String,
}

impl From<&VisitWindowViolation> for ViolationReport {
    fn from(v: &VisitWindowViolation) -> Self {
        Self {
            field: v.field(),
            message: v.to_string(),
        }
    }
}

/// Gate evaluated before a record is sent to QA.
pub trait VisitValidator: Send + Sync {
    fn validate(
        &self,
        record: &Assessment,
        schedule: &Schedule,
        today: NaiveDate,
    ) -> Result<(), Vec<VisitWindowViolation>>;
}

/// Checks the visit against its schedule window and a maximum duration.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleWindowValidator {
    pub max_visit_hours: u32,
}

impl ScheduleWindowValidator {
    pub fn new(max_visit_hours: u32) -> Self {
        Self { max_visit_hours }
    }
}

impl Default for ScheduleWindowValidator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_VISIT_HOURS)
    }
}

impl VisitValidator for ScheduleWindowValidator {
    fn validate(
        &self,
        record: &Assessment,
        schedule: &Schedule,
        today: NaiveDate,
    ) -> Result<(), Vec<VisitWindowViolation>> {
        let mut violations = Vec::new();

        match record.visit_date {
            None => violations.push(VisitWindowViolation::MissingVisitDate),
            Some(visit_date) => {
                if visit_date > today {
                    violations.push(VisitWindowViolation::VisitDateInFuture { visit_date, today });
                }
                if !schedule.covers(visit_date) {
                    violations.push(VisitWindowViolation::OutsideSchedule {
                        visit_date,
                        start_date: schedule.start_date,
                        end_date: schedule.end_date,
                    });
                }
            }
        }

        match (record.time_in, record.time_out) {
            (Some(time_in), Some(time_out)) => {
                if time_out <= time_in {
                    violations.push(VisitWindowViolation::TimeOutNotAfterTimeIn);
                } else {
                    let minutes = (time_out - time_in).num_minutes();
                    if minutes > i64::from(self.max_visit_hours) * 60 {
                        violations.push(VisitWindowViolation::VisitTooLong {
                            minutes,
                            max_hours: self.max_visit_hours,
                        });
                    }
                }
            }
            (time_in, time_out) => {
                if time_in.is_none() {
                    violations.push(VisitWindowViolation::MissingTimeIn);
                }
                if time_out.is_none() {
                    violations.push(VisitWindowViolation::MissingTimeOut);
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
