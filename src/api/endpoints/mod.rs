//! API endpoint handlers, one module per resource.

pub mod assessments;
pub mod audit_logs;
pub mod credentials;
pub mod health;
pub mod schedules;
pub mod staff;
pub mod uploads;
