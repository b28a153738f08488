//! Staff credential lifecycle.
//!
//! - `presentation`: status → badge lookup table served to the console
//! - `lifecycle`: date-driven status derivation and the refresh sweep
//! - `reminders`: renewal reminder thresholds and tracking
//! - `service`: validated create/update used by the HTTP layer
//! - `sweep`: periodic background refresh + reminders

pub mod lifecycle;
pub mod presentation;
pub mod reminders;
pub mod service;
pub mod sweep;

pub use lifecycle::{derive_status, refresh_statuses, RefreshSummary, StatusChange};
pub use presentation::{status_badge, status_badge_table, BadgeVariant, StatusBadge};
pub use reminders::{due_reminders, record_due_reminders, DueReminder};
pub use sweep::{run_sweep_once, start_sweep, SweepHandle, SweepReport};
