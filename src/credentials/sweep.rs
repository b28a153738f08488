//! Background credential sweep.
//!
//! Every `sweep_interval_secs` the sweep
//! re-derives credential statuses, then stamps any renewal reminders that
//! came due. Each run is written to the audit log as a system event.
//! Delivery of reminders is left to whoever reads the log.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::lifecycle::refresh_statuses;
use super::reminders::record_due_reminders;
use crate::core_state::{AccessSource, CoreError, CoreState};
use crate::db::timestamp_now;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub status_changes: usize,
    pub reminders_recorded: usize,
}

/// Run one sweep against the configured database.
pub fn run_sweep_once(core: &CoreState) -> Result<SweepReport, CoreError> {
    let conn = core.open_db()?;
    let today = core.today();

    let summary = refresh_statuses(&conn, today, core.config.expiring_window_days)?;
    let reminders =
        record_due_reminders(&conn, today, &core.config.reminder_days, &timestamp_now())?;

    let report = SweepReport {
        examined: summary.examined,
        status_changes: summary.changes.len(),
        reminders_recorded: reminders.len(),
    };
    core.log_access(
        AccessSource::System,
        "credential_sweep",
        &format!(
            "changes:{} reminders:{}",
            report.status_changes, report.reminders_recorded
        ),
    );
    tracing::info!(
        examined = report.examined,
        status_changes = report.status_changes,
        reminders = report.reminders_recorded,
        "Credential sweep completed"
    );
    Ok(report)
}

/// Handle for the background sweep task.
pub struct SweepHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Stop the sweep and wait for the task. A run in progress completes.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Spawn the periodic sweep on the tokio runtime. The first run is one
/// period from now; startup runs `run_sweep_once` itself.
pub fn start_sweep(core: Arc<CoreState>) -> SweepHandle {
    let period = Duration::from_secs(core.config.sweep_interval_secs.max(1));
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        tracing::info!("Credential sweep started (every {}s)", period.as_secs());
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = interval.tick() => {
                    let core = core.clone();
                    match tokio::task::spawn_blocking(move || run_sweep_once(&core)).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::warn!(error = %e, "Credential sweep failed"),
                        Err(e) => tracing::error!(error = %e, "Credential sweep task panicked"),
                    }
                }
            }
        }
        tracing::info!("Credential sweep shutting down");
    });

    SweepHandle {
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}
