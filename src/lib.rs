pub mod api;
pub mod config;
pub mod core_state;
pub mod credentials;
pub mod db;
pub mod models;
pub mod qa_review;
pub mod uploads;
pub mod visit_window;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core_state::{CoreError, CoreState};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Cannot prepare data directory {path}: {source}")]
    DataDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot start async runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
}

/// Process entry point: logging, config, runtime, then `serve`.
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env();
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)
        .and_then(|runtime| runtime.block_on(serve(config, shutdown_signal())));

    if let Err(e) = result {
        tracing::error!("{} stopped: {e}", config::APP_NAME);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

fn prepare_dir(path: &std::path::Path) -> Result<(), StartupError> {
    std::fs::create_dir_all(path).map_err(|source| StartupError::DataDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Open the database, bring credential statuses up to date, start the
/// sweep and serve the API until `shutdown` resolves.
pub async fn serve<F>(config: AppConfig, shutdown: F) -> Result<(), StartupError>
where
    F: std::future::Future<Output = ()>,
{
    prepare_dir(&config.data_dir)?;
    prepare_dir(&config.uploads_dir())?;
    tracing::info!(data_dir = %config.data_dir.display(), "Using data directory");

    let bind_addr = config.bind_addr;
    let core = Arc::new(CoreState::new(config));
    core.open_db()?;

    let startup = core.clone();
    match tokio::task::spawn_blocking(move || credentials::run_sweep_once(&startup)).await {
        Ok(result) => {
            result?;
        }
        Err(e) => tracing::error!("Startup credential refresh panicked: {e}"),
    }

    let sweep = credentials::start_sweep(core.clone());
    let mut server = api::start_server(core.clone(), bind_addr).await?;
    tracing::info!(addr = %server.info.addr, "{} ready", config::APP_NAME);

    shutdown.await;

    server.shutdown();
    server.stopped().await;
    sweep.stop().await;
    if let Err(e) = core.flush_and_prune_audit() {
        tracing::warn!("Final audit flush failed: {e}");
    }
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serve_starts_and_stops_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: tmp.path().join("homecare"),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..AppConfig::default()
        };
        let data_dir = config.data_dir.clone();

        serve(config, async {}).await.unwrap();

        assert!(data_dir.join("uploads").is_dir());
        let conn = crate::db::open_database(&data_dir.join("database").join("homecare.db")).unwrap();
        let sweeps: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM audit_log WHERE action = 'credential_sweep'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(sweeps, 1);
    }
}
