//! HTTP router.
//!
//! Returns a composable `Router`: JSON resources under `/api/`, stored
//! credential documents under `/uploads/`.
//!
//! Layers on `/api` (outermost → innermost):
//! 1. Extension(ApiContext) → 2. Cache-Control: no-store → 3. Audit logger

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints::{
    assessments, audit_logs, credentials, health, schedules, staff, uploads,
};
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Base64 inflates by 4/3; leave room for the JSON envelope.
fn upload_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes / 3 * 4 + 64 * 1024
}

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);
    let body_limit = upload_body_limit(ctx.core.config.max_upload_bytes);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(health::check))
        .route("/staff", get(staff::list).post(staff::create))
        .route(
            "/staff/:id",
            get(staff::detail).put(staff::update).delete(staff::remove),
        )
        .route("/staff/:id/credentials", get(staff::credentials))
        .route("/credentials", get(credentials::list).post(credentials::create))
        .route(
            "/credentials/types",
            get(credentials::list_types).post(credentials::create_type),
        )
        .route(
            "/credentials/types/:id",
            put(credentials::update_type).delete(credentials::remove_type),
        )
        .route("/credentials/statuses", get(credentials::statuses))
        .route("/credentials/reminders", get(credentials::reminders))
        .route("/credentials/refresh", post(credentials::refresh))
        .route(
            "/credentials/:id",
            get(credentials::detail)
                .put(credentials::update)
                .delete(credentials::remove),
        )
        .route(
            "/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/audit-logs", get(audit_logs::list))
        .route("/schedules", get(schedules::list).post(schedules::create))
        .route(
            "/schedules/:id",
            get(schedules::detail)
                .put(schedules::update)
                .delete(schedules::remove),
        )
        .route("/assessments", get(assessments::list).post(assessments::create))
        .route(
            "/assessments/:id",
            get(assessments::detail)
                .put(assessments::update)
                .delete(assessments::remove),
        )
        .route("/assessments/:id/send-to-qa", post(assessments::send_to_qa))
        .route("/assessments/:id/qa-status", put(assessments::qa_status))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(axum::Extension(ctx.clone()));

    let files = Router::new()
        .route("/uploads/:name", get(uploads::serve))
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new().nest("/api", api).merge(files).layer(cors)
}
