//! Credential document uploads.
//!
//! `POST /api/uploads` takes a base64 data URL and returns the URL the
//! stored file is served from (`GET /uploads/:name`).

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::uploads::{resolve_upload, store_upload, StoredUpload};

#[derive(Deserialize)]
pub struct UploadRequest {
    /// Base64 data URL (e.g., `data:application/pdf;base64,JVBERi0...`)
    #[serde(alias = "data_url")]
    pub data: String,
}

/// `POST /api/uploads`
pub async fn upload(
    State(ctx): State<ApiContext>,
    Json(req): Json<UploadRequest>,
) -> Result<(StatusCode, Json<StoredUpload>), ApiError> {
    let dir = ctx.core.config.uploads_dir();
    let max_bytes = ctx.core.config.max_upload_bytes;
    let stored = tokio::task::spawn_blocking(move || store_upload(&dir, &req.data, max_bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Upload task failed: {e}")))??;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /uploads/:name`
pub async fn serve(
    State(ctx): State<ApiContext>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let path = resolve_upload(&ctx.core.config.uploads_dir(), &name)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("Upload not found".into()))?;
    let mime = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, mime),
            // Content-addressed names never change.
            (header::CACHE_CONTROL, "private, max-age=31536000, immutable".to_string()),
        ],
        bytes,
    )
        .into_response())
}
