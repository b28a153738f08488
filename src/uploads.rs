//! Credential document uploads.
//!
//! Clients post a base64 data URL; the decoded bytes are typed by magic
//! number (the declared MIME type is not trusted), then written under the
//! uploads directory with a content-hash name so re-uploads dedupe.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Public URL prefix the stored files are served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

static STORED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{64}\.(pdf|png|jpg|webp|heic)$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Expected a base64 data URL")]
    InvalidDataUrl,
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("File is empty")]
    Empty,
    #[error("File too large. Maximum {}MB.", .max_bytes / (1024 * 1024))]
    TooLarge { max_bytes: usize },
    #[error("File type not supported. Please upload an image or PDF.")]
    UnsupportedType,
    #[error("Upload not found")]
    NotFound,
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub url: String,
    pub file_name: String,
    pub mime_type: &'static str,
    pub size_bytes: usize,
    pub sha256: String,
}

/// Detect an accepted document type from magic bytes.
pub fn detect_mime_from_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some("image/png");
    }
    if bytes.starts_with(b"%PDF") {
        return Some("application/pdf");
    }
    if bytes.len() >= 12 && bytes[..4] == *b"RIFF" && bytes[8..12] == *b"WEBP" {
        return Some("image/webp");
    }
    // HEIF/HEIC: ftyp box at offset 4
    if bytes.len() >= 12 && bytes[4..8] == *b"ftyp" {
        let brand = &bytes[8..12];
        if brand == b"heic" || brand == b"heix" || brand == b"mif1" {
            return Some("image/heic");
        }
    }
    None
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        _ => "pdf",
    }
}

/// Split `data:<mime>;base64,<payload>` and return the payload. A bare
/// base64 string is accepted as well.
fn data_url_payload(input: &str) -> Result<&str, UploadError> {
    let input = input.trim();
    match input.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest.split_once(',').ok_or(UploadError::InvalidDataUrl)?;
            if !meta.ends_with(";base64") {
                return Err(UploadError::InvalidDataUrl);
            }
            Ok(payload)
        }
        None if input.is_empty() => Err(UploadError::Empty),
        None => Ok(input),
    }
}

pub fn decode_data_url(input: &str, max_bytes: usize) -> Result<Vec<u8>, UploadError> {
    let payload = data_url_payload(input)?;
    // Reject oversized uploads before allocating for the decode.
    if payload.len() / 4 * 3 > max_bytes + 2 {
        return Err(UploadError::TooLarge { max_bytes });
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(UploadError::TooLarge { max_bytes });
    }
    Ok(bytes)
}

/// Decode, type-check and store an upload. Returns where it is served.
pub fn store_upload(
    dir: &Path,
    data_url: &str,
    max_bytes: usize,
) -> Result<StoredUpload, UploadError> {
    let bytes = decode_data_url(data_url, max_bytes)?;
    let mime_type = detect_mime_from_bytes(&bytes).ok_or(UploadError::UnsupportedType)?;

    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    let file_name = format!("{sha256}.{}", extension_for(mime_type));

    std::fs::create_dir_all(dir)?;
    let path = dir.join(&file_name);
    if !path.exists() {
        std::fs::write(&path, &bytes)?;
    }

    tracing::info!(
        file_name = %file_name,
        size = bytes.len(),
        mime = mime_type,
        "Credential document stored"
    );

    Ok(StoredUpload {
        url: format!("{UPLOADS_URL_PREFIX}/{file_name}"),
        file_name,
        mime_type,
        size_bytes: bytes.len(),
        sha256,
    })
}

/// Map a requested file name to a stored file. Only names this module
/// generates are accepted, which rules out path traversal.
pub fn resolve_upload(dir: &Path, name: &str) -> Result<PathBuf, UploadError> {
    if !STORED_NAME.is_match(name) {
        return Err(UploadError::NotFound);
    }
    let path = dir.join(name);
    if !path.is_file() {
        return Err(UploadError::NotFound);
    }
    Ok(path)
}
