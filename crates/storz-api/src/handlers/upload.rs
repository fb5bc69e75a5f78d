//! Batch upload handler
//!
//! Receives one or more files as multipart form data, resolves the user's
//! encryption key once, runs the ingestion batch, and responds only after
//! every per-file pipeline has reached a terminal state.

use crate::auth::Identity;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{extract::Multipart, extract::State, Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use storz_core::models::{UploadedFile, UserContext};
use storz_core::AppError;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub results: Vec<FileResultEntry>,
}

/// One entry per input file: a content identifier or an error reason.
#[derive(Debug, Serialize)]
pub struct FileResultEntry {
    pub file_name: String,
    pub cid: Option<String>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    // Resolve the user's key once per batch. A verified identity without a
    // user record is an auth failure; nothing is ever encrypted under a
    // missing key.
    let user = state
        .directory
        .find_by_issuer(&identity.issuer_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| {
            AppError::Unauthorized("No account for authenticated identity".to_string())
        })?;

    let ctx = UserContext {
        issuer_id: user.issuer_id,
        key: user.encryption_key,
    };

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "unnamed".to_string());

        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        if content.len() > state.config.max_file_size_bytes {
            return Err(HttpAppError(AppError::PayloadTooLarge(format!(
                "{} exceeds the {} byte limit",
                name, state.config.max_file_size_bytes
            ))));
        }

        files.push(UploadedFile { name, content });
    }

    if files.is_empty() {
        return Err(HttpAppError(AppError::BadRequest(
            "No files in upload".to_string(),
        )));
    }

    let batch = state.ingestor.ingest(&ctx, files).await;

    let results = batch
        .entries
        .iter()
        .map(|entry| match &entry.outcome {
            Ok(record) => FileResultEntry {
                file_name: entry.file_name.clone(),
                cid: Some(record.cid.clone()),
                error: None,
                error_code: None,
            },
            Err(e) => FileResultEntry {
                file_name: entry.file_name.clone(),
                cid: None,
                error: Some(e.to_string()),
                error_code: Some(e.code()),
            },
        })
        .collect();

    Ok(Json(UploadResponse {
        message: format!(
            "{} file(s) uploaded, {} failed",
            batch.succeeded(),
            batch.failed()
        ),
        results,
    }))
}
