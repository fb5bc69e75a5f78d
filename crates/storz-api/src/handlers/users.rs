//! User account handlers: creation, login check, and name lookup.

use crate::auth::Identity;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storz_core::AppError;
use storz_crypto::EncryptionKey;
use storz_directory::DirectoryError;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub authenticated: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1))]
    pub issuer_id: String,
    #[validate(length(min = 1))]
    pub user_name: String,
}

#[derive(Debug, Serialize)]
pub struct GetNameResponse {
    pub user_name: Option<String>,
}

pub async fn root() -> &'static str {
    "Welcome to Storz API v1.0!"
}

/// Authenticated ping; reaching this handler means the token verified.
pub async fn secure_ping(Extension(_identity): Extension<Identity>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "User can use secure APIs".to_string(),
    })
}

pub async fn login(Extension(identity): Extension<Identity>) -> Json<LoginResponse> {
    tracing::debug!(issuer_id = %identity.issuer_id, "User authenticated");
    Json(LoginResponse {
        authenticated: true,
    })
}

/// Create a user account with a freshly provisioned encryption key.
///
/// The very first account in the system is created without issuer-match
/// validation (first-run bootstrap). Afterwards an already-known issuer id is
/// reported as existing; the stored key is never touched.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(_identity): Extension<Identity>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    request
        .validate()
        .map_err(|_| AppError::BadRequest("Missing required fields".to_string()))?;

    let count = state.directory.count().await.map_err(AppError::from)?;
    if count > 0 {
        let existing = state
            .directory
            .find_by_issuer(&request.issuer_id)
            .await
            .map_err(AppError::from)?;
        if existing.is_some() {
            return Ok(Json(MessageResponse {
                message: "User already exists".to_string(),
            }));
        }
    }

    let created = state
        .directory
        .create_user(
            &request.issuer_id,
            &request.user_name,
            EncryptionKey::generate(),
        )
        .await;

    match created {
        Ok(_) => Ok(Json(MessageResponse {
            message: "User created successfully".to_string(),
        })),
        // Lost a creation race; the earlier record and its key win.
        Err(DirectoryError::AlreadyExists(_)) => Ok(Json(MessageResponse {
            message: "User already exists".to_string(),
        })),
        Err(e) => Err(HttpAppError(AppError::from(e))),
    }
}

/// Display name lookup; unknown issuer ids yield an empty result.
pub async fn get_name(
    State(state): State<Arc<AppState>>,
    Path(issuer_id): Path<String>,
) -> Result<Json<GetNameResponse>, HttpAppError> {
    if issuer_id.is_empty() {
        return Err(HttpAppError(AppError::BadRequest(
            "Missing required fields".to_string(),
        )));
    }

    let user_name = state
        .directory
        .display_name(&issuer_id)
        .await
        .map_err(AppError::from)?;

    Ok(Json(GetNameResponse { user_name }))
}
