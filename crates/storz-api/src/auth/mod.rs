//! Identity-token verification
//!
//! The identity provider is an external service behind the
//! [`IdentityVerifier`] trait: a bearer token goes in, a verified issuer
//! identifier comes out. The bundled implementation validates HS256 JWTs
//! whose `sub` claim carries the issuer id; the token's wire schema beyond
//! that is the provider's business.

use crate::error::HttpAppError;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use storz_core::AppError;

/// Verified identity attached to a request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub issuer_id: String,
}

/// Identity verification errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    Expired,

    #[error("Token carries no issuer identifier")]
    MissingIssuer,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

/// Identity verification service abstraction.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a bearer token and extract the issuer identifier.
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// HS256 JWT verifier.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        JwtVerifier {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::MissingIssuer);
        }

        Ok(Identity {
            issuer_id: data.claims.sub,
        })
    }
}

/// Middleware that authenticates requests with a bearer token and attaches
/// the verified [`Identity`] as a request extension.
pub async fn auth_middleware(
    State(verifier): State<Arc<dyn IdentityVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(token) => token,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Invalid authorization header format".to_string(),
            ))
            .into_response();
        }
    };

    let identity = match verifier.verify(token).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(error = %e, "Token verification failed");
            return HttpAppError(AppError::from(e)).into_response();
        }
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}
