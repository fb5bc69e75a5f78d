//! Application wiring: database, collaborators, routes, and server startup.

use crate::auth::{self, IdentityVerifier, JwtVerifier};
use crate::handlers;
use crate::state::AppState;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use storz_cas::{ContentStore, IpfsStore};
use storz_core::Config;
use storz_directory::{PgDirectory, UserDirectory};
use storz_ingest::{IngestLimits, Ingestor, Spool};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const DB_MAX_CONNECTIONS: u32 = 20;
const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Leave room for several files per batch beneath one request body cap.
const BODY_LIMIT_BATCH_FACTOR: usize = 8;

/// Initialize all collaborators and build the application state and router.
pub async fn initialize_app(config: Config) -> anyhow::Result<(Arc<AppState>, Router)> {
    let pool = PgPoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(DB_ACQUIRE_TIMEOUT_SECS))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to the user directory database")?;

    PgDirectory::migrate(&pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    let directory: Arc<dyn UserDirectory> = Arc::new(PgDirectory::new(pool));
    let store: Arc<dyn ContentStore> = Arc::new(IpfsStore::new(config.ipfs_api_url.clone()));

    let spool = Spool::new(&config.spool_dir)
        .await
        .context("Failed to open spool directory")?;

    let limits = IngestLimits {
        max_concurrent_files: config.max_concurrent_files,
        per_file_timeout: Duration::from_secs(config.per_file_timeout_secs),
    };
    let ingestor = Arc::new(Ingestor::new(
        store,
        Arc::clone(&directory),
        spool,
        limits,
    ));

    let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwtVerifier::new(&config.jwt_secret));

    let state = Arc::new(AppState {
        config,
        directory,
        ingestor,
        verifier,
    });

    let router = build_router(Arc::clone(&state));
    Ok((state, router))
}

/// Build the route table over an already-constructed state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<http::HeaderValue> = state
            .config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    let protected = Router::new()
        .route("/test", post(handlers::secure_ping))
        .route("/api/user/login", post(handlers::login))
        .route("/api/user/create", post(handlers::create_user))
        .route("/api/upload", post(handlers::upload))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.verifier),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/user/name/{issuer_id}", get(handlers::get_name))
        .merge(protected)
        .layer(DefaultBodyLimit::max(
            state
                .config
                .max_file_size_bytes
                .saturating_mul(BODY_LIMIT_BATCH_FACTOR),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn start_server(config: &Config, router: Router) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, router)
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use http::{header, Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use std::path::PathBuf;
    use storz_cas::MemoryStore;
    use storz_directory::MemoryDirectory;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        exp: usize,
    }

    fn bearer(sub: &str) -> String {
        let token = encode(
            &Header::default(),
            &TestClaims {
                sub: sub.to_string(),
                exp: 4102444800,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {}", token)
    }

    fn test_config(spool_dir: PathBuf) -> Config {
        Config {
            server_port: 0,
            database_url: "postgres://unused".to_string(),
            ipfs_api_url: "http://unused".to_string(),
            jwt_secret: SECRET.to_string(),
            spool_dir,
            max_file_size_bytes: 1024 * 1024,
            max_concurrent_files: 4,
            per_file_timeout_secs: 30,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
        }
    }

    async fn test_app() -> (Router, Arc<AppState>, TempDir) {
        let spool_dir = TempDir::new().unwrap();
        let config = test_config(spool_dir.path().to_path_buf());

        let directory: Arc<dyn UserDirectory> = Arc::new(MemoryDirectory::new());
        let store: Arc<dyn ContentStore> = Arc::new(MemoryStore::new());
        let spool = Spool::new(spool_dir.path()).await.unwrap();
        let ingestor = Arc::new(Ingestor::new(
            store,
            Arc::clone(&directory),
            spool,
            IngestLimits::default(),
        ));
        let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwtVerifier::new(SECRET));

        let state = Arc::new(AppState {
            config,
            directory,
            ingestor,
            verifier,
        });
        (build_router(Arc::clone(&state)), state, spool_dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_banner() {
        let (app, _state, _spool) = test_app().await;
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_without_token_is_unauthorized() {
        let (app, _state, _spool) = test_app().await;
        let response = app
            .oneshot(Request::post("/api/upload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_then_duplicate_user() {
        let (app, _state, _spool) = test_app().await;

        let create = |app: Router| async move {
            app.oneshot(
                Request::post("/api/user/create")
                    .header(header::AUTHORIZATION, bearer("did:test:alice"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"issuer_id":"did:test:alice","user_name":"alice"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap()
        };

        let first = create(app.clone()).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(
            body_json(first).await["message"],
            "User created successfully"
        );

        let second = create(app).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(body_json(second).await["message"], "User already exists");
    }

    #[tokio::test]
    async fn test_create_user_missing_fields() {
        let (app, _state, _spool) = test_app().await;
        let response = app
            .oneshot(
                Request::post("/api/user/create")
                    .header(header::AUTHORIZATION, bearer("did:test:alice"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"issuer_id":"","user_name":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_name_unknown_user_is_empty_not_error() {
        let (app, _state, _spool) = test_app().await;
        let response = app
            .oneshot(
                Request::get("/api/user/name/did:test:nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["user_name"], serde_json::Value::Null);
    }

    fn multipart_body(boundary: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, content) in files {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\r\n",
                    name
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        body
    }

    #[tokio::test]
    async fn test_upload_batch_end_to_end() {
        let (app, state, _spool) = test_app().await;

        state
            .directory
            .create_user(
                "did:test:alice",
                "alice",
                storz_crypto::EncryptionKey::generate(),
            )
            .await
            .unwrap();

        let boundary = "storz-test-boundary";
        let body = multipart_body(boundary, &[("a.txt", b"aaa"), ("b.txt", b"bbb")]);

        let response = app
            .oneshot(
                Request::post("/api/upload")
                    .header(header::AUTHORIZATION, bearer("did:test:alice"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        for entry in results {
            assert!(entry["cid"].as_str().is_some());
            assert!(entry["error"].is_null());
        }

        let user = state
            .directory
            .find_by_issuer("did:test:alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.files.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_for_unknown_account_is_unauthorized() {
        let (app, _state, _spool) = test_app().await;

        let boundary = "storz-test-boundary";
        let body = multipart_body(boundary, &[("a.txt", b"aaa")]);

        let response = app
            .oneshot(
                Request::post("/api/upload")
                    .header(header::AUTHORIZATION, bearer("did:test:ghost"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upload_empty_batch_is_rejected() {
        let (app, state, _spool) = test_app().await;

        state
            .directory
            .create_user(
                "did:test:alice",
                "alice",
                storz_crypto::EncryptionKey::generate(),
            )
            .await
            .unwrap();

        let boundary = "storz-test-boundary";
        let body = multipart_body(boundary, &[]);

        let response = app
            .oneshot(
                Request::post("/api/upload")
                    .header(header::AUTHORIZATION, bearer("did:test:alice"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
