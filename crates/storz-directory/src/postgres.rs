use crate::traits::{DirectoryError, DirectoryResult, UserDirectory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use storz_core::models::{FileRecord, User};
use storz_crypto::EncryptionKey;

/// Postgres-backed user directory.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    issuer_id: String,
    user_name: String,
    encryption_key: String,
    files: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DirectoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let files: Vec<FileRecord> = serde_json::from_value(row.files).map_err(|e| {
            tracing::error!(issuer_id = %row.issuer_id, error = %e, "Corrupt file list in directory");
            DirectoryError::Unavailable(format!("corrupt file list: {}", e))
        })?;

        Ok(User {
            issuer_id: row.issuer_id,
            user_name: row.user_name,
            encryption_key: EncryptionKey::from_string(row.encryption_key),
            files,
            created_at: row.created_at,
        })
    }
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(pool: &PgPool) -> DirectoryResult<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to run directory migrations");
                DirectoryError::Unavailable(format!("migration failed: {}", e))
            })
    }
}

#[async_trait]
impl UserDirectory for PgDirectory {
    async fn count(&self) -> DirectoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to count users");
                DirectoryError::Unavailable(e.to_string())
            })?;

        Ok(count as u64)
    }

    async fn find_by_issuer(&self, issuer_id: &str) -> DirectoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT issuer_id, user_name, encryption_key, files, created_at
            FROM users
            WHERE issuer_id = $1
            "#,
        )
        .bind(issuer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch user by issuer id");
            DirectoryError::Unavailable(e.to_string())
        })?;

        row.map(User::try_from).transpose()
    }

    async fn create_user(
        &self,
        issuer_id: &str,
        user_name: &str,
        key: EncryptionKey,
    ) -> DirectoryResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (issuer_id, user_name, encryption_key)
            VALUES ($1, $2, $3)
            ON CONFLICT (issuer_id) DO NOTHING
            RETURNING issuer_id, user_name, encryption_key, files, created_at
            "#,
        )
        .bind(issuer_id)
        .bind(user_name)
        .bind(key.expose())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create user");
            DirectoryError::Unavailable(e.to_string())
        })?;

        let row = row.ok_or_else(|| DirectoryError::AlreadyExists(issuer_id.to_string()))?;
        let user = User::try_from(row)?;

        tracing::info!(issuer_id = %user.issuer_id, "Created new user");
        Ok(user)
    }

    async fn append_file_record(
        &self,
        issuer_id: &str,
        record: &FileRecord,
    ) -> DirectoryResult<()> {
        let record_json = serde_json::to_value(record)
            .map_err(|e| DirectoryError::Unavailable(format!("unencodable record: {}", e)))?;

        // Single atomic append; never a read-modify-write of the whole list.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET files = files || jsonb_build_array($2::jsonb)
            WHERE issuer_id = $1
            "#,
        )
        .bind(issuer_id)
        .bind(record_json)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to append file record");
            DirectoryError::Unavailable(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::UserNotFound(issuer_id.to_string()));
        }

        tracing::info!(
            issuer_id = %issuer_id,
            file_name = %record.file_name,
            cid = %record.cid,
            size_bytes = record.size,
            "File record appended"
        );
        Ok(())
    }

    async fn display_name(&self, issuer_id: &str) -> DirectoryResult<Option<String>> {
        sqlx::query_scalar("SELECT user_name FROM users WHERE issuer_id = $1")
            .bind(issuer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch display name");
                DirectoryError::Unavailable(e.to_string())
            })
    }
}
