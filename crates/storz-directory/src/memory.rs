use crate::traits::{DirectoryError, DirectoryResult, UserDirectory};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use storz_core::models::{FileRecord, User};
use storz_crypto::EncryptionKey;
use tokio::sync::RwLock;

/// In-memory user directory for tests.
///
/// The write lock around each operation gives the same per-operation
/// atomicity the Postgres backend gets from a single `UPDATE`.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn count(&self) -> DirectoryResult<u64> {
        Ok(self.users.read().await.len() as u64)
    }

    async fn find_by_issuer(&self, issuer_id: &str) -> DirectoryResult<Option<User>> {
        Ok(self.users.read().await.get(issuer_id).cloned())
    }

    async fn create_user(
        &self,
        issuer_id: &str,
        user_name: &str,
        key: EncryptionKey,
    ) -> DirectoryResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(issuer_id) {
            return Err(DirectoryError::AlreadyExists(issuer_id.to_string()));
        }

        let user = User {
            issuer_id: issuer_id.to_string(),
            user_name: user_name.to_string(),
            encryption_key: key,
            files: vec![],
            created_at: Utc::now(),
        };
        users.insert(issuer_id.to_string(), user.clone());
        Ok(user)
    }

    async fn append_file_record(
        &self,
        issuer_id: &str,
        record: &FileRecord,
    ) -> DirectoryResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(issuer_id)
            .ok_or_else(|| DirectoryError::UserNotFound(issuer_id.to_string()))?;
        user.files.push(record.clone());
        Ok(())
    }

    async fn display_name(&self, issuer_id: &str) -> DirectoryResult<Option<String>> {
        Ok(self
            .users
            .read()
            .await
            .get(issuer_id)
            .map(|u| u.user_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let dir = MemoryDirectory::new();
        assert_eq!(dir.count().await.unwrap(), 0);

        dir.create_user("did:a", "alice", EncryptionKey::generate())
            .await
            .unwrap();

        assert_eq!(dir.count().await.unwrap(), 1);
        let found = dir.find_by_issuer("did:a").await.unwrap().unwrap();
        assert_eq!(found.user_name, "alice");
        assert!(found.files.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_create_preserves_existing_key() {
        let dir = MemoryDirectory::new();
        let original = dir
            .create_user("did:a", "alice", EncryptionKey::generate())
            .await
            .unwrap();

        let result = dir
            .create_user("did:a", "impostor", EncryptionKey::generate())
            .await;
        assert!(matches!(result, Err(DirectoryError::AlreadyExists(_))));

        let stored = dir.find_by_issuer("did:a").await.unwrap().unwrap();
        assert_eq!(stored.user_name, "alice");
        assert_eq!(stored.encryption_key, original.encryption_key);
    }

    #[tokio::test]
    async fn test_append_to_unknown_user_fails() {
        let dir = MemoryDirectory::new();
        let record = FileRecord {
            file_name: "a.txt".to_string(),
            public: false,
            cid: "bafy-1".to_string(),
            created_at: Utc::now(),
            size: 1,
        };

        let result = dir.append_file_record("did:missing", &record).await;
        assert!(matches!(result, Err(DirectoryError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let dir = MemoryDirectory::new();
        dir.create_user("did:a", "alice", EncryptionKey::generate())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let dir = dir.clone();
            handles.push(tokio::spawn(async move {
                let record = FileRecord {
                    file_name: format!("f{}.txt", i),
                    public: false,
                    cid: format!("bafy-{}", i),
                    created_at: Utc::now(),
                    size: i as u64,
                };
                dir.append_file_record("did:a", &record).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let user = dir.find_by_issuer("did:a").await.unwrap().unwrap();
        assert_eq!(user.files.len(), 16);
    }

    #[tokio::test]
    async fn test_display_name_absent_user_is_none() {
        let dir = MemoryDirectory::new();
        assert_eq!(dir.display_name("did:none").await.unwrap(), None);
    }
}
