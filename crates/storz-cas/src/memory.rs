use crate::traits::{CasResult, ContentReceipt, ContentStore};
use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory content-addressed store for tests.
///
/// Content identifiers are the sha256 of the bytes, so the idempotence
/// property of the real network (same bytes, same cid) holds here too.
#[derive(Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs accepted so far.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn contains(&self, cid: &str) -> bool {
        self.blobs.read().await.contains_key(cid)
    }

    pub async fn get(&self, cid: &str) -> Option<Bytes> {
        self.blobs.read().await.get(cid).cloned()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, name: &str, data: Bytes) -> CasResult<ContentReceipt> {
        let cid = format!("bafk{}", hex::encode(Sha256::digest(&data)));
        let size = data.len() as u64;

        self.blobs.write().await.insert(cid.clone(), data);

        Ok(ContentReceipt {
            cid,
            size,
            stored_name: name.to_string(),
        })
    }
}
