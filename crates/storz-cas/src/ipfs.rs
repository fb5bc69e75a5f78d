use crate::traits::{CasError, CasResult, ContentReceipt, ContentStore};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

/// IPFS HTTP-API content store.
///
/// Submits blobs through `POST /api/v0/add` on an IPFS node or pinning
/// gateway and parses the add receipt. No retrieval surface is needed by the
/// ingestion pipeline.
#[derive(Clone)]
pub struct IpfsStore {
    client: reqwest::Client,
    api_url: String,
}

/// Wire shape of the `add` response. `Size` arrives as a decimal string.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
    #[serde(rename = "Size")]
    size: String,
}

impl IpfsStore {
    pub fn new(api_url: impl Into<String>) -> Self {
        IpfsStore {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }

    fn add_endpoint(&self) -> String {
        format!("{}/api/v0/add?cid-version=1", self.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ContentStore for IpfsStore {
    async fn put(&self, name: &str, data: Bytes) -> CasResult<ContentReceipt> {
        let start = std::time::Instant::now();
        let submitted_bytes = data.len();

        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.add_endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| CasError::Unavailable(format!("add request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.is_client_error() {
                return Err(CasError::Rejected(format!("{}: {}", status, body)));
            }
            return Err(CasError::Unavailable(format!("{}: {}", status, body)));
        }

        let receipt: AddResponse = response
            .json()
            .await
            .map_err(|e| CasError::InvalidResponse(format!("bad add receipt: {}", e)))?;

        let size = receipt
            .size
            .parse::<u64>()
            .map_err(|_| CasError::InvalidResponse(format!("bad size field: {}", receipt.size)))?;

        tracing::info!(
            cid = %receipt.hash,
            stored_name = %receipt.name,
            submitted_bytes,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Content submitted to IPFS"
        );

        Ok(ContentReceipt {
            cid: receipt.hash,
            size,
            stored_name: receipt.name,
        })
    }
}
