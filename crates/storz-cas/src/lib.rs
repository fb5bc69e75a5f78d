//! Content-addressed storage client
//!
//! This crate defines the `ContentStore` trait the ingestion pipeline submits
//! ciphertext through, an IPFS HTTP-API implementation, and an in-memory
//! implementation for tests. The pipeline only needs `put`; retrieval goes
//! through the network's own gateways and is out of scope here.

mod ipfs;
mod memory;
mod traits;

pub use ipfs::IpfsStore;
pub use memory::MemoryStore;
pub use traits::{CasError, CasResult, ContentReceipt, ContentStore};
