//! User directory
//!
//! Key-value store of user records keyed by issuer identifier. The ingestion
//! pipeline holds only a read/append capability against it: file records are
//! appended one at a time as independent atomic operations, never by
//! rewriting the whole list.

mod memory;
mod postgres;
mod traits;

pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;
pub use traits::{DirectoryError, DirectoryResult, UserDirectory};
