pub mod upload;
pub mod user;

pub use upload::{UploadedFile, UserContext};
pub use user::{FileRecord, User};
