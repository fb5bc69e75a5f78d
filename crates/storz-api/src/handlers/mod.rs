pub mod upload;
pub mod users;

pub use upload::upload;
pub use users::{create_user, get_name, login, root, secure_ping};
