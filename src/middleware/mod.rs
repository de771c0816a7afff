pub mod auth;

pub use auth::{AuthUser, Claims, require_auth};
