// handlers/public - endpoints that need no token
//
// Security Level: None
// Route Prefix: none (/, /health, /auth/*)

pub mod auth;
pub mod system;

pub use auth::{login_post, register_post};
pub use system::{health_get, root_get};
