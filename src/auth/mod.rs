//! Password authentication
//!
//! Handles:
//! - Password hashing
//! - Signed session tokens
//! - Caller identity extractors
//! - Signup, login and logout routes

mod middleware;
mod password;
mod routes;
pub mod session;

pub use middleware::{CurrentUser, MaybeUser};
pub use password::{hash_password, verify_password};
pub use routes::auth_router;
pub use session::{SESSION_COOKIE, Session, create_session_token, verify_session_token};
