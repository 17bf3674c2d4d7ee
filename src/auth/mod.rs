//! Authentication
//!
//! Handles:
//! - Password hashing
//! - Bearer token signing and verification
//! - The `CurrentUser` extractor
//! - Registration and token endpoints

mod handlers;
mod middleware;
mod password;
mod token;

pub use handlers::auth_router;
pub use middleware::CurrentUser;
pub use password::{
    MAX_COST, MIN_COST, hash_password, hash_password_blocking, verify_password,
    verify_password_blocking,
};
pub use token::{Claims, create_token, verify_token};
