//! API layer
//!
//! HTTP handlers for:
//! - Versioned JSON API (users, friend requests, friends, messages)
//! - Email verification
//! - Health and metrics (Prometheus)

mod dto;
mod system;
mod v1;
mod verification;

pub use dto::*;

pub use system::system_router;
pub use v1::api_v1_router;
pub use verification::verification_router;
