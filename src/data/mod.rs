//! Data layer module
//!
//! Handles all data persistence in one SQLite database:
//! - users (identity directory), messages, verification codes
//! - friend-request tracker
//! - friendship ledger

mod database;
pub mod friend_requests;
pub mod friendships;
mod models;

pub use database::{ConnectOptions, Database, ImmediateTx};
pub use friend_requests::TrackerError;
pub use friendships::LedgerError;
pub use models::*;
