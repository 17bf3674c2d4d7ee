//! Data models
//!
//! Rust structs representing database rows.
//! Timestamps are chrono `DateTime<Utc>`; row ids are SQLite integers
//! except user ids, which are the sequential `Uxx` strings handed out at
//! registration.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identity
// =============================================================================

/// A resolved identity: the only thing other components know about a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub handle: String,
}

/// Registered user row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            handle: self.username.clone(),
        }
    }
}

/// Format the n-th user id ("U01", "U02", ..., "U100")
pub fn format_user_id(number: u64) -> String {
    format!("U{number:02}")
}

/// Parse the numeric part of a user id, if it has the `Uxx` shape
pub fn parse_user_id(id: &str) -> Option<u64> {
    id.strip_prefix('U')?.parse().ok()
}

// =============================================================================
// Friend requests
// =============================================================================

/// Lifecycle status of a directional friend request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the recipient may still answer a request in this status
    pub fn is_respondable(&self) -> bool {
        matches!(self, Self::Pending | Self::Rejected)
    }
}

impl fmt::Display for FriendRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgment marker attached to a request.
///
/// Informational only; persisted as a JSON object of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestPayload(pub BTreeMap<String, String>);

impl RequestPayload {
    /// `{"friend_request_from_<sender>": "accept_or_reject"}`
    pub fn for_sender(sender_handle: &str) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            format!("friend_request_from_{sender_handle}"),
            "accept_or_reject".to_string(),
        );
        Self(entries)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self)
    }
}

/// Friend request as stored
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct FriendRequestRow {
    pub id: i64,
    pub sender_id: String,
    pub sender_handle: String,
    pub recipient_id: String,
    pub recipient_handle: String,
    pub status: FriendRequestStatus,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub last_transition_at: DateTime<Utc>,
}

/// Directional friend request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendRequest {
    pub id: i64,
    pub sender_id: String,
    pub sender_handle: String,
    pub recipient_id: String,
    pub recipient_handle: String,
    pub status: FriendRequestStatus,
    pub payload: RequestPayload,
    pub created_at: DateTime<Utc>,
    pub last_transition_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn is_from(&self, sender_id: &str) -> bool {
        self.sender_id == sender_id
    }
}

impl TryFrom<FriendRequestRow> for FriendRequest {
    type Error = serde_json::Error;

    fn try_from(row: FriendRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            payload: RequestPayload::from_json(&row.payload)?,
            id: row.id,
            sender_id: row.sender_id,
            sender_handle: row.sender_handle,
            recipient_id: row.recipient_id,
            recipient_handle: row.recipient_handle,
            status: row.status,
            created_at: row.created_at,
            last_transition_at: row.last_transition_at,
        })
    }
}

// =============================================================================
// Friendships
// =============================================================================

/// Order two ids canonically: lexicographically smaller first
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// A friendship seen from one side
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct FriendEntry {
    pub friendship_id: i64,
    pub friend_id: String,
    pub friend_handle: String,
    pub since: DateTime<Utc>,
}

// =============================================================================
// Messages
// =============================================================================

/// Direct message
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

// =============================================================================
// Verification codes
// =============================================================================

/// Email verification code
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationCode {
    pub id: i64,
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl VerificationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
