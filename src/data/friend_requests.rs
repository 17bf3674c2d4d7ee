//! Friend-request tracker
//!
//! Directional request records, one per ordered `(sender, recipient)` pair.
//! Every function takes a bare connection so the workflow engine can run
//! several of them inside one immediate transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use thiserror::Error;

use super::models::{FriendRequest, FriendRequestRow, FriendRequestStatus, Identity, RequestPayload};
use crate::error::AppError;

const COLUMNS: &str = "id, sender_id, sender_handle, recipient_id, recipient_handle, status, payload, created_at, last_transition_at";

/// Tracker-level failures
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A row already exists for this ordered pair
    #[error("friend request from {sender_id} to {recipient_id} already exists")]
    DuplicatePair {
        sender_id: String,
        recipient_id: String,
    },

    #[error("friend request {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<sqlx::Error> for TrackerError {
    fn from(error: sqlx::Error) -> Self {
        Self::Store(AppError::Database(error))
    }
}

impl From<TrackerError> for AppError {
    fn from(error: TrackerError) -> Self {
        match error {
            TrackerError::Store(inner) => inner,
            TrackerError::NotFound(_) => AppError::NotFound(error.to_string()),
            TrackerError::DuplicatePair { .. } => AppError::Conflict(error.to_string()),
        }
    }
}

fn decode(row: FriendRequestRow) -> Result<FriendRequest, AppError> {
    let id = row.id;
    FriendRequest::try_from(row).map_err(|error| {
        AppError::Internal(anyhow::anyhow!(
            "friend request {id} has an unreadable payload: {error}"
        ))
    })
}

fn decode_all(rows: Vec<FriendRequestRow>) -> Result<Vec<FriendRequest>, AppError> {
    rows.into_iter().map(decode).collect()
}

fn encode_payload(payload: &RequestPayload) -> Result<String, AppError> {
    payload
        .to_json()
        .map_err(|error| AppError::Internal(error.into()))
}

async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<FriendRequest>, AppError> {
    let row = sqlx::query_as::<_, FriendRequestRow>(&format!(
        "SELECT {COLUMNS} FROM friend_requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(decode).transpose()
}

/// Insert a new pending request.
///
/// # Errors
/// `DuplicatePair` if a row for `(sender, recipient)` already exists
pub async fn create(
    conn: &mut SqliteConnection,
    sender: &Identity,
    recipient: &Identity,
    payload: &RequestPayload,
    now: DateTime<Utc>,
) -> Result<FriendRequest, TrackerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO friend_requests
            (sender_id, sender_handle, recipient_id, recipient_handle, status, payload, created_at, last_transition_at)
        VALUES (?, ?, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(&sender.id)
    .bind(&sender.handle)
    .bind(&recipient.id)
    .bind(&recipient.handle)
    .bind(encode_payload(payload)?)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(done) => Ok(FriendRequest {
            id: done.last_insert_rowid(),
            sender_id: sender.id.clone(),
            sender_handle: sender.handle.clone(),
            recipient_id: recipient.id.clone(),
            recipient_handle: recipient.handle.clone(),
            status: FriendRequestStatus::Pending,
            payload: payload.clone(),
            created_at: now,
            last_transition_at: now,
        }),
        Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
            Err(TrackerError::DuplicatePair {
                sender_id: sender.id.clone(),
                recipient_id: recipient.id.clone(),
            })
        }
        Err(error) => Err(error.into()),
    }
}

/// Reset the existing `(sender, recipient)` row to pending.
///
/// Keeps the row id; refreshes handles, payload and both timestamps.
pub async fn reopen(
    conn: &mut SqliteConnection,
    sender: &Identity,
    recipient: &Identity,
    payload: &RequestPayload,
    now: DateTime<Utc>,
) -> Result<FriendRequest, TrackerError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE friend_requests
        SET status = 'pending', sender_handle = ?, recipient_handle = ?, payload = ?,
            created_at = ?, last_transition_at = ?
        WHERE sender_id = ? AND recipient_id = ?
        RETURNING id
        "#,
    )
    .bind(&sender.handle)
    .bind(&recipient.handle)
    .bind(encode_payload(payload)?)
    .bind(now)
    .bind(now)
    .bind(&sender.id)
    .bind(&recipient.id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(id) = id else {
        return Err(TrackerError::Store(AppError::NotFound(format!(
            "no friend request from {} to {} to reopen",
            sender.id, recipient.id
        ))));
    };

    Ok(FriendRequest {
        id,
        sender_id: sender.id.clone(),
        sender_handle: sender.handle.clone(),
        recipient_id: recipient.id.clone(),
        recipient_handle: recipient.handle.clone(),
        status: FriendRequestStatus::Pending,
        payload: payload.clone(),
        created_at: now,
        last_transition_at: now,
    })
}

/// The request between two users in either orientation.
///
/// When both orientations exist the pending one wins, then the most
/// recently transitioned.
pub async fn find_between(
    conn: &mut SqliteConnection,
    id_a: &str,
    id_b: &str,
) -> Result<Option<FriendRequest>, AppError> {
    let row = sqlx::query_as::<_, FriendRequestRow>(&format!(
        r#"
        SELECT {COLUMNS} FROM friend_requests
        WHERE (sender_id = ? AND recipient_id = ?)
           OR (sender_id = ? AND recipient_id = ?)
        ORDER BY (status = 'pending') DESC, last_transition_at DESC, id DESC
        LIMIT 1
        "#
    ))
    .bind(id_a)
    .bind(id_b)
    .bind(id_b)
    .bind(id_a)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(decode).transpose()
}

/// The request from `sender_id` to `recipient_id` exactly, any status.
pub async fn find_directed(
    conn: &mut SqliteConnection,
    sender_id: &str,
    recipient_id: &str,
) -> Result<Option<FriendRequest>, AppError> {
    let row = sqlx::query_as::<_, FriendRequestRow>(&format!(
        "SELECT {COLUMNS} FROM friend_requests WHERE sender_id = ? AND recipient_id = ?"
    ))
    .bind(sender_id)
    .bind(recipient_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(decode).transpose()
}

/// Pending requests addressed to a user, newest first
pub async fn find_incoming_pending(
    conn: &mut SqliteConnection,
    recipient_id: &str,
) -> Result<Vec<FriendRequest>, AppError> {
    let rows = sqlx::query_as::<_, FriendRequestRow>(&format!(
        r#"
        SELECT {COLUMNS} FROM friend_requests
        WHERE recipient_id = ? AND status = 'pending'
        ORDER BY last_transition_at DESC, id DESC
        "#
    ))
    .bind(recipient_id)
    .fetch_all(&mut *conn)
    .await?;

    decode_all(rows)
}

/// Every request a user has sent, newest first
pub async fn find_by_sender(
    conn: &mut SqliteConnection,
    sender_id: &str,
) -> Result<Vec<FriendRequest>, AppError> {
    let rows = sqlx::query_as::<_, FriendRequestRow>(&format!(
        r#"
        SELECT {COLUMNS} FROM friend_requests
        WHERE sender_id = ?
        ORDER BY last_transition_at DESC, id DESC
        "#
    ))
    .bind(sender_id)
    .fetch_all(&mut *conn)
    .await?;

    decode_all(rows)
}

/// Move a request to `new_status` and stamp the transition time.
///
/// # Errors
/// `NotFound` if no such request exists
pub async fn transition(
    conn: &mut SqliteConnection,
    request_id: i64,
    new_status: FriendRequestStatus,
    now: DateTime<Utc>,
) -> Result<FriendRequest, TrackerError> {
    let result =
        sqlx::query("UPDATE friend_requests SET status = ?, last_transition_at = ? WHERE id = ?")
            .bind(new_status)
            .bind(now)
            .bind(request_id)
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(TrackerError::NotFound(request_id));
    }

    get(conn, request_id)
        .await?
        .ok_or(TrackerError::NotFound(request_id))
}
