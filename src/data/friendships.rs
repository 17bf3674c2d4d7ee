//! Friendship ledger
//!
//! Confirmed friendships, one row per unordered pair stored as
//! `(user_a_id, user_b_id)` with `user_a_id < user_b_id`. Like the tracker,
//! every function takes a bare connection.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use thiserror::Error;

use super::models::{FriendEntry, Identity, canonical_pair};
use crate::error::AppError;

/// Ledger-level failures
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("friendship {friendship_id} already exists")]
    AlreadyExists { friendship_id: i64 },

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(error: sqlx::Error) -> Self {
        Self::Store(AppError::Database(error))
    }
}

async fn find_id(
    conn: &mut SqliteConnection,
    id_a: &str,
    id_b: &str,
) -> Result<Option<i64>, AppError> {
    let (first, second) = canonical_pair(id_a, id_b);
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM friendships WHERE user_a_id = ? AND user_b_id = ?",
    )
    .bind(first)
    .bind(second)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id)
}

/// Whether two users are friends, in either orientation.
pub async fn exists(conn: &mut SqliteConnection, id_a: &str, id_b: &str) -> Result<bool, AppError> {
    Ok(find_id(conn, id_a, id_b).await?.is_some())
}

/// Record a friendship in canonical order.
///
/// # Errors
/// `AlreadyExists` (carrying the existing id) if the pair is already friends
pub async fn add(
    conn: &mut SqliteConnection,
    a: &Identity,
    b: &Identity,
    now: DateTime<Utc>,
) -> Result<i64, LedgerError> {
    if let Some(friendship_id) = find_id(conn, &a.id, &b.id).await? {
        return Err(LedgerError::AlreadyExists { friendship_id });
    }

    let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };

    let result = sqlx::query(
        r#"
        INSERT INTO friendships (user_a_id, user_a_handle, user_b_id, user_b_handle, established_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&first.id)
    .bind(&first.handle)
    .bind(&second.id)
    .bind(&second.handle)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Delete the friendship between two users. Returns whether a row went away.
pub async fn remove(conn: &mut SqliteConnection, id_a: &str, id_b: &str) -> Result<bool, AppError> {
    let (first, second) = canonical_pair(id_a, id_b);
    let result = sqlx::query("DELETE FROM friendships WHERE user_a_id = ? AND user_b_id = ?")
        .bind(first)
        .bind(second)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Friends of a user, newest friendship first, each resolved to the other side.
pub async fn list_for(conn: &mut SqliteConnection, id: &str) -> Result<Vec<FriendEntry>, AppError> {
    let friends = sqlx::query_as::<_, FriendEntry>(
        r#"
        SELECT
            id AS friendship_id,
            CASE WHEN user_a_id = ? THEN user_b_id ELSE user_a_id END AS friend_id,
            CASE WHEN user_a_id = ? THEN user_b_handle ELSE user_a_handle END AS friend_handle,
            established_at AS since
        FROM friendships
        WHERE user_a_id = ? OR user_b_id = ?
        ORDER BY established_at DESC, id DESC
        "#,
    )
    .bind(id)
    .bind(id)
    .bind(id)
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(friends)
}

/// Number of friends a user has.
pub async fn count_for(conn: &mut SqliteConnection, id: &str) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM friendships WHERE user_a_id = ? OR user_b_id = ?",
    )
    .bind(id)
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}
