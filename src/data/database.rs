//! SQLite database operations
//!
//! Pool management, the immediate-transaction handle used by every
//! check-then-write sequence, the identity directory and the simple
//! message and verification-code tables. Friend requests and friendships
//! live in their own modules because they must compose inside one
//! transaction.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Connection, Pool, Sqlite, SqliteConnection};

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Connection tuning for [`Database::connect_with`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_connections: 8,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// An open `BEGIN IMMEDIATE` transaction on a dedicated pooled connection.
///
/// SQLite grants the reserved (write) lock when the transaction starts, so
/// two transactions that both read-then-write cannot interleave: the second
/// waits for the first up to the busy timeout. Finish with [`finish`];
/// a handle dropped without finishing closes its connection instead of
/// returning it to the pool, and SQLite rolls the transaction back.
///
/// [`finish`]: ImmediateTx::finish
pub struct ImmediateTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl ImmediateTx {
    /// The connection the transaction runs on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        match self.conn.as_mut() {
            Some(conn) => &mut **conn,
            // only `finish` and `drop` take the connection, both consume the handle
            None => unreachable!("transaction connection already released"),
        }
    }

    /// Commit when `result` is `Ok`, roll back otherwise.
    ///
    /// The body's error wins over a rollback error; a failed commit is
    /// reported as a database error and nothing is persisted.
    pub async fn finish<T>(mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        use crate::metrics::DB_TRANSACTIONS_TOTAL;

        let Some(mut conn) = self.conn.take() else {
            unreachable!("transaction connection already released");
        };

        match result {
            Ok(value) => match sqlx::query("COMMIT").execute(&mut *conn).await {
                Ok(_) => {
                    DB_TRANSACTIONS_TOTAL.with_label_values(&["commit"]).inc();
                    Ok(value)
                }
                Err(error) => {
                    DB_TRANSACTIONS_TOTAL.with_label_values(&["commit_failed"]).inc();
                    discard(conn);
                    Err(error.into())
                }
            },
            Err(error) => {
                DB_TRANSACTIONS_TOTAL.with_label_values(&["rollback"]).inc();
                if let Err(rollback_error) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    tracing::warn!(error = %rollback_error, "rollback failed; closing connection");
                    discard(conn);
                }
                Err(error)
            }
        }
    }
}

impl Drop for ImmediateTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::debug!("immediate transaction abandoned; closing its connection");
            discard(conn);
        }
    }
}

/// Remove a connection from the pool and close it.
fn discard(conn: PoolConnection<Sqlite>) {
    drop(conn.detach());
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        Self::connect_with(path, ConnectOptions::default()).await
    }

    /// Connect with explicit pool size and busy timeout.
    pub async fn connect_with(path: &Path, options: ConnectOptions) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect_options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    /// Borrow a pooled connection for read-only work.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, AppError> {
        Ok(self.pool.acquire().await?)
    }

    /// Start a `BEGIN IMMEDIATE` transaction.
    pub async fn begin_immediate(&self) -> Result<ImmediateTx, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(ImmediateTx { conn: Some(conn) })
    }

    // =========================================================================
    // Identity directory
    // =========================================================================

    /// Resolve an identity by handle (username).
    pub async fn resolve_by_handle(&self, handle: &str) -> Result<Option<Identity>, AppError> {
        Ok(self
            .find_user_by_username(handle)
            .await?
            .map(|user| user.identity()))
    }

    /// Resolve an identity by user id.
    pub async fn resolve_by_id(&self, id: &str) -> Result<Option<Identity>, AppError> {
        Ok(self.find_user_by_id(id).await?.map(|user| user.identity()))
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// All users in registration order
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Insert a user under the next free `Uxx` id.
    ///
    /// The handle check, id allocation and insert share one immediate
    /// transaction so concurrent registrations never collide.
    ///
    /// # Errors
    /// `Conflict` if the username is taken
    pub async fn insert_user_with_next_id(
        &self,
        username: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<User, AppError> {
        let mut tx = self.begin_immediate().await?;

        let result: Result<User, AppError> = async {
            let conn = tx.conn();

            let taken = sqlx::query_scalar::<_, i64>("SELECT 1 FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&mut *conn)
                .await?;
            if taken.is_some() {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }

            let last_id =
                sqlx::query_scalar::<_, String>("SELECT id FROM users ORDER BY seq DESC LIMIT 1")
                    .fetch_optional(&mut *conn)
                    .await?;
            let next_number = last_id
                .as_deref()
                .and_then(parse_user_id)
                .map_or(1, |number| number + 1);

            let user = User {
                id: format_user_id(next_number),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at,
            };

            sqlx::query(
                "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .execute(&mut *conn)
            .await?;

            Ok(user)
        }
        .await;

        tx.finish(result).await
    }

    // =========================================================================
    // Messages
    // =========================================================================

    pub async fn insert_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Message, AppError> {
        let result = sqlx::query(
            "INSERT INTO messages (sender_id, recipient_id, body, created_at, is_read) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(sender_id)
        .bind(recipient_id)
        .bind(body)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            id: result.last_insert_rowid(),
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            body: body.to_string(),
            created_at,
            is_read: false,
        })
    }

    pub async fn get_message(&self, id: i64) -> Result<Option<Message>, AppError> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }

    /// Messages sent or received by a user, newest first
    pub async fn get_messages_for_user(&self, user_id: &str) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE sender_id = ? OR recipient_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Messages exchanged between two users, oldest first
    pub async fn get_conversation(
        &self,
        user_id: &str,
        other_user_id: &str,
    ) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE (sender_id = ? AND recipient_id = ?)
               OR (sender_id = ? AND recipient_id = ?)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(other_user_id)
        .bind(other_user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn mark_message_read(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE messages SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_message(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Verification codes
    // =========================================================================

    pub async fn insert_verification_code(
        &self,
        email: &str,
        code: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationCode, AppError> {
        let result = sqlx::query(
            "INSERT INTO verification_codes (email, code, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(email)
        .bind(code)
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(VerificationCode {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            code: code.to_string(),
            created_at,
            expires_at,
            verified_at: None,
        })
    }

    pub async fn get_verification_code(
        &self,
        id: i64,
    ) -> Result<Option<VerificationCode>, AppError> {
        let code =
            sqlx::query_as::<_, VerificationCode>("SELECT * FROM verification_codes WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(code)
    }

    /// Mark a code verified unless it already was.
    ///
    /// Returns false when another caller consumed it first.
    pub async fn consume_verification_code(
        &self,
        id: i64,
        verified_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE verification_codes SET verified_at = ? WHERE id = ? AND verified_at IS NULL",
        )
        .bind(verified_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_verification_code(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM verification_codes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
