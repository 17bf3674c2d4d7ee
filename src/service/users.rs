//! User service
//!
//! Registration and the public user directory.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::hash_password_blocking;
use crate::data::{Database, User};
use crate::error::AppError;
use crate::metrics::REGISTRATIONS_TOTAL;

const MAX_USERNAME_LEN: usize = 64;

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// User service
pub struct UserService {
    db: Arc<Database>,
    password_cost: u32,
}

impl UserService {
    pub fn new(db: Arc<Database>, password_cost: u32) -> Self {
        Self { db, password_cost }
    }

    /// Register a new user under the next sequential id
    ///
    /// # Errors
    /// `Validation` for an empty username or password, `Conflict` if the
    /// username is taken
    pub async fn register(&self, username: &str, password: &str) -> Result<UserProfile, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("username is required".to_string()));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::Validation(format!(
                "username must be at most {MAX_USERNAME_LEN} characters"
            )));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(
                "username cannot contain whitespace".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(AppError::Validation("password is required".to_string()));
        }

        let password_hash = hash_password_blocking(password, self.password_cost).await?;
        let user = self
            .db
            .insert_user_with_next_id(username, &password_hash, Utc::now())
            .await?;

        REGISTRATIONS_TOTAL.inc();
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user.into())
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserProfile, AppError> {
        self.db
            .find_user_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))
    }

    /// All users in registration order
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, AppError> {
        Ok(self
            .db
            .list_users()
            .await?
            .into_iter()
            .map(UserProfile::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn service() -> (UserService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (UserService::new(Arc::new(db), crate::auth::MIN_COST), temp_dir)
    }

    #[tokio::test]
    async fn ids_are_allocated_in_order() {
        let (service, _temp_dir) = service().await;

        let alice = service.register("alice", "pw").await.unwrap();
        let bob = service.register("  bob ", "pw").await.unwrap();
        assert_eq!(alice.user_id, "U01");
        assert_eq!(bob.user_id, "U02");
        assert_eq!(bob.username, "bob");

        let listed: Vec<_> = service
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|user| user.user_id)
            .collect();
        assert_eq!(listed, ["U01", "U02"]);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let (service, _temp_dir) = service().await;
        service.register("alice", "pw").await.unwrap();

        let error = service.register("alice", "other").await.unwrap_err();
        assert!(matches!(error, AppError::Conflict(_)));
        assert_eq!(service.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let (service, _temp_dir) = service().await;

        assert!(matches!(
            service.register("   ", "pw").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.register("alice", "").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.register("al ice", "pw").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (service, _temp_dir) = service().await;

        assert!(matches!(
            service.get_user("U42").await,
            Err(AppError::NotFound(_))
        ));
    }
}
