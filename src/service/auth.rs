//! Token service
//!
//! Issues and verifies bearer tokens for registered users.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::auth::{Claims, create_token, verify_password_blocking, verify_token};
use crate::config::AuthConfig;
use crate::data::{Database, Identity, User};
use crate::error::AppError;
use crate::metrics::LOGINS_TOTAL;

/// A freshly issued token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub user_id: String,
    pub username: String,
    pub expires_in: i64,
}

/// How a login names the account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginId {
    ById(String),
    ByUsername(String),
}

impl LoginId {
    fn as_str(&self) -> &str {
        match self {
            Self::ById(value) | Self::ByUsername(value) => value.trim(),
        }
    }
}

/// Token service
pub struct AuthService {
    db: Arc<Database>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(db: Arc<Database>, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Check credentials and issue a token.
    ///
    /// Every failure looks the same to the caller.
    pub async fn login(&self, login: &LoginId, password: &str) -> Result<IssuedToken, AppError> {
        let value = login.as_str();
        if value.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "user_id or username and password are required".to_string(),
            ));
        }

        let user = match login {
            LoginId::ById(_) => self.db.find_user_by_id(value).await?,
            LoginId::ByUsername(_) => self.db.find_user_by_username(value).await?,
        };

        let verified = match &user {
            Some(user) => verify_password_blocking(password, &user.password_hash).await,
            None => false,
        };

        let Some(user) = user.filter(|_| verified) else {
            LOGINS_TOTAL.with_label_values(&["rejected"]).inc();
            tracing::info!(login = %value, "Login rejected");
            return Err(AppError::Unauthorized);
        };

        LOGINS_TOTAL.with_label_values(&["ok"]).inc();
        tracing::info!(user_id = %user.id, "User logged in");
        self.issue(&user.identity())
    }

    /// Resolve a bearer token to the identity it was issued for.
    ///
    /// The user must still exist.
    pub async fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let claims = verify_token(token, &self.config.jwt_secret, Utc::now())?;
        let user: User = self
            .db
            .find_user_by_id(&claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(user.identity())
    }

    /// Issue a new token for an already authenticated identity
    pub fn refresh(&self, identity: &Identity) -> Result<IssuedToken, AppError> {
        self.issue(identity)
    }

    fn issue(&self, identity: &Identity) -> Result<IssuedToken, AppError> {
        let ttl = Duration::seconds(self.config.token_ttl_seconds);
        let claims = Claims::new(identity, Utc::now(), ttl);
        let token = create_token(&claims, &self.config.jwt_secret)?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            user_id: identity.id.clone(),
            username: identity.handle.clone(),
            expires_in: self.config.token_ttl_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MIN_COST, hash_password};
    use tempfile::TempDir;

    async fn service() -> (AuthService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        db.insert_user_with_next_id("alice", &hash_password("secret", MIN_COST).unwrap(), Utc::now())
            .await
            .unwrap();

        let config = AuthConfig {
            jwt_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            token_ttl_seconds: 3600,
            password_cost: MIN_COST,
        };
        (AuthService::new(Arc::new(db), config), temp_dir)
    }

    #[tokio::test]
    async fn login_by_id_or_username() {
        let (service, _temp_dir) = service().await;

        for login in [
            LoginId::ById("U01".to_string()),
            LoginId::ByUsername("alice".to_string()),
        ] {
            let issued = service.login(&login, "secret").await.unwrap();
            assert_eq!(issued.user_id, "U01");
            assert_eq!(issued.expires_in, 3600);

            let identity = service.verify(&issued.token).await.unwrap();
            assert_eq!(identity.id, "U01");
            assert_eq!(identity.handle, "alice");
        }
    }

    #[tokio::test]
    async fn wrong_credentials_are_unauthorized() {
        let (service, _temp_dir) = service().await;

        let alice = LoginId::ByUsername("alice".to_string());
        assert!(matches!(
            service.login(&alice, "wrong").await,
            Err(AppError::Unauthorized)
        ));
        let nobody = LoginId::ByUsername("nobody".to_string());
        assert!(matches!(
            service.login(&nobody, "secret").await,
            Err(AppError::Unauthorized)
        ));
        // a username is never looked up as an id
        let by_id = LoginId::ById("alice".to_string());
        assert!(matches!(
            service.login(&by_id, "secret").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn id_shaped_username_logs_in_by_username() {
        let (service, _temp_dir) = service().await;
        service
            .db
            .insert_user_with_next_id("U01", &hash_password("other", MIN_COST).unwrap(), Utc::now())
            .await
            .unwrap();

        let issued = service
            .login(&LoginId::ByUsername("U01".to_string()), "other")
            .await
            .unwrap();
        assert_eq!(issued.user_id, "U02");
        assert_eq!(issued.username, "U01");

        let issued = service
            .login(&LoginId::ById("U01".to_string()), "secret")
            .await
            .unwrap();
        assert_eq!(issued.username, "alice");
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_rejected() {
        let (service, _temp_dir) = service().await;
        let ghost = Identity {
            id: "U99".to_string(),
            handle: "ghost".to_string(),
        };

        let issued = service.refresh(&ghost).unwrap();
        assert!(matches!(
            service.verify(&issued.token).await,
            Err(AppError::Unauthorized)
        ));
    }
}
