//! Email verification service
//!
//! Issues short-lived codes and checks them once. Delivery goes through
//! the [`Mailer`] trait; the shipped [`LogMailer`] only logs.

use std::sync::Arc;

use axum::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::config::VerificationConfig;
use crate::data::Database;
use crate::error::AppError;
use crate::metrics::VERIFICATION_CODES_TOTAL;

const CODE_ALPHABET: &[u8] = b"0123456789abcdef!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Compare a submitted code with the stored one in constant time
fn codes_match(stored: &str, submitted: &str) -> bool {
    stored.as_bytes().ct_eq(submitted.trim().as_bytes()).into()
}

/// Hands verification codes to the outside world
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), AppError>;
}

/// Mailer that writes the dispatch to the log and nothing else
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_code(&self, email: &str, _code: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "Verification code dispatched");
        Ok(())
    }
}

/// Result of issuing a code
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCode {
    pub verification_id: i64,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful verification
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedEmail {
    pub verification_id: i64,
    pub email: String,
    pub verified_at: DateTime<Utc>,
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation("a valid email address is required".to_string()))
    }
}

fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Verification service
pub struct VerificationService {
    db: Arc<Database>,
    mailer: Arc<dyn Mailer>,
    config: VerificationConfig,
}

impl VerificationService {
    pub fn new(db: Arc<Database>, mailer: Arc<dyn Mailer>, config: VerificationConfig) -> Self {
        Self { db, mailer, config }
    }

    /// Generate, store and mail a code for `email`
    ///
    /// # Errors
    /// `Validation` for a malformed address, `Mail` if the mailer fails
    /// (the stored code is removed again)
    pub async fn send_code(&self, email: &str) -> Result<IssuedCode, AppError> {
        let email = normalize_email(email)?;
        let code = generate_code(self.config.code_length);
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.code_ttl_seconds);

        let stored = self
            .db
            .insert_verification_code(&email, &code, now, expires_at)
            .await?;

        if let Err(error) = self.mailer.send_code(&email, &code).await {
            VERIFICATION_CODES_TOTAL
                .with_label_values(&["mail_failed"])
                .inc();
            tracing::warn!(%error, verification_id = stored.id, "Mailer failed; discarding code");
            self.db.delete_verification_code(stored.id).await?;
            return Err(error);
        }

        VERIFICATION_CODES_TOTAL.with_label_values(&["issued"]).inc();

        Ok(IssuedCode {
            verification_id: stored.id,
            email,
            expires_at,
        })
    }

    /// Check a code; each code verifies at most once
    pub async fn verify_code(
        &self,
        verification_id: i64,
        code: &str,
    ) -> Result<VerifiedEmail, AppError> {
        let now = Utc::now();
        let stored = self
            .db
            .get_verification_code(verification_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let rejection = if stored.verified_at.is_some() {
            Some("already_used")
        } else if stored.is_expired(now) {
            Some("expired")
        } else if !codes_match(&stored.code, code) {
            Some("mismatch")
        } else {
            None
        };

        if let Some(reason) = rejection {
            VERIFICATION_CODES_TOTAL.with_label_values(&[reason]).inc();
            tracing::info!(verification_id, reason, "Verification code rejected");
            return Err(AppError::Unauthorized);
        }

        if !self.db.consume_verification_code(verification_id, now).await? {
            VERIFICATION_CODES_TOTAL
                .with_label_values(&["already_used"])
                .inc();
            return Err(AppError::Unauthorized);
        }

        VERIFICATION_CODES_TOTAL.with_label_values(&["verified"]).inc();

        Ok(VerifiedEmail {
            verification_id,
            email: stored.email,
            verified_at: now,
        })
    }
}
