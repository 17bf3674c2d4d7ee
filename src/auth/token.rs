//! Bearer tokens
//!
//! Compact HS256 JWTs signed with the configured secret.
//! No server-side token storage needed.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::data::Identity;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Fixed JOSE header; tokens with any other header are rejected
const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Username at issue time
    pub username: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl Claims {
    /// Claims for `identity` valid for `ttl` from `now`
    pub fn new(identity: &Identity, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: identity.id.clone(),
            username: identity.handle.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            handle: self.username.clone(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

fn mac_for(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid signing key: {e}")))
}

/// Create a signed token
///
/// Token format: base64(header).base64(claims).base64(hmac_sha256(header.claims))
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_vec(claims).map_err(|e| AppError::Internal(e.into()))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

/// Verify and decode a token
///
/// # Errors
/// `TokenExpired` for a correctly signed but expired token,
/// `Unauthorized` for anything malformed or wrongly signed
pub fn verify_token(token: &str, secret: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::Unauthorized);
    };

    let header = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let header: serde_json::Value =
        serde_json::from_slice(&header).map_err(|_| AppError::Unauthorized)?;
    if header.get("alg").and_then(|alg| alg.as_str()) != Some("HS256") {
        return Err(AppError::Unauthorized);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let mut mac = mac_for(secret)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)?;

    if claims.is_expired(now) {
        return Err(AppError::TokenExpired);
    }

    Ok(claims)
}
