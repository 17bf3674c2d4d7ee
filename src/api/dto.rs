//! Request bodies for the JSON API

use axum::extract::FromRequest;
use serde::Deserialize;

use crate::error::AppError;

/// `Json` extractor whose rejections answer with the usual error body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// POST /api/v1/friend_requests
#[derive(Debug, Deserialize)]
pub struct SendFriendRequest {
    #[serde(default)]
    pub username: String,
}

/// POST /api/v1/friend_requests/respond
#[derive(Debug, Deserialize)]
pub struct RespondFriendRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub action: String,
}

/// POST /api/v1/messages
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub recipient_id: String,
    #[serde(default)]
    pub body: String,
}

/// POST /verification/send_code
#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    #[serde(default)]
    pub email: String,
}

/// POST /verification/verify_code
#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub verification_id: i64,
    #[serde(default)]
    pub code: String,
}
