//! Email verification endpoints

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};

use crate::AppState;
use crate::api::dto::{ApiJson, SendCodeRequest, VerifyCodeRequest};
use crate::error::AppError;

/// Routes: `POST /verification/send_code`, `POST /verification/verify_code`.
pub fn verification_router() -> Router<AppState> {
    Router::new()
        .route("/verification/send_code", post(send_code))
        .route("/verification/verify_code", post(verify_code))
}

async fn send_code(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let issued = state.verification.send_code(&req.email).await?;

    Ok(Json(serde_json::json!({
        "message": "Verification code sent",
        "verification_id": issued.verification_id,
        "email": issued.email,
        "expires_at": issued.expires_at,
    })))
}

async fn verify_code(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let verified = state
        .verification
        .verify_code(req.verification_id, &req.code)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Email verified",
        "verified": true,
        "verification_id": verified.verification_id,
        "email": verified.email,
        "verified_at": verified.verified_at,
    })))
}
