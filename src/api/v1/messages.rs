//! Direct message endpoints

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::api::dto::{ApiJson, SendMessageRequest};
use crate::auth::CurrentUser;
use crate::error::AppError;

/// POST /api/v1/messages
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = state
        .messages
        .send(&caller, &req.recipient_id, &req.body)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/messages
pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let messages = state.messages.list(&caller).await?;

    Ok(Json(serde_json::json!({
        "total": messages.len(),
        "messages": messages,
    })))
}

/// GET /api/v1/conversations/:user_id
pub async fn get_conversation(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let messages = state.messages.conversation(&caller, &user_id).await?;

    Ok(Json(serde_json::json!({
        "with_user_id": user_id,
        "total": messages.len(),
        "messages": messages,
    })))
}

/// PUT /api/v1/messages/:id/read
pub async fn mark_message_read(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.messages.mark_read(&caller, id).await?;

    Ok(Json(serde_json::json!({
        "message_id": id,
        "is_read": true,
    })))
}

/// DELETE /api/v1/messages/:id
pub async fn delete_message(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.messages.delete(&caller, id).await?;

    Ok(Json(serde_json::json!({
        "message_id": id,
        "deleted": true,
    })))
}
