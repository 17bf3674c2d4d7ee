//! Friend request and friendship endpoints

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::AppState;
use crate::api::dto::{ApiJson, RespondFriendRequest, SendFriendRequest};
use crate::auth::CurrentUser;
use crate::error::AppError;

/// POST /api/v1/friend_requests
pub async fn send_friend_request(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiJson(req): ApiJson<SendFriendRequest>,
) -> Result<impl IntoResponse, AppError> {
    let sent = state
        .friendships
        .send_request(&caller, &req.username)
        .await?;

    Ok((StatusCode::CREATED, Json(sent)))
}

/// GET /api/v1/friend_requests
pub async fn list_friend_requests(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let listing = state.friendships.list_requests(&caller).await?;
    Ok(Json(listing))
}

/// POST /api/v1/friend_requests/respond
pub async fn respond_friend_request(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiJson(req): ApiJson<RespondFriendRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .friendships
        .respond(&caller, &req.username, &req.action)
        .await?;

    Ok(Json(outcome))
}

/// GET /api/v1/friends
pub async fn list_friends(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let listing = state.friendships.list_friends(&caller).await?;
    Ok(Json(listing))
}
