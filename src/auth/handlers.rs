//! Registration and token endpoints

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use super::CurrentUser;
use crate::AppState;
use crate::api::ApiJson;
use crate::error::AppError;
use crate::service::LoginId;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Either `user_id` or `username` identifies the account
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Create auth router
///
/// Routes:
/// - POST /auth/register
/// - POST /auth/login
/// - GET /auth/verify_token
/// - POST /auth/refresh_token
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify_token", get(verify_token))
        .route("/auth/refresh_token", post(refresh_token))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.register(&req.username, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "User registered successfully",
            "user_id": user.user_id,
            "username": user.username,
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let login = match (req.user_id, req.username) {
        (Some(user_id), _) => LoginId::ById(user_id),
        (None, Some(username)) => LoginId::ByUsername(username),
        (None, None) => {
            return Err(AppError::Validation(
                "user_id or username is required".to_string(),
            ));
        }
    };
    let issued = state.auth.login(&login, &req.password).await?;

    Ok(Json(issued))
}

async fn verify_token(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    Json(serde_json::json!({
        "valid": true,
        "user_id": identity.id,
        "username": identity.handle,
    }))
}

async fn refresh_token(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let issued = state.auth.refresh(&identity)?;
    Ok(Json(issued))
}
