//! Public user directory

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::AppState;
use crate::error::AppError;

/// GET /api/v1/users
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.users.list_users().await?;

    Ok(Json(serde_json::json!({
        "total": users.len(),
        "users": users,
    })))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.get_user(&id).await?;
    Ok(Json(user))
}
