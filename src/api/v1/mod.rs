//! Versioned JSON API
//!
//! Mounted under `/api`. Friend, message and conversation routes require
//! a bearer token; the user directory is public.

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::AppState;

pub mod friends;
pub mod messages;
pub mod users;

/// Create v1 API router
pub fn api_v1_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/v1/users", get(users::list_users))
        .route("/v1/users/:id", get(users::get_user));

    // Authenticated through the `CurrentUser` extractor in each handler
    let authenticated_routes = Router::new()
        .route(
            "/v1/friend_requests",
            post(friends::send_friend_request).get(friends::list_friend_requests),
        )
        .route(
            "/v1/friend_requests/respond",
            post(friends::respond_friend_request),
        )
        .route("/v1/friends", get(friends::list_friends))
        .route(
            "/v1/messages",
            post(messages::send_message).get(messages::list_messages),
        )
        .route(
            "/v1/messages/:id",
            axum::routing::delete(messages::delete_message),
        )
        .route("/v1/messages/:id/read", put(messages::mark_message_read))
        .route(
            "/v1/conversations/:user_id",
            get(messages::get_conversation),
        );

    public_routes.merge(authenticated_routes)
}
