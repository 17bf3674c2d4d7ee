//! Chatterbox - user accounts, direct messages and friendships over HTTP
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /auth, /verification                                      │
//! │  - /api/v1 users, friend requests, friends, messages         │
//! │  - /health, /metrics                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Friendship workflow engine                                │
//! │  - Registration, tokens, messages, verification              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx), immediate transactions                     │
//! │  - Friend-request tracker, friendship ledger                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `auth`: Password hashing, bearer tokens, auth endpoints
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Largest accepted request body
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Registration and user directory
    pub users: Arc<service::UserService>,

    /// Login and token verification
    pub auth: Arc<service::AuthService>,

    /// Friend requests and friendships
    pub friendships: Arc<service::FriendshipService>,

    /// Direct messages
    pub messages: Arc<service::MessageService>,

    /// Email verification codes
    pub verification: Arc<service::VerificationService>,
}

impl AppState {
    /// Initialize application state with the logging mailer
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrated
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        Self::with_mailer(config, Arc::new(service::LogMailer)).await
    }

    /// Initialize application state with a specific mailer
    ///
    /// # Steps
    /// 1. Connect to SQLite database (runs migrations)
    /// 2. Build services on top of the shared pool
    pub async fn with_mailer(
        config: config::AppConfig,
        mailer: Arc<dyn service::Mailer>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let options = data::ConnectOptions {
            max_connections: config.database.max_connections,
            busy_timeout: std::time::Duration::from_secs(config.database.busy_timeout_seconds),
        };
        let db = Arc::new(data::Database::connect_with(&config.database.path, options).await?);
        tracing::info!("Database connected");

        let users = Arc::new(service::UserService::new(
            db.clone(),
            config.auth.password_cost,
        ));
        let auth = Arc::new(service::AuthService::new(db.clone(), config.auth.clone()));
        let friendships = Arc::new(service::FriendshipService::new(db.clone()));
        let messages = Arc::new(service::MessageService::new(
            db.clone(),
            config.messages.max_body_len,
        ));
        let verification = Arc::new(service::VerificationService::new(
            db.clone(),
            mailer,
            config.verification.clone(),
        ));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            users,
            auth,
            friendships,
            messages,
            verification,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .merge(api::system_router())
        .merge(auth::auth_router())
        .merge(api::verification_router())
        .nest("/api", api::api_v1_router())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if server.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
