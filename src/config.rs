//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)
//!
//! The resulting `AppConfig` is built once at startup and injected through
//! `AppState`; nothing else reads paths or secrets on its own.

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Origins allowed by CORS; empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a writer waits for SQLite's lock before failing
    #[serde(default = "default_busy_timeout_seconds")]
    pub busy_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    8
}

fn default_busy_timeout_seconds() -> u64 {
    5
}

/// Token issuing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for HS256 tokens (32+ bytes)
    pub jwt_secret: String,
    /// Token lifetime in seconds (default: 86400 = 24h)
    pub token_ttl_seconds: i64,
    /// bcrypt cost factor for stored passwords
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
}

fn default_password_cost() -> u32 {
    12
}

/// Direct message limits
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesConfig {
    /// Maximum message body length in characters
    pub max_body_len: usize,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self { max_body_len: 4000 }
    }
}

/// Email verification code configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Number of characters in a generated code
    pub code_length: usize,
    /// Code lifetime in seconds
    pub code_ttl_seconds: i64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_length: 9,
            code_ttl_seconds: 900,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        format!("chatterbox={0},tower_http={0}", self.level.to_ascii_lowercase())
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (CHATTERBOX__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/chatterbox.db")?
            .set_default("database.max_connections", 8)?
            .set_default("database.busy_timeout_seconds", 5)?
            .set_default("auth.token_ttl_seconds", 86400)?
            .set_default("auth.password_cost", 12)?
            .set_default("messages.max_body_len", 4000)?
            .set_default("verification.code_length", 9)?
            .set_default("verification.code_ttl_seconds", 900)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("CHATTERBOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        const MIN_JWT_SECRET_BYTES: usize = 32;

        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes"
            )));
        }

        if self.auth.token_ttl_seconds <= 0 {
            return Err(AppError::Config(
                "auth.token_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        let cost_range = crate::auth::MIN_COST..=crate::auth::MAX_COST;
        if !cost_range.contains(&self.auth.password_cost) {
            return Err(AppError::Config(format!(
                "auth.password_cost must be between {} and {}",
                cost_range.start(),
                cost_range.end()
            )));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.verification.code_length < 4 {
            return Err(AppError::Config(
                "verification.code_length must be at least 4".to_string(),
            ));
        }

        if self.verification.code_ttl_seconds <= 0 {
            return Err(AppError::Config(
                "verification.code_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if self.messages.max_body_len == 0 {
            return Err(AppError::Config(
                "messages.max_body_len must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                allowed_origins: Vec::new(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/chatterbox-test.db"),
                max_connections: 4,
                busy_timeout_seconds: 5,
            },
            auth: AuthConfig {
                jwt_secret: "x".repeat(32),
                token_ttl_seconds: 86_400,
                password_cost: 12,
            },
            messages: MessagesConfig::default(),
            verification: VerificationConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn validate_rejects_short_jwt_secret() {
        let mut config = valid_config();
        config.auth.jwt_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("jwt secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.jwt_secret")
        ));
    }

    #[test]
    fn validate_rejects_non_positive_token_ttl() {
        let mut config = valid_config();
        config.auth.token_ttl_seconds = 0;

        let error = config.validate().expect_err("zero ttl must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("token_ttl_seconds")
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_password_cost() {
        for cost in [3, 32] {
            let mut config = valid_config();
            config.auth.password_cost = cost;

            let error = config.validate().expect_err("cost outside bcrypt range must fail");
            assert!(matches!(
                error,
                crate::error::AppError::Config(message)
                    if message.contains("auth.password_cost")
            ));
        }
    }

    #[test]
    fn logging_level_drives_the_default_filter() {
        let mut config = valid_config();
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.logging.default_directive(),
            "chatterbox=debug,tower_http=debug"
        );
        assert!(!config.logging.is_json());

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_tiny_verification_codes() {
        let mut config = valid_config();
        config.verification.code_length = 2;
        assert!(config.validate().is_err());
    }
}
