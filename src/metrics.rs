//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Friendship Metrics
    pub static ref FRIEND_REQUEST_ACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chatterbox_friend_request_actions_total", "Friend request actions by outcome"),
        &["action", "outcome"]
    ).expect("metric can be created");

    // Messaging Metrics
    pub static ref MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "chatterbox_messages_sent_total",
        "Total number of direct messages sent"
    ).expect("metric can be created");

    // Account Metrics
    pub static ref REGISTRATIONS_TOTAL: IntCounter = IntCounter::new(
        "chatterbox_registrations_total",
        "Total number of registered users"
    ).expect("metric can be created");
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chatterbox_logins_total", "Login attempts by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref VERIFICATION_CODES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chatterbox_verification_codes_total", "Verification code events"),
        &["event"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_TRANSACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chatterbox_db_transactions_total", "Immediate transactions by outcome"),
        &["outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("chatterbox_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(FRIEND_REQUEST_ACTIONS_TOTAL.clone()))
        .expect("FRIEND_REQUEST_ACTIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MESSAGES_SENT_TOTAL.clone()))
        .expect("MESSAGES_SENT_TOTAL can be registered");
    REGISTRY
        .register(Box::new(REGISTRATIONS_TOTAL.clone()))
        .expect("REGISTRATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(LOGINS_TOTAL.clone()))
        .expect("LOGINS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(VERIFICATION_CODES_TOTAL.clone()))
        .expect("VERIFICATION_CODES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(DB_TRANSACTIONS_TOTAL.clone()))
        .expect("DB_TRANSACTIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Record the outcome of a friend request action.
pub fn observe_friend_request(action: &str, outcome: &str) {
    FRIEND_REQUEST_ACTIONS_TOTAL
        .with_label_values(&[action, outcome])
        .inc();
}
