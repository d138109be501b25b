//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("finsta_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "finsta_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Social graph and messaging
    pub static ref FOLLOW_TOGGLES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("finsta_follow_toggles_total", "Follow graph mutations"),
        &["result"]
    ).expect("metric can be created");
    pub static ref LIKE_TOGGLES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("finsta_like_toggles_total", "Like set mutations"),
        &["result"]
    ).expect("metric can be created");
    pub static ref MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "finsta_messages_sent_total",
        "Total number of direct messages sent"
    ).expect("metric can be created");
    pub static ref MESSAGES_MARKED_READ_TOTAL: IntCounter = IntCounter::new(
        "finsta_messages_marked_read_total",
        "Total number of messages flipped to read by thread views"
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref MEDIA_UPLOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("finsta_media_uploads_total", "Total number of media uploads"),
        &["status"]
    ).expect("metric can be created");
    pub static ref MEDIA_DELETES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("finsta_media_deletes_total", "Total number of media deletions"),
        &["status"]
    ).expect("metric can be created");

    // Account Metrics
    pub static ref SIGNUPS_TOTAL: IntCounter = IntCounter::new(
        "finsta_signups_total",
        "Total number of identities created"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("finsta_errors_total", "Total number of errors returned to clients"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Must be called once per process; registering twice panics.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(FOLLOW_TOGGLES_TOTAL.clone()))
        .expect("FOLLOW_TOGGLES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(LIKE_TOGGLES_TOTAL.clone()))
        .expect("LIKE_TOGGLES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MESSAGES_SENT_TOTAL.clone()))
        .expect("MESSAGES_SENT_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MESSAGES_MARKED_READ_TOTAL.clone()))
        .expect("MESSAGES_MARKED_READ_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MEDIA_UPLOADS_TOTAL.clone()))
        .expect("MEDIA_UPLOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MEDIA_DELETES_TOTAL.clone()))
        .expect("MEDIA_DELETES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SIGNUPS_TOTAL.clone()))
        .expect("SIGNUPS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
