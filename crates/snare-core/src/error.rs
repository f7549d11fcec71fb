//! Unified error types for snare

use std::time::Duration;

use thiserror::Error;

/// Unified error type for all snare operations
#[derive(Error, Debug)]
pub enum SnareError {
    // Transport errors
    #[error("CDP transport error: {0}")]
    Transport(String),

    #[error("CDP protocol error: {0}")]
    Protocol(String),

    #[error("CDP error {code}: {message}")]
    Cdp { code: i64, message: String },

    // Lifecycle errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("No inspector target found: {0}")]
    InspectorNotFound(String),

    // Trigger errors
    #[error("Trigger did not succeed after {attempts} attempts ({elapsed:?})")]
    TriggerTimeout { attempts: u32, elapsed: Duration },

    // Sniffer errors
    #[error("Sniffer configuration error: {0}")]
    SnifferConfig(String),

    #[error("Override failed: {0}")]
    OverrideFailed(String),

    #[error("Invalid remote script: {0}")]
    InvalidScript(String),

    // Capture errors
    #[error("Remote evaluation threw: {0}")]
    RemoteException(String),

    #[error("Captured result is empty: {0}")]
    EmptyResult(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using SnareError
pub type Result<T> = std::result::Result<T, SnareError>;
