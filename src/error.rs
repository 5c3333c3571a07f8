//! Error types for voicegate.

use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{key}': {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to read configuration: {0}")]
    ParseError(String),
}

/// Errors talking to the remote channel store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure: the store cannot be reached.
    #[error("channel store unreachable: {reason}")]
    Unavailable { reason: String },

    /// The store answered with something we could not interpret.
    #[error("channel store protocol error: {reason}")]
    Protocol { reason: String },

    /// The store is reachable but reports no booted virtual server.
    #[error("no booted virtual server on the channel store")]
    NoBootedServer,
}

/// Control-service startup errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("control service failed to start: {reason}")]
    StartupFailed { reason: String },
}

/// Failure reading the desired-channel attribute from the hosting world.
///
/// The sync agent cannot cheaply tell a vanished host entity from a transient
/// read error, so it treats every instance of this as the entity being gone.
#[derive(Debug, Error)]
#[error("attribute read failed: {reason}")]
pub struct AttributeError {
    pub reason: String,
}
