//! Error types for the Tollgate service.
//!
//! A client running out of quota is not an error: the limiter reports it as
//! a rejected [`Decision`](crate::ratelimit::Decision) and the HTTP layer
//! turns that into a 429 response.

use thiserror::Error;

/// Main error type for Tollgate operations.
#[derive(Error, Debug)]
pub enum TollgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A policy name that is neither `strict` nor `general`
    #[error("Unknown rate limit policy: {0}")]
    InvalidPolicy(String),

    /// Errors raised while layering configuration sources
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    /// gRPC server errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tollgate operations.
pub type Result<T> = std::result::Result<T, TollgateError>;
