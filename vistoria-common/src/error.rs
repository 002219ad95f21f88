//! Common error types for the Vistoria backend

use thiserror::Error;

/// Common result type for Vistoria operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the lifecycle and sync services.
///
/// `Validation`, `Permission` and `State` are deliberately distinct variants
/// so API clients can branch on them (a permission failure must not look like
/// a malformed payload).
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Referenced inspection/item/checklist does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing required field, malformed payload, unknown referenced ids
    #[error("Validation error: {0}")]
    Validation(String),

    /// Role attempted a mutation outside its allowed window
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Operation invalid for the inspection's current status
    #[error("Invalid state: {0}")]
    State(String),

    /// Evidence gateway (image hosting) failure
    #[error("Upstream dependency error: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
