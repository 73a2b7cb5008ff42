//! Error types and error handling

use thiserror::Error;

/// Top-level application error type
///
/// Domain modules define their own focused error enums
/// ([`crate::campaigns::SendError`], [`crate::email::AdapterError`],
/// [`crate::error::StoreError`]); this type exists for the binary boundary
/// and the HTTP layer.
#[derive(Debug, Error)]
pub enum MailwaveError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Campaign send error
    #[error("Send error: {0}")]
    Send(#[from] crate::campaigns::SendError),

    /// Not Found (404)
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Errors surfaced by the persistence collaborator
///
/// Repository traits return this type so that callers (and tests with
/// in-memory fakes) never depend on the concrete backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage backend rejected or failed the operation
    #[error("storage backend failure: {0}")]
    Backend(String),
}
