//! Error types for the record store abstraction

use std::fmt;
use thiserror::Error;

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`RecordCollection`](super::RecordCollection)
#[derive(Error, Debug)]
pub enum StoreError {
    /// The collection cannot evaluate the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Query execution failed
    #[error("Database error: {0}")]
    Database(String),

    /// Store unreachable
    #[error("Connection error: {0}")]
    Connection(String),

    /// A field held a value the aggregate or predicate cannot use
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Generic error wrapper
    #[error("Store error: {0}")]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Create an unsupported-operation error
    pub fn unsupported<E: fmt::Display>(what: E) -> Self {
        Self::Unsupported(what.to_string())
    }

    /// Create a database error
    pub fn database<E: fmt::Display>(err: E) -> Self {
        Self::Database(err.to_string())
    }

    /// Create a connection error
    pub fn connection<E: fmt::Display>(msg: E) -> Self {
        Self::Connection(msg.to_string())
    }

    /// Create a type mismatch error
    pub fn type_mismatch<E: fmt::Display>(msg: E) -> Self {
        Self::TypeMismatch(msg.to_string())
    }

    /// Check if the store rejected the operation rather than failing to run it
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}
