//! # DomainError
//!
//! Centralized error handling for the portal.
//! Every adapter maps its infrastructure failures into one of these variants;
//! the web layer maps each variant to exactly one HTTP status.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Resource not found (e.g. Department, User, Document, Note)
    #[error("{resource} not found with ID {id}")]
    NotFound { resource: &'static str, id: i64 },

    /// Missing or malformed input (e.g. empty title, empty grant list)
    #[error("validation error: {0}")]
    Validation(String),

    /// Uniqueness violation (duplicate department name or user email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// A delete was refused because other rows still depend on the target
    #[error("{0}")]
    DependentRecordsExist(String),

    /// An administrator tried to delete their own account
    #[error("cannot delete your own account")]
    SelfDeletionForbidden,

    /// The caller is authenticated but may not see the requested item
    #[error("access denied")]
    AccessDenied,

    /// Unknown email or wrong password. The two are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("authentication required")]
    MissingToken,

    /// Bad signature, malformed token or expired token
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("administrator access required")]
    InsufficientRole,

    /// Infrastructure failure (e.g. database down, FTP timeout)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(resource: &'static str, id: i64) -> Self {
        Self::NotFound { resource, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A specialized Result type for portal logic.
pub type Result<T> = std::result::Result<T, DomainError>;
