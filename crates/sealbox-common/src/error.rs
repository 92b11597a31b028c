//! Error types for Sealbox
//!
//! This module defines the common error types used throughout the system.

use crate::types::NamespacePathError;
use thiserror::Error;

/// Common result type for Sealbox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for Sealbox
#[derive(Debug, Error)]
pub enum Error {
    // Caller input errors
    #[error("invalid namespace path: {0}")]
    InvalidPath(#[from] NamespacePathError),

    #[error("invalid custom metadata: {0}")]
    InvalidMetadata(String),

    // State precondition errors
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("parent namespace not found: {0}")]
    ParentNotFound(String),

    #[error("namespace has child namespaces: {0}")]
    HasChildren(String),

    #[error("operation not allowed on the root namespace")]
    RootForbidden,

    // Infrastructure errors
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("disk I/O error: {0}")]
    DiskIo(#[from] std::io::Error),

    // Internal errors
    #[error("store integrity violation: {0}")]
    Integrity(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid metadata error
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Create a storage unavailable error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Create an integrity error
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Check if this is a retryable error
    ///
    /// Only infrastructure failures are retryable: operations leave no
    /// partial state behind when storage fails, so the caller may retry
    /// with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::DiskIo(_))
    }

    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NamespaceNotFound(_) | Self::ParentNotFound(_))
    }

    /// Get HTTP status code for the API layer
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidPath(_) | Self::InvalidMetadata(_) => 400,

            // 403 Forbidden
            Self::RootForbidden => 403,

            // 404 Not Found
            Self::NamespaceNotFound(_) | Self::ParentNotFound(_) => 404,

            // 409 Conflict
            Self::HasChildren(_) => 409,

            // 500 Internal Server Error
            Self::Integrity(_) | Self::Internal(_) | Self::Serialization(_) => 500,

            // 503 Service Unavailable
            Self::StorageUnavailable(_) | Self::DiskIo(_) => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(Error::StorageUnavailable("test".into()).is_retryable());
        assert!(!Error::NamespaceNotFound("team1/".into()).is_retryable());
        assert!(!Error::HasChildren("team1/".into()).is_retryable());
    }

    #[test]
    fn test_error_not_found() {
        assert!(Error::NamespaceNotFound("team1/".into()).is_not_found());
        assert!(Error::ParentNotFound("team1/".into()).is_not_found());
        assert!(!Error::RootForbidden.is_not_found());
    }

    #[test]
    fn test_error_http_status() {
        assert_eq!(Error::InvalidMetadata("test".into()).http_status_code(), 400);
        assert_eq!(Error::NamespaceNotFound("a/".into()).http_status_code(), 404);
        assert_eq!(Error::HasChildren("a/".into()).http_status_code(), 409);
        assert_eq!(Error::RootForbidden.http_status_code(), 403);
        assert_eq!(Error::Integrity("test".into()).http_status_code(), 500);
        assert_eq!(
            Error::StorageUnavailable("test".into()).http_status_code(),
            503
        );
    }
}
