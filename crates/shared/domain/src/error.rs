//! Domain-level errors.
//!
//! These errors represent rejected input for value objects and failures of
//! pure domain logic. They are independent of HTTP and storage concerns.

use thiserror::Error;

/// Domain-specific errors raised by value object constructors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Email is not of the form `local@domain`
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password shorter than the minimum length
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    /// Role outside the closed set of roles
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// User ids are positive
    #[error("Invalid user id")]
    InvalidUserId,

    /// Session ids are non-empty opaque strings
    #[error("Invalid session id")]
    InvalidSessionId,

    /// Username failed its length rule
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Hashing backend failed
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl DomainError {
    /// Create an invalid role error
    pub fn invalid_role(role: impl Into<String>) -> Self {
        DomainError::InvalidRole(role.into())
    }

    /// Create an invalid username error
    pub fn invalid_username(msg: impl Into<String>) -> Self {
        DomainError::InvalidUsername(msg.into())
    }

    /// Whether the error describes bad caller input rather than a backend fault
    pub fn is_validation(&self) -> bool {
        !matches!(self, DomainError::PasswordHash(_))
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
