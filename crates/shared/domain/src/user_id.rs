//! User identifier value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, DomainResult};

/// Numeric user identity. The zero value means "not yet assigned".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Wrap an assigned id.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidUserId`] for zero.
    pub fn new(value: u64) -> DomainResult<Self> {
        if value == 0 {
            return Err(DomainError::InvalidUserId);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for UserId {
    type Error = DomainError;

    /// Database columns are signed
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map_err(|_| DomainError::InvalidUserId)
            .and_then(UserId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_unassigned() {
        assert_eq!(UserId::new(0), Err(DomainError::InvalidUserId));
        assert!(!UserId::default().is_assigned());
    }

    #[test]
    fn test_equality_by_value() {
        assert_eq!(UserId::new(7).unwrap(), UserId::new(7).unwrap());
        assert_ne!(UserId::new(7).unwrap(), UserId::new(8).unwrap());
    }

    #[test]
    fn test_from_signed_column() {
        assert_eq!(UserId::try_from(42_i64).unwrap().value(), 42);
        assert!(UserId::try_from(-1_i64).is_err());
        assert!(UserId::try_from(0_i64).is_err());
    }
}
