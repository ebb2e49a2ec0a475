//! Username value object.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH};
use crate::error::{DomainError, DomainResult};

/// Trimmed display handle of bounded length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn new(value: &str) -> DomainResult<Self> {
        let trimmed = value.trim();
        let length = trimmed.chars().count();

        if length < MIN_USERNAME_LENGTH {
            return Err(DomainError::invalid_username(format!(
                "must be at least {} characters",
                MIN_USERNAME_LENGTH
            )));
        }
        if length > MAX_USERNAME_LENGTH {
            return Err(DomainError::invalid_username(format!(
                "must be at most {} characters",
                MAX_USERNAME_LENGTH
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Username::new(&value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_is_trimmed() {
        assert_eq!(Username::new("  alice ").unwrap().as_str(), "alice");
    }

    #[test]
    fn test_username_bounds() {
        assert!(Username::new("ab").is_err());
        assert!(Username::new("  ab  ").is_err());
        assert!(Username::new("abc").is_ok());
        assert!(Username::new(&"x".repeat(50)).is_ok());
        assert!(matches!(
            Username::new(&"x".repeat(51)),
            Err(DomainError::InvalidUsername(_))
        ));
    }
}
