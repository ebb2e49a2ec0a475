//! Email value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, DomainResult};

/// Normalized email address.
///
/// The stored value is always trimmed and lower-cased, so two inputs that
/// differ only by case or surrounding whitespace produce equal emails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Normalize and validate an email address.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidEmail`] unless the input contains exactly
    /// one `@` with a non-empty local part and a non-empty domain.
    pub fn new(value: &str) -> DomainResult<Self> {
        let normalized = value.trim().to_lowercase();

        let mut parts = normalized.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(normalized))
            }
            _ => Err(DomainError::InvalidEmail),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Part after the `@`
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map(|(_, domain)| domain).unwrap_or_default()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::new(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let email = Email::new("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
        assert_eq!(email.domain(), "example.com");
    }

    #[test]
    fn test_email_case_and_whitespace_are_same_identity() {
        assert_eq!(
            Email::new("BOB@x.com").unwrap(),
            Email::new(" bob@X.com\t").unwrap()
        );
    }

    #[test]
    fn test_email_renormalization_is_idempotent() {
        for raw in ["alice@x.com", " Mixed.Case@Host.Example ", "a@b"] {
            let once = Email::new(raw).unwrap();
            let twice = Email::new(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_email_rejects_malformed_input() {
        for raw in ["", "   ", "no-at-sign", "@x.com", "alice@", "a@b@c", "@"] {
            assert_eq!(Email::new(raw), Err(DomainError::InvalidEmail), "{raw:?}");
        }
    }

    #[test]
    fn test_email_deserialize_validates() {
        let ok: Email = serde_json::from_str("\"Carol@X.com\"").unwrap();
        assert_eq!(ok.as_str(), "carol@x.com");

        let bad: Result<Email, _> = serde_json::from_str("\"not-an-email\"");
        assert!(bad.is_err());
    }
}
