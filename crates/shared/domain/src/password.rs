//! Password value object.
//!
//! Encapsulates Argon2 hashing so plaintext never leaves the constructor and
//! hashes are never compared against user input directly.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Hashed password.
///
/// Holds an Argon2 PHC string. The only way to test a candidate plaintext
/// is [`Password::matches`].
#[derive(Clone)]
pub struct Password {
    hash: String,
}

// Don't expose hash in debug output
impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plaintext password.
    ///
    /// # Errors
    /// Returns [`DomainError::PasswordTooShort`] if the plaintext has fewer
    /// than [`MIN_PASSWORD_LENGTH`] characters.
    pub fn new(plain_text: &str) -> DomainResult<Self> {
        if plain_text.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }

        let hash = Self::hash(plain_text)?;
        Ok(Self { hash })
    }

    /// Rebuild from a stored hash.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Hash string for storage.
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// Check a plaintext against this hash. Unparseable hashes never match.
    pub fn matches(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Self::argon2()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn hash(plain_text: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::argon2()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::PasswordHash(e.to_string()))?;
        Ok(hash.to_string())
    }

    #[inline]
    fn argon2() -> Argon2<'static> {
        Argon2::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_matches() {
        let plain = "SecurePassword123!";
        let password = Password::new(plain).unwrap();

        assert!(password.matches(plain));
        assert!(!password.matches("WrongPassword123"));
        assert!(!password.matches(""));
    }

    #[test]
    fn test_hash_never_equals_plaintext() {
        let plain = "password123";
        let password = Password::new(plain).unwrap();
        assert_ne!(password.as_str(), plain);
        assert!(password.as_str().starts_with("$argon2"));
    }

    #[test]
    fn test_password_from_hash() {
        let plain = "TestPassword123";
        let hash = Password::new(plain).unwrap().into_string();

        let restored = Password::from_hash(hash);
        assert!(restored.matches(plain));
    }

    #[test]
    fn test_same_password_different_salts() {
        let plain = "SamePassword123";
        let first = Password::new(plain).unwrap();
        let second = Password::new(plain).unwrap();

        assert_ne!(first.as_str(), second.as_str());
        assert!(first.matches(plain));
        assert!(second.matches(plain));
    }

    #[test]
    fn test_password_length_is_counted_in_characters() {
        assert_eq!(
            Password::new("short").unwrap_err(),
            DomainError::PasswordTooShort { min: 8 }
        );
        assert!(Password::new("12345678").is_ok());
        // Seven multi-byte characters are still too short
        assert!(Password::new("ééééééé").is_err());
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        let password = Password::from_hash("not-a-phc-string");
        assert!(!password.matches("not-a-phc-string"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let password = Password::new("password123").unwrap();
        let debug = format!("{password:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(password.as_str()));
    }
}
