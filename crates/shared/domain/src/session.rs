//! Authenticated session entity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::user_id::UserId;

/// Opaque bearer token identifying a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidSessionId);
        }
        Ok(Self(value))
    }

    /// Fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SessionId::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Session bound to a user until `expires_at`.
///
/// Expiry has no grace period: a session is expired the instant the clock
/// passes `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session lasting `ttl_secs` from now.
    pub fn new(id: SessionId, user_id: UserId, ttl_secs: u64) -> Self {
        let created_at = Utc::now();
        let expires_at = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id,
            user_id,
            created_at,
            expires_at,
        }
    }

    pub fn reconstruct(
        id: SessionId,
        user_id: UserId,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            created_at,
            expires_at,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Time left before expiry, `None` once expired.
    pub fn remaining_ttl(&self) -> Option<std::time::Duration> {
        (self.expires_at - Utc::now()).to_std().ok().filter(|d| !d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new(1).unwrap()
    }

    #[test]
    fn test_session_id_rejects_blank() {
        assert_eq!(SessionId::new(""), Err(DomainError::InvalidSessionId));
        assert_eq!(SessionId::new("   "), Err(DomainError::InvalidSessionId));
        assert!(SessionId::new("abc").is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_new_session_expires_after_ttl() {
        let session = Session::new(SessionId::generate(), user(), 3600);
        let lifetime = session.expires_at() - session.created_at();

        assert_eq!(lifetime, Duration::seconds(3600));
        assert!(!session.is_expired());
        let remaining = session.remaining_ttl().unwrap();
        assert!(remaining.as_secs() > 3590 && remaining.as_secs() <= 3600);
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let now = Utc::now();
        let session = Session::reconstruct(
            SessionId::generate(),
            user(),
            now - Duration::hours(2),
            now - Duration::seconds(1),
        );
        assert!(session.is_expired());
        assert!(session.remaining_ttl().is_none());
    }

    #[test]
    fn test_zero_ttl_has_no_remaining_time() {
        let session = Session::new(SessionId::generate(), user(), 0);
        assert!(session.remaining_ttl().is_none());
    }
}
