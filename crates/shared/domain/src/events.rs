//! Domain events emitted by the User aggregate.
//!
//! Events are collected on the aggregate while it is mutated and drained by
//! the repository once the new state has been persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::email::Email;
use crate::role::UserRole;
use crate::user_id::UserId;

pub const USER_REGISTERED: &str = "identity.user.registered";
pub const USER_EMAIL_VERIFIED: &str = "identity.user.email_verified";
pub const USER_PASSWORD_CHANGED: &str = "identity.user.password_changed";
pub const USER_ROLE_CHANGED: &str = "identity.user.role_changed";
pub const USER_DEACTIVATED: &str = "identity.user.deactivated";
pub const USER_ACTIVATED: &str = "identity.user.activated";

/// State change on a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UserEvent {
    Registered {
        user_id: UserId,
        email: Email,
        occurred_at: DateTime<Utc>,
    },
    EmailVerified {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    PasswordChanged {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    RoleChanged {
        user_id: UserId,
        old_role: UserRole,
        new_role: UserRole,
        occurred_at: DateTime<Utc>,
    },
    Deactivated {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    Activated {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
}

impl UserEvent {
    /// Stable routing name
    pub fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered { .. } => USER_REGISTERED,
            UserEvent::EmailVerified { .. } => USER_EMAIL_VERIFIED,
            UserEvent::PasswordChanged { .. } => USER_PASSWORD_CHANGED,
            UserEvent::RoleChanged { .. } => USER_ROLE_CHANGED,
            UserEvent::Deactivated { .. } => USER_DEACTIVATED,
            UserEvent::Activated { .. } => USER_ACTIVATED,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            UserEvent::Registered { user_id, .. }
            | UserEvent::EmailVerified { user_id, .. }
            | UserEvent::PasswordChanged { user_id, .. }
            | UserEvent::RoleChanged { user_id, .. }
            | UserEvent::Deactivated { user_id, .. }
            | UserEvent::Activated { user_id, .. } => *user_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Registered { occurred_at, .. }
            | UserEvent::EmailVerified { occurred_at, .. }
            | UserEvent::PasswordChanged { occurred_at, .. }
            | UserEvent::RoleChanged { occurred_at, .. }
            | UserEvent::Deactivated { occurred_at, .. }
            | UserEvent::Activated { occurred_at, .. } => *occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let user_id = UserId::new(3).unwrap();
        let now = Utc::now();
        let event = UserEvent::RoleChanged {
            user_id,
            old_role: UserRole::User,
            new_role: UserRole::Admin,
            occurred_at: now,
        };

        assert_eq!(event.event_type(), USER_ROLE_CHANGED);
        assert_eq!(event.user_id(), user_id);
        assert_eq!(event.occurred_at(), now);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = UserEvent::Deactivated {
            user_id: UserId::new(9).unwrap(),
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "deactivated");
        assert_eq!(json["user_id"], 9);
    }
}
