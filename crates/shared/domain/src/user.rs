//! User aggregate root and its client-facing projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::email::Email;
use crate::events::UserEvent;
use crate::password::Password;
use crate::role::UserRole;
use crate::user_id::UserId;

/// User aggregate.
///
/// State is private; every mutation goes through a method that bumps
/// `updated_at` and records exactly one event on a real transition. Calls
/// that would leave the state unchanged are no-ops and record nothing.
///
/// Email uniqueness is not checked here; the repository enforces it.
#[derive(Debug, Clone)]
pub struct User {
    id: UserId,
    email: Email,
    password: Password,
    role: UserRole,
    email_verified: bool,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<UserEvent>,
}

impl User {
    /// Register a new active, unverified user with the default role.
    pub fn register(id: UserId, email: Email, password: Password) -> Self {
        let now = Utc::now();
        let mut user = Self {
            id,
            email: email.clone(),
            password,
            role: UserRole::User,
            email_verified: false,
            active: true,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        user.record(UserEvent::Registered {
            user_id: id,
            email,
            occurred_at: now,
        });
        user
    }

    /// Rebuild from persisted state. Records no events.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: UserId,
        email: Email,
        password: Password,
        role: UserRole,
        email_verified: bool,
        active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            password,
            role,
            email_verified,
            active,
            created_at,
            updated_at,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Check a plaintext password.
    ///
    /// Always false for inactive users, so a caller cannot tell a wrong
    /// password from a deactivated account through this method alone.
    pub fn authenticate(&self, plain_text: &str) -> bool {
        self.active && self.password.matches(plain_text)
    }

    pub fn verify_email(&mut self) {
        if self.email_verified {
            return;
        }
        self.email_verified = true;
        let now = self.touch();
        self.record(UserEvent::EmailVerified {
            user_id: self.id,
            occurred_at: now,
        });
    }

    /// Replace the password hash. The new plaintext was validated when
    /// `password` was built.
    pub fn change_password(&mut self, password: Password) {
        self.password = password;
        let now = self.touch();
        self.record(UserEvent::PasswordChanged {
            user_id: self.id,
            occurred_at: now,
        });
    }

    pub fn change_role(&mut self, role: UserRole) {
        if self.role == role {
            return;
        }
        let old_role = self.role;
        self.role = role;
        let now = self.touch();
        self.record(UserEvent::RoleChanged {
            user_id: self.id,
            old_role,
            new_role: role,
            occurred_at: now,
        });
    }

    pub fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        let now = self.touch();
        self.record(UserEvent::Activated {
            user_id: self.id,
            occurred_at: now,
        });
    }

    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let now = self.touch();
        self.record(UserEvent::Deactivated {
            user_id: self.id,
            occurred_at: now,
        });
    }

    /// Events recorded since the last drain
    pub fn pending_events(&self) -> &[UserEvent] {
        &self.events
    }

    /// Drain recorded events, leaving the aggregate with none pending
    pub fn take_events(&mut self) -> Vec<UserEvent> {
        std::mem::take(&mut self.events)
    }

    fn touch(&mut self) -> DateTime<Utc> {
        self.updated_at = Utc::now();
        self.updated_at
    }

    fn record(&mut self, event: UserEvent) {
        self.events.push(event);
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserResponse {
    /// Unique user identifier
    pub id: u64,
    /// Normalized email address
    pub email: String,
    /// User role
    pub role: UserRole,
    pub email_verified: bool,
    pub active: bool,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.value(),
            email: user.email.as_str().to_string(),
            role: user.role,
            email_verified: user.email_verified,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse::from(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    // Hashing is slow in debug builds; share one hash across tests
    static PASSWORD: Lazy<Password> = Lazy::new(|| Password::new("password123").unwrap());

    fn alice() -> User {
        let mut user = User::register(
            UserId::new(1).unwrap(),
            Email::new("alice@x.com").unwrap(),
            PASSWORD.clone(),
        );
        user.take_events();
        user
    }

    #[test]
    fn test_register_defaults_and_event() {
        let mut user = User::register(
            UserId::new(1).unwrap(),
            Email::new("Alice@X.com").unwrap(),
            PASSWORD.clone(),
        );

        assert_eq!(user.role(), UserRole::User);
        assert!(user.is_active());
        assert!(!user.is_email_verified());
        assert_eq!(user.email().as_str(), "alice@x.com");

        let events = user.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], UserEvent::Registered { .. }));
        assert!(user.pending_events().is_empty());
    }

    #[test]
    fn test_reconstruct_records_nothing() {
        let now = Utc::now();
        let user = User::reconstruct(
            UserId::new(5).unwrap(),
            Email::new("bob@x.com").unwrap(),
            PASSWORD.clone(),
            UserRole::Admin,
            true,
            false,
            now,
            now,
        );
        assert!(user.pending_events().is_empty());
        assert!(user.is_admin());
        assert!(!user.is_active());
    }

    #[test]
    fn test_authenticate_respects_active_flag() {
        let mut user = alice();
        assert!(user.authenticate("password123"));
        assert!(!user.authenticate("wrong-password"));

        user.deactivate();
        assert!(!user.authenticate("password123"));

        user.activate();
        assert!(user.authenticate("password123"));
    }

    #[test]
    fn test_verify_email_is_idempotent() {
        let mut user = alice();
        let before = user.updated_at();

        user.verify_email();
        assert!(user.is_email_verified());
        assert!(user.updated_at() >= before);
        assert_eq!(user.take_events().len(), 1);

        user.verify_email();
        assert!(user.take_events().is_empty());
    }

    #[test]
    fn test_change_role_only_emits_on_change() {
        let mut user = alice();

        user.change_role(UserRole::User);
        assert!(user.pending_events().is_empty());

        user.change_role(UserRole::Admin);
        user.change_role(UserRole::Admin);
        let events = user.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            UserEvent::RoleChanged {
                user_id: user.id(),
                old_role: UserRole::User,
                new_role: UserRole::Admin,
                occurred_at: events[0].occurred_at(),
            }
        );
    }

    #[test]
    fn test_change_password_always_emits() {
        let mut user = alice();
        let replacement = Password::new("another-secret").unwrap();

        user.change_password(replacement);

        assert!(user.authenticate("another-secret"));
        assert!(!user.authenticate("password123"));
        let events = user.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], UserEvent::PasswordChanged { .. }));
    }

    #[test]
    fn test_activation_toggles_emit_once_per_transition() {
        let mut user = alice();

        user.activate();
        assert!(user.pending_events().is_empty());

        user.deactivate();
        user.deactivate();
        user.activate();
        user.activate();

        let kinds: Vec<_> = user.take_events().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            kinds,
            vec![crate::events::USER_DEACTIVATED, crate::events::USER_ACTIVATED]
        );
    }

    #[test]
    fn test_response_hides_password() {
        let user = alice();
        let json = serde_json::to_string(&UserResponse::from(&user)).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains(user.password().as_str()));
        assert!(json.contains("\"role\":\"user\""));
    }
}
