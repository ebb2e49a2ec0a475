//! In-memory repositories.
//!
//! They honour the same contracts as the Postgres and Redis stores,
//! including email uniqueness and expiry filtering, and back both the
//! test suite and `serve --ephemeral`.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{
    EmailVerificationRepository, PasswordResetRepository, SessionRepository, UserRepository,
};
use crate::events::EventBus;
use common::{AppError, AppResult};
use domain::{Email, EmailVerification, PasswordReset, Session, SessionId, User, UserId};

// =============================================================================
// Users
// =============================================================================

#[derive(Default)]
struct UserTable {
    rows: HashMap<UserId, User>,
    sequence: u64,
}

pub struct InMemoryUserStore {
    table: RwLock<UserTable>,
    events: Arc<dyn EventBus>,
}

impl InMemoryUserStore {
    pub fn new(events: Arc<dyn EventBus>) -> Self {
        Self {
            table: RwLock::new(UserTable::default()),
            events,
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserStore {
    async fn next_id(&self) -> AppResult<UserId> {
        let mut table = self.table.write().await;
        table.sequence += 1;
        Ok(UserId::new(table.sequence)?)
    }

    async fn save(&self, user: &mut User) -> AppResult<()> {
        {
            let mut table = self.table.write().await;
            let taken = table
                .rows
                .values()
                .any(|other| other.id() != user.id() && other.email() == user.email());
            if taken {
                return Err(AppError::conflict("Email"));
            }

            let mut stored = user.clone();
            stored.take_events();
            table.rows.insert(user.id(), stored);
        }

        for event in user.take_events() {
            self.events.publish(&event).await;
        }
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .values()
            .find(|user| user.email() == email)
            .cloned())
    }

    async fn find_all(&self, limit: u64, offset: u64) -> AppResult<(Vec<User>, u64)> {
        let table = self.table.read().await;

        let mut users: Vec<&User> = table.rows.values().collect();
        users.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let page = users
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok((page, table.rows.len() as u64))
    }

    async fn delete(&self, id: UserId) -> AppResult<()> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Default)]
struct SessionTable {
    sessions: HashMap<SessionId, Session>,
    by_user: HashMap<UserId, HashSet<SessionId>>,
}

impl SessionTable {
    fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        if let Some(ids) = self.by_user.get_mut(&session.user_id()) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_user.remove(&session.user_id());
            }
        }
        Some(session)
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    table: RwLock<SessionTable>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored sessions, expired ones included
    pub async fn len(&self) -> usize {
        self.table.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn save(&self, session: &Session) -> AppResult<()> {
        if session.is_expired() {
            return Err(AppError::internal("session already expired"));
        }

        let mut table = self.table.write().await;
        table
            .by_user
            .entry(session.user_id())
            .or_default()
            .insert(session.id().clone());
        table.sessions.insert(session.id().clone(), session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<Session>> {
        let mut table = self.table.write().await;
        let Some(session) = table.sessions.get(id).cloned() else {
            return Ok(None);
        };

        if session.is_expired() {
            table.remove(id);
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn delete(&self, id: &SessionId) -> AppResult<()> {
        self.table.write().await.remove(id);
        Ok(())
    }

    async fn delete_expired(&self) -> AppResult<u64> {
        let mut table = self.table.write().await;
        let expired: Vec<SessionId> = table
            .sessions
            .values()
            .filter(|s| s.is_expired())
            .map(|s| s.id().clone())
            .collect();

        for id in &expired {
            table.remove(id);
        }
        Ok(expired.len() as u64)
    }

    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        let mut table = self.table.write().await;
        let ids = table.by_user.remove(&user_id).unwrap_or_default();
        for id in &ids {
            table.sessions.remove(id);
        }
        Ok(ids.len() as u64)
    }
}

// =============================================================================
// Verification tokens
// =============================================================================

#[derive(Default)]
pub struct InMemoryEmailVerificationStore {
    tokens: RwLock<HashMap<String, EmailVerification>>,
}

impl InMemoryEmailVerificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live tokens held by the user
    pub async fn count_for_user(&self, user_id: UserId) -> usize {
        self.tokens
            .read()
            .await
            .values()
            .filter(|t| t.user_id() == user_id && !t.is_expired())
            .count()
    }

    /// Every stored token, expired ones included
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EmailVerificationRepository for InMemoryEmailVerificationStore {
    async fn save(&self, verification: &EmailVerification) -> AppResult<()> {
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, t| !t.is_expired());
        tokens.insert(verification.token().to_string(), verification.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<EmailVerification>> {
        Ok(self
            .tokens
            .read()
            .await
            .get(token)
            .filter(|t| !t.is_expired())
            .cloned())
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        self.tokens.write().await.remove(token);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPasswordResetStore {
    tokens: RwLock<HashMap<String, PasswordReset>>,
}

impl InMemoryPasswordResetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live tokens held by the user
    pub async fn count_for_user(&self, user_id: UserId) -> usize {
        self.tokens
            .read()
            .await
            .values()
            .filter(|t| t.user_id() == user_id && !t.is_expired())
            .count()
    }

    /// Every stored token, expired ones included
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PasswordResetRepository for InMemoryPasswordResetStore {
    async fn save(&self, reset: &PasswordReset) -> AppResult<()> {
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, t| !t.is_expired());
        tokens.insert(reset.token().to_string(), reset.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<PasswordReset>> {
        Ok(self
            .tokens
            .read()
            .await
            .get(token)
            .filter(|t| !t.is_expired())
            .cloned())
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        self.tokens.write().await.remove(token);
        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.user_id() != user_id);
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::InProcessEventBus;
    use chrono::{Duration, Utc};
    use domain::Password;
    use once_cell::sync::Lazy;

    static PASSWORD: Lazy<Password> = Lazy::new(|| Password::new("password123").unwrap());

    fn store() -> InMemoryUserStore {
        InMemoryUserStore::new(Arc::new(InProcessEventBus::new()))
    }

    async fn register(store: &InMemoryUserStore, email: &str) -> User {
        let id = store.next_id().await.unwrap();
        let mut user = User::register(id, Email::new(email).unwrap(), PASSWORD.clone());
        store.save(&mut user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_ids_are_sequential_and_nonzero() {
        let store = store();
        assert_eq!(store.next_id().await.unwrap().value(), 1);
        assert_eq!(store.next_id().await.unwrap().value(), 2);
    }

    #[tokio::test]
    async fn test_save_drains_events_and_stores_clean_copy() {
        let store = store();
        let user = register(&store, "a@x.com").await;

        assert!(user.pending_events().is_empty());
        let stored = store.find_by_id(user.id()).await.unwrap().unwrap();
        assert!(stored.pending_events().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = store();
        register(&store, "a@x.com").await;

        let id = store.next_id().await.unwrap();
        let mut dup = User::register(id, Email::new("A@X.com").unwrap(), PASSWORD.clone());
        let err = store.save(&mut dup).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // Rejected save publishes nothing and keeps its events
        assert_eq!(dup.pending_events().len(), 1);
    }

    #[tokio::test]
    async fn test_find_all_pages_newest_first() {
        let store = store();
        for i in 0..5 {
            register(&store, &format!("u{i}@x.com")).await;
        }

        let (page, total) = store.find_all(2, 1).await.unwrap();
        assert_eq!(total, 5);
        let ids: Vec<u64> = page.iter().map(|u| u.id().value()).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let store = store();
        let err = store.delete(UserId::new(9).unwrap()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_session_store_rejects_expired_and_indexes_by_user() {
        let store = InMemorySessionStore::new();
        let alice = UserId::new(1).unwrap();
        let bob = UserId::new(2).unwrap();

        let now = Utc::now();
        let stale =
            Session::reconstruct(SessionId::generate(), alice, now, now - Duration::seconds(1));
        assert!(store.save(&stale).await.is_err());

        for _ in 0..3 {
            let session = Session::new(SessionId::generate(), alice, 60);
            store.save(&session).await.unwrap();
        }
        let bobs = Session::new(SessionId::generate(), bob, 60);
        store.save(&bobs).await.unwrap();

        assert_eq!(store.delete_by_user_id(alice).await.unwrap(), 3);
        assert_eq!(store.delete_by_user_id(alice).await.unwrap(), 0);
        assert!(store.find_by_id(bobs.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_password_reset_sweep_is_per_user() {
        let store = InMemoryPasswordResetStore::new();
        let alice = UserId::new(1).unwrap();
        let bob = UserId::new(2).unwrap();

        store.save(&PasswordReset::issue(alice, Duration::hours(1))).await.unwrap();
        store.save(&PasswordReset::issue(alice, Duration::hours(1))).await.unwrap();
        store.save(&PasswordReset::issue(bob, Duration::hours(1))).await.unwrap();

        assert_eq!(store.delete_by_user_id(alice).await.unwrap(), 2);
        assert_eq!(store.count_for_user(bob).await, 1);
    }

    #[tokio::test]
    async fn test_expired_tokens_are_not_found() {
        let store = InMemoryEmailVerificationStore::new();
        let token = EmailVerification::issue(UserId::new(1).unwrap(), Duration::seconds(-1));
        store.save(&token).await.unwrap();

        assert!(store.find_by_token(token.token()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saving_a_token_purges_expired_ones() {
        let user = UserId::new(1).unwrap();

        let verifications = InMemoryEmailVerificationStore::new();
        verifications
            .save(&EmailVerification::issue(user, Duration::seconds(-1)))
            .await
            .unwrap();
        verifications
            .save(&EmailVerification::issue(user, Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(verifications.len().await, 1);

        let resets = InMemoryPasswordResetStore::new();
        resets
            .save(&PasswordReset::issue(user, Duration::seconds(-1)))
            .await
            .unwrap();
        resets
            .save(&PasswordReset::issue(user, Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(resets.len().await, 1);
        assert_eq!(resets.count_for_user(user).await, 1);
    }
}
