//! Authentication service - login, session validation and logout.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use sea_orm::DbErr;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::repository::{SessionRepository, UserRepository};
use common::{AppError, AppResult};
use domain::{Email, Password, Session, SessionId, User, UserId};

/// Hash checked when the email is unknown so a miss costs the same as a
/// wrong password.
static TIMING_DUMMY: Lazy<Option<Password>> =
    Lazy::new(|| Password::new("timing-equalizer-password").ok());

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials and open a session.
    ///
    /// Unknown email, wrong password and deactivated account all fail with
    /// the same [`AppError::InvalidCredentials`].
    async fn login(&self, email: &str, password: &str) -> AppResult<(Session, User)>;

    /// Resolve a session token to its live session and owner.
    async fn validate_session(&self, token: &str) -> AppResult<(Session, User)>;

    /// End one session. Idempotent.
    async fn logout(&self, token: &str) -> AppResult<()>;

    /// End every session of a user
    async fn logout_all(&self, user_id: UserId) -> AppResult<u64>;

    /// Purge expired sessions from stores that keep them
    async fn prune_expired_sessions(&self) -> AppResult<u64>;
}

/// Concrete implementation of AuthService.
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    session_ttl_secs: u64,
    storage_timeout: Duration,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        session_ttl_secs: u64,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl_secs,
            storage_timeout,
        }
    }

    /// Await a storage lookup, giving up after the storage timeout.
    async fn bounded<T>(&self, lookup: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        tokio::time::timeout(self.storage_timeout, lookup)
            .await
            .unwrap_or_else(|_| Err(AppError::service_unavailable("storage timeout")))
    }
}

/// Timeouts, an unreachable cache or an exhausted connection pool.
fn storage_unavailable(err: &AppError) -> bool {
    matches!(
        err,
        AppError::ServiceUnavailable(_) | AppError::Database(DbErr::ConnectionAcquire(_))
    )
}

#[async_trait]
impl AuthService for Authenticator {
    async fn login(&self, email: &str, password: &str) -> AppResult<(Session, User)> {
        let user = match Email::new(email) {
            Ok(email) => self.users.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(user) = user else {
            if let Some(dummy) = TIMING_DUMMY.as_ref() {
                let _ = dummy.matches(password);
            }
            tracing::debug!("Login rejected: unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !user.authenticate(password) {
            tracing::info!(user_id = %user.id(), "Login rejected");
            return Err(AppError::InvalidCredentials);
        }

        let session = Session::new(SessionId::generate(), user.id(), self.session_ttl_secs);
        self.sessions.save(&session).await?;

        tracing::info!(user_id = %user.id(), "User logged in");
        Ok((session, user))
    }

    async fn validate_session(&self, token: &str) -> AppResult<(Session, User)> {
        let id = SessionId::new(token).map_err(|_| AppError::InvalidSession)?;

        let session = match self.bounded(self.sessions.find_by_id(&id)).await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(AppError::InvalidSession),
            Err(e) if storage_unavailable(&e) => {
                tracing::warn!(error = %e, "Session store unavailable");
                return Err(AppError::InvalidSession);
            }
            Err(e) => return Err(e),
        };

        if session.is_expired() {
            tracing::debug!(user_id = %session.user_id(), "Session expired");
            return Err(AppError::InvalidSession);
        }

        let owner = match self.bounded(self.users.find_by_id(session.user_id())).await {
            Ok(owner) => owner,
            Err(e) if storage_unavailable(&e) => {
                tracing::warn!(error = %e, "User store unavailable during session check");
                return Err(AppError::InvalidSession);
            }
            Err(e) => return Err(e),
        };

        match owner {
            Some(user) => Ok((session, user)),
            None => {
                tracing::warn!(user_id = %session.user_id(), "Session owner no longer exists");
                if let Err(e) = self.sessions.delete(&id).await {
                    tracing::warn!(error = %e, "Failed to drop orphaned session");
                }
                Err(AppError::InvalidSession)
            }
        }
    }

    async fn logout(&self, token: &str) -> AppResult<()> {
        let Ok(id) = SessionId::new(token) else {
            return Ok(());
        };

        if let Err(e) = self.sessions.delete(&id).await {
            tracing::warn!(error = %e, "Session delete failed during logout");
        }
        Ok(())
    }

    async fn logout_all(&self, user_id: UserId) -> AppResult<u64> {
        let removed = self.sessions.delete_by_user_id(user_id).await?;
        tracing::info!(user_id = %user_id, removed, "Logged out everywhere");
        Ok(removed)
    }

    async fn prune_expired_sessions(&self) -> AppResult<u64> {
        let removed = self.sessions.delete_expired().await?;
        tracing::info!(removed, "Expired sessions pruned");
        Ok(removed)
    }
}
