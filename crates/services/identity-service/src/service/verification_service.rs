//! Verification service - email verification and password reset tokens.
//!
//! Both flows follow `issued -> consumed | expired`. Failures on the consuming
//! side are always the generic [`AppError::InvalidToken`].

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

use common::{AppError, AppResult, OptionExt, VerificationConfig};
use domain::{Email, EmailVerification, Password, PasswordReset, UserId};

use super::delivery::TokenDelivery;
use crate::repository::{EmailVerificationRepository, PasswordResetRepository, UserRepository};

/// Verification service trait for dependency injection.
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Mint and deliver an email verification token.
    ///
    /// Fails with [`AppError::AlreadyVerified`] if there is nothing to verify.
    async fn request_email_verification(&self, user_id: UserId) -> AppResult<()>;

    /// Consume an email verification token
    async fn verify_email(&self, token: &str) -> AppResult<()>;

    /// Start a password reset.
    ///
    /// Always succeeds for unknown, malformed or inactive addresses so the
    /// response never reveals whether an account exists.
    async fn request_password_reset(&self, email: &str) -> AppResult<()>;

    /// Consume a reset token and set a new password
    async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()>;
}

fn ttl_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| Duration::days(365 * 100))
}

/// Concrete implementation of VerificationService.
pub struct VerificationManager {
    users: Arc<dyn UserRepository>,
    email_verifications: Arc<dyn EmailVerificationRepository>,
    password_resets: Arc<dyn PasswordResetRepository>,
    delivery: Arc<dyn TokenDelivery>,
    email_verification_ttl: Duration,
    password_reset_ttl: Duration,
}

impl VerificationManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        email_verifications: Arc<dyn EmailVerificationRepository>,
        password_resets: Arc<dyn PasswordResetRepository>,
        delivery: Arc<dyn TokenDelivery>,
        config: &VerificationConfig,
    ) -> Self {
        Self {
            users,
            email_verifications,
            password_resets,
            delivery,
            email_verification_ttl: ttl_from_secs(config.email_verification_ttl_secs),
            password_reset_ttl: ttl_from_secs(config.password_reset_ttl_secs),
        }
    }
}

#[async_trait]
impl VerificationService for VerificationManager {
    async fn request_email_verification(&self, user_id: UserId) -> AppResult<()> {
        let user = self.users.find_by_id(user_id).await?.ok_or_not_found()?;
        if user.is_email_verified() {
            return Err(AppError::AlreadyVerified);
        }

        let verification = EmailVerification::issue(user.id(), self.email_verification_ttl);
        self.email_verifications.save(&verification).await?;

        if let Err(e) = self
            .delivery
            .send_email_verification(user.email(), verification.token())
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Email verification delivery failed");
        }
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> AppResult<()> {
        let verification = self
            .email_verifications
            .find_by_token(token)
            .await?
            .filter(|v| !v.is_expired())
            .ok_or(AppError::InvalidToken)?;

        let Some(mut user) = self.users.find_by_id(verification.user_id()).await? else {
            tracing::warn!(user_id = %verification.user_id(), "Verification token owner no longer exists");
            return Err(AppError::InvalidToken);
        };

        user.verify_email();
        self.users.save(&mut user).await?;
        self.email_verifications.delete(token).await?;

        tracing::info!(user_id = %user.id(), "Email verified");
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Ok(email) = Email::new(email) else {
            tracing::debug!("Password reset requested for malformed address");
            return Ok(());
        };

        let user = match self.users.find_by_email(&email).await? {
            Some(user) if user.is_active() => user,
            Some(user) => {
                tracing::info!(user_id = %user.id(), "Password reset requested for inactive account");
                return Ok(());
            }
            None => {
                tracing::debug!("Password reset requested for unknown address");
                return Ok(());
            }
        };

        self.password_resets.delete_by_user_id(user.id()).await?;
        let reset = PasswordReset::issue(user.id(), self.password_reset_ttl);
        self.password_resets.save(&reset).await?;

        if let Err(e) = self
            .delivery
            .send_password_reset(user.email(), reset.token())
            .await
        {
            tracing::warn!(user_id = %user.id(), error = %e, "Password reset delivery failed");
        }
        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        let reset = self
            .password_resets
            .find_by_token(token)
            .await?
            .filter(|r| !r.is_expired())
            .ok_or(AppError::InvalidToken)?;

        let password = Password::new(new_password)?;

        let Some(mut user) = self.users.find_by_id(reset.user_id()).await? else {
            return Err(AppError::InvalidToken);
        };

        user.change_password(password);
        self.users.save(&mut user).await?;

        self.password_resets.delete(token).await?;
        let swept = self.password_resets.delete_by_user_id(user.id()).await?;

        tracing::info!(user_id = %user.id(), swept, "Password reset completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::InProcessEventBus;
    use crate::repository::{
        InMemoryEmailVerificationStore, InMemoryPasswordResetStore, InMemoryUserStore,
        MockEmailVerificationRepository, MockPasswordResetRepository, MockUserRepository,
    };
    use chrono::Utc;
    use crate::service::delivery::MockTokenDelivery;
    use domain::User;
    use std::sync::Mutex;

    struct Fixture {
        users: Arc<InMemoryUserStore>,
        verifications: Arc<InMemoryEmailVerificationStore>,
        resets: Arc<InMemoryPasswordResetStore>,
        sent: Arc<Mutex<Vec<String>>>,
        service: VerificationManager,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserStore::new(Arc::new(InProcessEventBus::new())));
        let verifications = Arc::new(InMemoryEmailVerificationStore::new());
        let resets = Arc::new(InMemoryPasswordResetStore::new());
        let sent = Arc::new(Mutex::new(Vec::new()));

        let mut delivery = MockTokenDelivery::new();
        let sink = sent.clone();
        delivery
            .expect_send_email_verification()
            .returning(move |_, token| {
                sink.lock().unwrap().push(token.to_string());
                Ok(())
            });
        let sink = sent.clone();
        delivery.expect_send_password_reset().returning(move |_, token| {
            sink.lock().unwrap().push(token.to_string());
            Ok(())
        });

        let service = VerificationManager::new(
            users.clone(),
            verifications.clone(),
            resets.clone(),
            Arc::new(delivery),
            &VerificationConfig::default(),
        );
        Fixture {
            users,
            verifications,
            resets,
            sent,
            service,
        }
    }

    impl Fixture {
        async fn register(&self, email: &str) -> User {
            let id = self.users.next_id().await.unwrap();
            let mut user = User::register(
                id,
                Email::new(email).unwrap(),
                Password::new("password123").unwrap(),
            );
            self.users.save(&mut user).await.unwrap();
            user
        }

        fn last_token(&self) -> String {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[tokio::test]
    async fn test_email_verification_flow() {
        let f = fixture();
        let alice = f.register("alice@x.com").await;

        f.service.request_email_verification(alice.id()).await.unwrap();
        f.service.request_email_verification(alice.id()).await.unwrap();
        assert_eq!(f.verifications.count_for_user(alice.id()).await, 2);

        let token = f.last_token();
        f.service.verify_email(&token).await.unwrap();
        assert!(f.users.find_by_id(alice.id()).await.unwrap().unwrap().is_email_verified());

        let reused = f.service.verify_email(&token).await;
        assert!(matches!(reused, Err(AppError::InvalidToken)));

        let again = f.service.request_email_verification(alice.id()).await;
        assert!(matches!(again, Err(AppError::AlreadyVerified)));
    }

    #[tokio::test]
    async fn test_verify_email_unknown_token_is_generic() {
        let f = fixture();
        let err = f.service.verify_email("does-not-exist").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
        assert_eq!(err.user_message(), "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_verify_email_for_deleted_user_is_invalid_token() {
        let f = fixture();
        let bob = f.register("bob@x.com").await;
        f.service.request_email_verification(bob.id()).await.unwrap();
        f.users.delete(bob.id()).await.unwrap();

        let err = f.service.verify_email(&f.last_token()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn test_password_reset_for_unknown_email_issues_nothing() {
        let f = fixture();
        f.service.request_password_reset("ghost@x.com").await.unwrap();
        f.service.request_password_reset("not-an-email").await.unwrap();

        assert!(f.resets.is_empty().await);
        assert!(f.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_password_reset_for_inactive_user_issues_nothing() {
        let f = fixture();
        let mut carol = f.register("carol@x.com").await;
        carol.deactivate();
        f.users.save(&mut carol).await.unwrap();

        f.service.request_password_reset("carol@x.com").await.unwrap();
        assert!(f.resets.is_empty().await);
    }

    #[tokio::test]
    async fn test_second_reset_invalidates_first() {
        let f = fixture();
        let alice = f.register("alice@x.com").await;

        f.service.request_password_reset("alice@x.com").await.unwrap();
        let first = f.last_token();
        f.service.request_password_reset(" ALICE@x.com").await.unwrap();
        let second = f.last_token();
        assert_ne!(first, second);
        assert_eq!(f.resets.count_for_user(alice.id()).await, 1);

        let err = f.service.reset_password(&first, "new-password-1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));

        f.service.reset_password(&second, "new-password-2").await.unwrap();
        let alice = f.users.find_by_id(alice.id()).await.unwrap().unwrap();
        assert!(alice.authenticate("new-password-2"));
        assert!(!alice.authenticate("password123"));
        assert!(f.resets.is_empty().await);
    }

    #[tokio::test]
    async fn test_reset_password_validates_new_password() {
        let f = fixture();
        f.register("dave@x.com").await;
        f.service.request_password_reset("dave@x.com").await.unwrap();
        let token = f.last_token();

        let err = f.service.reset_password(&token, "short").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // token survives a rejected password
        f.service.reset_password(&token, "long-enough").await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_fail_request() {
        let users = Arc::new(InMemoryUserStore::new(Arc::new(InProcessEventBus::new())));
        let resets = Arc::new(InMemoryPasswordResetStore::new());
        let mut delivery = MockTokenDelivery::new();
        delivery
            .expect_send_password_reset()
            .times(1)
            .returning(|_, _| Err(AppError::service_unavailable("smtp")));

        let service = VerificationManager::new(
            users.clone(),
            Arc::new(InMemoryEmailVerificationStore::new()),
            resets.clone(),
            Arc::new(delivery),
            &VerificationConfig::default(),
        );

        let mut erin = User::register(
            users.next_id().await.unwrap(),
            Email::new("erin@x.com").unwrap(),
            Password::new("password123").unwrap(),
        );
        users.save(&mut erin).await.unwrap();

        service.request_password_reset("erin@x.com").await.unwrap();
        assert_eq!(resets.len().await, 1);
    }

    #[tokio::test]
    async fn test_request_password_reset_propagates_storage_errors() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Err(AppError::internal("connection refused")));

        let service = VerificationManager::new(
            Arc::new(users),
            Arc::new(InMemoryEmailVerificationStore::new()),
            Arc::new(InMemoryPasswordResetStore::new()),
            Arc::new(MockTokenDelivery::new()),
            &VerificationConfig::default(),
        );

        let result = service.request_password_reset("alice@x.com").await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    fn lapsed_window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::hours(2), now - Duration::seconds(1))
    }

    #[tokio::test]
    async fn test_verify_email_rejects_expired_token_from_store() {
        let mut verifications = MockEmailVerificationRepository::new();
        verifications.expect_find_by_token().returning(|token| {
            let (created_at, expires_at) = lapsed_window();
            Ok(Some(EmailVerification::reconstruct(
                token.to_string(),
                UserId::new(1).unwrap(),
                created_at,
                expires_at,
            )))
        });
        verifications.expect_delete().never();
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();
        users.expect_save().never();

        let service = VerificationManager::new(
            Arc::new(users),
            Arc::new(verifications),
            Arc::new(InMemoryPasswordResetStore::new()),
            Arc::new(MockTokenDelivery::new()),
            &VerificationConfig::default(),
        );

        let result = service.verify_email("lapsed").await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_reset_password_rejects_expired_token_from_store() {
        let mut resets = MockPasswordResetRepository::new();
        resets.expect_find_by_token().returning(|token| {
            let (created_at, expires_at) = lapsed_window();
            Ok(Some(PasswordReset::reconstruct(
                token.to_string(),
                UserId::new(1).unwrap(),
                created_at,
                expires_at,
            )))
        });
        resets.expect_delete().never();
        resets.expect_delete_by_user_id().never();
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();
        users.expect_save().never();

        let service = VerificationManager::new(
            Arc::new(users),
            Arc::new(InMemoryEmailVerificationStore::new()),
            Arc::new(resets),
            Arc::new(MockTokenDelivery::new()),
            &VerificationConfig::default(),
        );

        let result = service.reset_password("lapsed", "brand-new-secret").await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_ttl_from_secs() {
        assert_eq!(ttl_from_secs(3600), Duration::hours(1));
        assert!(ttl_from_secs(u64::MAX) > Duration::days(365));
    }
}
