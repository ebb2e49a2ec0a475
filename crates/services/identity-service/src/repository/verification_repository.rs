//! Verification token repositories (email verification, password reset).

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::corrupt_record;
use super::entities::{email_verification, password_reset};
use common::{AppError, AppResult};
use domain::{EmailVerification, PasswordReset, UserId};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Email verification tokens. A user may hold several at once.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EmailVerificationRepository: Send + Sync {
    async fn save(&self, verification: &EmailVerification) -> AppResult<()>;

    /// Expired tokens are treated as absent
    async fn find_by_token(&self, token: &str) -> AppResult<Option<EmailVerification>>;

    async fn delete(&self, token: &str) -> AppResult<()>;
}

/// Password reset tokens. Callers keep at most one live token per user by
/// sweeping with `delete_by_user_id` before issuing.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    async fn save(&self, reset: &PasswordReset) -> AppResult<()>;

    /// Expired tokens are treated as absent
    async fn find_by_token(&self, token: &str) -> AppResult<Option<PasswordReset>>;

    async fn delete(&self, token: &str) -> AppResult<()>;

    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64>;
}

// =============================================================================
// Email verification
// =============================================================================

pub struct SqlEmailVerificationStore {
    db: DatabaseConnection,
}

impl SqlEmailVerificationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EmailVerificationRepository for SqlEmailVerificationStore {
    async fn save(&self, verification: &EmailVerification) -> AppResult<()> {
        email_verification::ActiveModel {
            token: Set(verification.token().to_string()),
            user_id: Set(verification.user_id().value() as i64),
            created_at: Set(verification.created_at()),
            expires_at: Set(verification.expires_at()),
        }
        .insert(&self.db)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<EmailVerification>> {
        let model = email_verification::Entity::find_by_id(token.to_string())
            .filter(email_verification::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        model
            .map(|m| {
                EmailVerification::try_from(m)
                    .map_err(|e| corrupt_record("email verification", e))
            })
            .transpose()
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        email_verification::Entity::delete_by_id(token.to_string())
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}

// =============================================================================
// Password reset
// =============================================================================

pub struct SqlPasswordResetStore {
    db: DatabaseConnection,
}

impl SqlPasswordResetStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PasswordResetRepository for SqlPasswordResetStore {
    async fn save(&self, reset: &PasswordReset) -> AppResult<()> {
        password_reset::ActiveModel {
            token: Set(reset.token().to_string()),
            user_id: Set(reset.user_id().value() as i64),
            created_at: Set(reset.created_at()),
            expires_at: Set(reset.expires_at()),
        }
        .insert(&self.db)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<PasswordReset>> {
        let model = password_reset::Entity::find_by_id(token.to_string())
            .filter(password_reset::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        model
            .map(|m| PasswordReset::try_from(m).map_err(|e| corrupt_record("password reset", e)))
            .transpose()
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        password_reset::Entity::delete_by_id(token.to_string())
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: UserId) -> AppResult<u64> {
        let result = password_reset::Entity::delete_many()
            .filter(password_reset::Column::UserId.eq(user_id.value() as i64))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected)
    }
}
