//! User service - registration, lookups and admin operations.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppError, AppResult, OptionExt};
use domain::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use domain::{Email, Password, User, UserId, UserRole};

use crate::repository::{SessionRepository, UserRepository};

/// One page of users plus the pagination actually applied.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Out-of-range limits fall back to the default page size; negative offsets
/// start from the beginning.
pub fn clamp_pagination(limit: i64, offset: i64) -> (u64, u64) {
    let limit = match u64::try_from(limit) {
        Ok(limit) if limit > 0 && limit <= MAX_PAGE_LIMIT => limit,
        _ => DEFAULT_PAGE_LIMIT,
    };
    (limit, u64::try_from(offset).unwrap_or(0))
}

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Register a new account. Fails with a conflict if the email is taken.
    async fn register_user(&self, email: &str, password: &str) -> AppResult<User>;

    async fn get_user(&self, id: UserId) -> AppResult<User>;

    async fn get_user_by_email(&self, email: &str) -> AppResult<User>;

    /// List users newest first. Invalid pagination is corrected, not rejected.
    async fn list_users(&self, limit: i64, offset: i64) -> AppResult<UserPage>;

    /// Replace the password. The new plaintext goes through registration rules.
    async fn change_password(&self, id: UserId, new_password: &str) -> AppResult<User>;

    async fn verify_email(&self, id: UserId) -> AppResult<User>;

    /// Change role (admin operation)
    async fn change_role(&self, id: UserId, role: &str) -> AppResult<User>;

    /// Activate or deactivate (admin operation)
    async fn set_active(&self, id: UserId, active: bool) -> AppResult<User>;

    /// Erase a user. Rejected before any lookup when `id == acting_user`.
    async fn delete_user(&self, id: UserId, acting_user: UserId) -> AppResult<()>;
}

/// Concrete implementation of UserService.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl UserManager {
    pub fn new(repo: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self { repo, sessions }
    }

    /// Load, mutate and persist in one step.
    async fn update<F>(&self, id: UserId, mutate: F) -> AppResult<User>
    where
        F: FnOnce(&mut User) -> AppResult<()> + Send,
    {
        let mut user = self.repo.find_by_id(id).await?.ok_or_not_found()?;
        mutate(&mut user)?;
        self.repo.save(&mut user).await?;
        Ok(user)
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn register_user(&self, email: &str, password: &str) -> AppResult<User> {
        let email = Email::new(email)?;
        let password = Password::new(password)?;

        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email"));
        }

        let id = self.repo.next_id().await?;
        let mut user = User::register(id, email, password);
        self.repo.save(&mut user).await?;

        tracing::info!(user_id = %user.id(), "User registered");
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> AppResult<User> {
        self.repo.find_by_id(id).await?.ok_or_not_found()
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<User> {
        let email = Email::new(email)?;
        self.repo.find_by_email(&email).await?.ok_or_not_found()
    }

    async fn list_users(&self, limit: i64, offset: i64) -> AppResult<UserPage> {
        let (limit, offset) = clamp_pagination(limit, offset);
        let (users, total) = self.repo.find_all(limit, offset).await?;
        Ok(UserPage {
            users,
            total,
            limit,
            offset,
        })
    }

    async fn change_password(&self, id: UserId, new_password: &str) -> AppResult<User> {
        let password = Password::new(new_password)?;
        let user = self
            .update(id, |user| {
                user.change_password(password);
                Ok(())
            })
            .await?;

        tracing::info!(user_id = %id, "Password changed");
        Ok(user)
    }

    async fn verify_email(&self, id: UserId) -> AppResult<User> {
        self.update(id, |user| {
            user.verify_email();
            Ok(())
        })
        .await
    }

    async fn change_role(&self, id: UserId, role: &str) -> AppResult<User> {
        let role: UserRole = role.parse()?;
        let user = self
            .update(id, |user| {
                user.change_role(role);
                Ok(())
            })
            .await?;

        tracing::info!(user_id = %id, role = %role, "Role updated");
        Ok(user)
    }

    async fn set_active(&self, id: UserId, active: bool) -> AppResult<User> {
        let user = self
            .update(id, |user| {
                if active {
                    user.activate();
                } else {
                    user.deactivate();
                }
                Ok(())
            })
            .await?;

        if !active {
            if let Err(e) = self.sessions.delete_by_user_id(id).await {
                tracing::warn!(user_id = %id, error = %e, "Failed to revoke sessions of deactivated user");
            }
        }
        Ok(user)
    }

    async fn delete_user(&self, id: UserId, acting_user: UserId) -> AppResult<()> {
        if id == acting_user {
            return Err(AppError::CannotDeleteSelf);
        }

        self.repo.delete(id).await?;

        if let Err(e) = self.sessions.delete_by_user_id(id).await {
            tracing::warn!(user_id = %id, error = %e, "Failed to revoke sessions of deleted user");
        }
        tracing::info!(user_id = %id, acting_user = %acting_user, "User deleted");
        Ok(())
    }
}
