//! User repository contract and its Postgres implementation.

use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, Statement,
};
use std::sync::Arc;

use super::corrupt_record;
use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::events::EventBus;
use common::{AppError, AppResult};
use domain::{Email, User, UserId};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Implementations enforce email uniqueness themselves and publish the
/// aggregate's pending events after a successful save.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Reserve the next user id
    async fn next_id(&self) -> AppResult<UserId>;

    /// Insert or update; a duplicate email fails with `Conflict`
    async fn save(&self, user: &mut User) -> AppResult<()>;

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>>;

    /// One page, newest first, plus the total count
    async fn find_all(&self, limit: u64, offset: u64) -> AppResult<(Vec<User>, u64)>;

    /// Erase the user; `NotFound` if absent
    async fn delete(&self, id: UserId) -> AppResult<()>;
}

/// Postgres-backed user repository
pub struct UserStore {
    db: DatabaseConnection,
    events: Arc<dyn EventBus>,
}

impl UserStore {
    pub fn new(db: DatabaseConnection, events: Arc<dyn EventBus>) -> Self {
        Self { db, events }
    }
}

fn to_user(model: user::Model) -> AppResult<User> {
    User::try_from(model).map_err(|e| corrupt_record("user", e))
}

#[async_trait]
impl UserRepository for UserStore {
    async fn next_id(&self) -> AppResult<UserId> {
        let row = self
            .db
            .query_one(Statement::from_string(
                DbBackend::Postgres,
                "SELECT nextval('users_id_seq') AS id",
            ))
            .await?
            .ok_or_else(|| AppError::internal("users_id_seq returned no row"))?;

        let id: i64 = row.try_get("", "id")?;
        UserId::try_from(id).map_err(|e| corrupt_record("user id", e))
    }

    async fn save(&self, user: &mut User) -> AppResult<()> {
        let model = ActiveModel::from(&*user);

        let result = UserEntity::insert(model)
            .on_conflict(
                OnConflict::column(user::Column::Id)
                    .update_columns([
                        user::Column::Email,
                        user::Column::PasswordHash,
                        user::Column::Role,
                        user::Column::EmailVerified,
                        user::Column::Active,
                        user::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await;

        if let Err(err) = result {
            return Err(match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict("Email"),
                _ => AppError::from(err),
            });
        }

        for event in user.take_events() {
            self.events.publish(&event).await;
        }

        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id.value() as i64)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        result.map(to_user).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        result.map(to_user).transpose()
    }

    async fn find_all(&self, limit: u64, offset: u64) -> AppResult<(Vec<User>, u64)> {
        let total = UserEntity::find().count(&self.db).await?;

        let models = UserEntity::find()
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        let users = models
            .into_iter()
            .map(to_user)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((users, total))
    }

    async fn delete(&self, id: UserId) -> AppResult<()> {
        let result = UserEntity::delete_by_id(id.value() as i64)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}
