//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;

use domain::{DomainError, Email, Password, User, UserId, UserRole};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub email_verified: bool,
    pub active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Rebuild the aggregate from a row. Rows that no longer satisfy the
/// value-object rules are reported rather than silently repaired.
impl TryFrom<Model> for User {
    type Error = DomainError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(User::reconstruct(
            UserId::try_from(model.id)?,
            Email::new(&model.email)?,
            Password::from_hash(model.password_hash),
            model.role.parse::<UserRole>()?,
            model.email_verified,
            model.active,
            model.created_at,
            model.updated_at,
        ))
    }
}

/// Full-row active model used for upserts
impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        use sea_orm::ActiveValue::Set;

        Self {
            id: Set(user.id().value() as i64),
            email: Set(user.email().as_str().to_string()),
            password_hash: Set(user.password().as_str().to_string()),
            role: Set(user.role().to_string()),
            email_verified: Set(user.is_email_verified()),
            active: Set(user.is_active()),
            created_at: Set(user.created_at()),
            updated_at: Set(user.updated_at()),
        }
    }
}
