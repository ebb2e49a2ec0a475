//! Password reset token entity for SeaORM.

use sea_orm::entity::prelude::*;

use domain::{DomainError, PasswordReset, UserId};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "password_resets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTimeUtc,
    pub expires_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PasswordReset {
    type Error = DomainError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(PasswordReset::reconstruct(
            model.token,
            UserId::try_from(model.user_id)?,
            model.created_at,
            model.expires_at,
        ))
    }
}
