//! Migration: email verification and password reset tokens.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [TokenTable::EmailVerifications, TokenTable::PasswordResets] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Token::Token)
                                .string_len(64)
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Token::UserId).big_integer().not_null())
                        .col(
                            ColumnDef::new(Token::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Token::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{}_user_id", table.to_string()))
                        .table(table)
                        .col(Token::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{}_expires_at", table.to_string()))
                        .table(table)
                        .col(Token::ExpiresAt)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TokenTable::PasswordResets).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TokenTable::EmailVerifications).to_owned())
            .await
    }
}

#[derive(Iden, Clone, Copy)]
enum TokenTable {
    EmailVerifications,
    PasswordResets,
}

#[derive(Iden)]
enum Token {
    Token,
    UserId,
    CreatedAt,
    ExpiresAt,
}
