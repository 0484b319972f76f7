use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_catalog::Movie;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Email))
                    .col(string(Users::Username))
                    .col(string(Users::FirstName))
                    .col(string(Users::LastName))
                    .col(string(Users::PasswordHash))
                    .col(boolean(Users::IsActive))
                    .col(big_integer(Users::DateJoined))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_username")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        for (table, name) in [
            (UserMovie::Favorites, "favorite"),
            (UserMovie::Watchlist, "watchlist"),
        ] {
            manager
                .create_table(
                    Table::create()
                        .table(table.clone())
                        .if_not_exists()
                        .col(pk_auto(UserMovie::Id))
                        .col(integer(UserMovie::UserId))
                        .col(integer(UserMovie::MovieId))
                        .col(big_integer(UserMovie::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_users_{name}_user"))
                                .from(table.clone(), UserMovie::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_users_{name}_movie"))
                                .from(table.clone(), UserMovie::MovieId)
                                .to(Movie::Table, Movie::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_users_{name}_unique"))
                        .table(table)
                        .col(UserMovie::UserId)
                        .col(UserMovie::MovieId)
                        .unique()
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(AuthTokens::Table)
                    .if_not_exists()
                    .col(string(AuthTokens::Token).primary_key())
                    .col(integer(AuthTokens::UserId))
                    .col(string(AuthTokens::Kind))
                    .col(big_integer(AuthTokens::ExpiresAt))
                    .col(big_integer(AuthTokens::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auth_tokens_user")
                            .from(AuthTokens::Table, AuthTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AuthTokens::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(UserMovie::Watchlist).to_owned()).await?;
        manager.drop_table(Table::drop().table(UserMovie::Favorites).to_owned()).await?;
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    #[sea_orm(iden = "users_user")]
    Table,
    Id,
    Email,
    Username,
    FirstName,
    LastName,
    PasswordHash,
    IsActive,
    DateJoined,
}

/// Favorites and watchlist share one shape.
#[derive(DeriveIden, Clone)]
enum UserMovie {
    #[sea_orm(iden = "users_favorite")]
    Favorites,
    #[sea_orm(iden = "users_watchlist")]
    Watchlist,
    Id,
    UserId,
    MovieId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuthTokens {
    Table,
    Token,
    UserId,
    Kind,
    ExpiresAt,
    CreatedAt,
}
