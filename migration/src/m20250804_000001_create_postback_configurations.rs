//! Migration to create the postback_configurations table

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PostbackConfigurations::Table)
                    .if_not_exists()
                    .col(pk_auto(PostbackConfigurations::Id))
                    .col(integer(PostbackConfigurations::UserId).not_null())
                    .col(boolean(PostbackConfigurations::IsEnabled).default(false))
                    .col(string_null(PostbackConfigurations::SaleUrl))
                    .col(string_null(PostbackConfigurations::HoldUrl))
                    .col(string_null(PostbackConfigurations::RejectedUrl))
                    .col(string_null(PostbackConfigurations::TrashUrl))
                    .col(
                        timestamp_with_time_zone(PostbackConfigurations::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(PostbackConfigurations::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_postback_configurations_user_id")
                    .table(PostbackConfigurations::Table)
                    .col(PostbackConfigurations::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PostbackConfigurations::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum PostbackConfigurations {
    Table,
    Id,
    UserId,
    IsEnabled,
    SaleUrl,
    HoldUrl,
    RejectedUrl,
    TrashUrl,
    CreatedAt,
    UpdatedAt,
}
