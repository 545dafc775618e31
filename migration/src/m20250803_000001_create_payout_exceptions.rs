//! Migration to create the payout_exceptions table
//!
//! The unique index enforces one override per (product, user, publisher) for
//! non-NULL publishers; the NULL (affiliate-wide) case is guarded at the
//! application level.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PayoutExceptions::Table)
                    .if_not_exists()
                    .col(pk_auto(PayoutExceptions::Id))
                    .col(integer(PayoutExceptions::ProductId).not_null())
                    .col(integer(PayoutExceptions::UserId).not_null())
                    .col(string_null(PayoutExceptions::PublisherId))
                    .col(decimal_len(PayoutExceptions::PayoutAmount, 10, 2).not_null())
                    .col(
                        timestamp_with_time_zone(PayoutExceptions::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payout_exceptions_triple")
                    .table(PayoutExceptions::Table)
                    .col(PayoutExceptions::ProductId)
                    .col(PayoutExceptions::UserId)
                    .col(PayoutExceptions::PublisherId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PayoutExceptions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PayoutExceptions {
    Table,
    Id,
    ProductId,
    UserId,
    PublisherId,
    PayoutAmount,
    CreatedAt,
}
