//! Migration to create the postback_notifications audit log
//!
//! `lead_id` is nullable for manual test postbacks and cascades with its lead:
//! the log references the lead for audit lookup, it does not own it.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PostbackNotifications::Table)
                    .if_not_exists()
                    .col(pk_auto(PostbackNotifications::Id))
                    .col(integer(PostbackNotifications::UserId).not_null())
                    .col(integer_null(PostbackNotifications::LeadId))
                    .col(string(PostbackNotifications::Url).not_null())
                    .col(
                        string(PostbackNotifications::Status)
                            .not_null()
                            .default("pending"),
                    )
                    .col(integer_null(PostbackNotifications::HttpStatus))
                    .col(text_null(PostbackNotifications::ResponseBody))
                    .col(text_null(PostbackNotifications::ErrorMessage))
                    .col(integer(PostbackNotifications::RetryCount).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(PostbackNotifications::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(PostbackNotifications::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_postback_notifications_lead")
                            .from(PostbackNotifications::Table, PostbackNotifications::LeadId)
                            .to(Leads::Table, Leads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_postback_notifications_user_id")
                    .table(PostbackNotifications::Table)
                    .col(PostbackNotifications::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PostbackNotifications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PostbackNotifications {
    Table,
    Id,
    UserId,
    LeadId,
    Url,
    Status,
    HttpStatus,
    ResponseBody,
    ErrorMessage,
    RetryCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Leads {
    Table,
    Id,
}
