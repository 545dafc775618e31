//! Migration to create the leads (orders) table
//!
//! No unique constraint on (phone, day): same-day deduplication is an
//! advisory application-level check by design.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Leads::Table)
                    .if_not_exists()
                    .col(pk_auto(Leads::Id))
                    .col(string(Leads::LeadNumber).not_null())
                    .col(integer(Leads::ProductId).not_null())
                    .col(integer(Leads::UserId).not_null())
                    .col(string_null(Leads::PublisherId))
                    .col(string(Leads::CustomerName).not_null())
                    .col(string(Leads::CustomerPhone).not_null())
                    .col(string(Leads::CustomerPhoneFormatted).not_null())
                    .col(string_null(Leads::CustomerAddress))
                    .col(string_null(Leads::CustomerCity))
                    .col(integer(Leads::Quantity).not_null().default(1))
                    .col(decimal_len(Leads::Value, 10, 2).not_null())
                    .col(decimal_len(Leads::Payout, 10, 2).not_null())
                    .col(string(Leads::Status).not_null().default("pending"))
                    .col(string_null(Leads::Sub1))
                    .col(string_null(Leads::Sub2))
                    .col(
                        timestamp_with_time_zone(Leads::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Leads::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leads_lead_number")
                    .table(Leads::Table)
                    .col(Leads::LeadNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // The duplicate guard scans by phone within the current day
        manager
            .create_index(
                Index::create()
                    .name("idx_leads_phone_created_at")
                    .table(Leads::Table)
                    .col(Leads::CustomerPhoneFormatted)
                    .col(Leads::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leads_user_id")
                    .table(Leads::Table)
                    .col(Leads::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Leads::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Leads {
    Table,
    Id,
    LeadNumber,
    ProductId,
    UserId,
    PublisherId,
    CustomerName,
    CustomerPhone,
    CustomerPhoneFormatted,
    CustomerAddress,
    CustomerCity,
    Quantity,
    Value,
    Payout,
    Status,
    Sub1,
    Sub2,
    CreatedAt,
    UpdatedAt,
}
