pub use sea_orm_migration::prelude::*;

mod m20250801_000001_create_users;
mod m20250801_000002_create_products;
mod m20250802_000001_create_leads;
mod m20250803_000001_create_payout_exceptions;
mod m20250804_000001_create_postback_configurations;
mod m20250804_000002_create_postback_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000001_create_users::Migration),
            Box::new(m20250801_000002_create_products::Migration),
            Box::new(m20250802_000001_create_leads::Migration),
            Box::new(m20250803_000001_create_payout_exceptions::Migration),
            Box::new(m20250804_000001_create_postback_configurations::Migration),
            Box::new(m20250804_000002_create_postback_notifications::Migration),
        ]
    }
}
