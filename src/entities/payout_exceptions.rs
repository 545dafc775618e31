//! SeaORM Entity for the payout_exceptions table
//!
//! One row per (product_id, user_id, publisher_id) triple. A NULL publisher_id
//! is an affiliate-wide override; non-NULL scopes the override to a single
//! publisher. Rows are created and deleted by admins, never mutated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payout_exceptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub user_id: i32,
    pub publisher_id: Option<String>,
    pub payout_amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
