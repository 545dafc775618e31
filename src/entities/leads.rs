//! SeaORM Entity for the leads (orders) table
//!
//! `status` is only ever written by the lead state machine. `payout` is the
//! amount snapshotted at creation time; later override changes do not touch
//! existing rows. `customer_phone_formatted` (digits only) is what the
//! same-day duplicate check compares against.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub lead_number: String,
    pub product_id: i32,
    pub user_id: i32,
    pub publisher_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_phone_formatted: String,
    pub customer_address: Option<String>,
    pub customer_city: Option<String>,
    pub quantity: i32,
    pub value: Decimal,
    pub payout: Decimal,
    pub status: String,
    pub sub1: Option<String>,
    pub sub2: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
