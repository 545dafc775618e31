//! SeaORM Entity for the postback_configurations table
//!
//! One row per user; one optional URL per target status. Postbacks are opt-in:
//! a missing row, a disabled flag or an empty URL all mean "don't send".

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "postback_configurations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub is_enabled: bool,
    pub sale_url: Option<String>,
    pub hold_url: Option<String>,
    pub rejected_url: Option<String>,
    pub trash_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
