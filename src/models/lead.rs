use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::leads;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub lead_number: String,
    pub status: String,
    pub product_id: i32,
    pub user_id: i32,
    pub publisher_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub quantity: i32,
    pub value: Decimal,
    pub payout: Decimal,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<&leads::Model> for LeadResponse {
    fn from(lead: &leads::Model) -> Self {
        Self {
            lead_number: lead.lead_number.clone(),
            status: lead.status.clone(),
            product_id: lead.product_id,
            user_id: lead.user_id,
            publisher_id: lead.publisher_id.clone(),
            customer_name: lead.customer_name.clone(),
            customer_phone: lead.customer_phone_formatted.clone(),
            quantity: lead.quantity,
            value: lead.value,
            payout: lead.payout,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub lead: LeadResponse,
}
