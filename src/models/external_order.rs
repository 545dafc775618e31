use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::leads;

/// Ingestion payload. Required fields are `Option` so validation can answer
/// with a stable 400 message instead of a serde rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: Option<i32>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub quantity: Option<i32>,
    pub customer_address: Option<String>,
    pub customer_city: Option<String>,
    pub publisher_id: Option<String>,
    pub sub1: Option<String>,
    pub sub2: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_number: String,
    pub status: String,
    pub value: Decimal,
    pub payout: Decimal,
    pub created_at: DateTime<FixedOffset>,
}

impl From<&leads::Model> for OrderSummary {
    fn from(lead: &leads::Model) -> Self {
        Self {
            order_number: lead.lead_number.clone(),
            status: lead.status.clone(),
            value: lead.value,
            payout: lead.payout,
            created_at: lead.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: OrderSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub success: bool,
    pub order_number: String,
    pub status: String,
}
