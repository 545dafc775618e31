use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::payout_exceptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayoutExceptionRequest {
    pub product_id: i32,
    pub user_id: i32,
    pub publisher_id: Option<String>,
    pub payout_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutExceptionResponse {
    pub id: i32,
    pub product_id: i32,
    pub user_id: i32,
    pub publisher_id: Option<String>,
    pub payout_amount: Decimal,
}

impl From<&payout_exceptions::Model> for PayoutExceptionResponse {
    fn from(row: &payout_exceptions::Model) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            publisher_id: row.publisher_id.clone(),
            payout_amount: row.payout_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayoutExceptionResponse {
    pub success: bool,
    pub exception: PayoutExceptionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutExceptionListResponse {
    pub success: bool,
    pub exceptions: Vec<PayoutExceptionResponse>,
}
