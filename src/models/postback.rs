use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::entities::{postback_configurations, postback_notifications};

/// Upsert payload for a user's postback configuration. Omitted URLs clear the
/// corresponding status hook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostbackConfigRequest {
    pub is_enabled: bool,
    pub sale_url: Option<String>,
    pub hold_url: Option<String>,
    pub rejected_url: Option<String>,
    pub trash_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostbackConfigResponse {
    pub success: bool,
    pub is_enabled: bool,
    pub sale_url: Option<String>,
    pub hold_url: Option<String>,
    pub rejected_url: Option<String>,
    pub trash_url: Option<String>,
}

impl PostbackConfigResponse {
    /// What a user without a stored row sees: everything off.
    pub fn unset() -> Self {
        Self {
            success: true,
            is_enabled: false,
            sale_url: None,
            hold_url: None,
            rejected_url: None,
            trash_url: None,
        }
    }
}

impl From<&postback_configurations::Model> for PostbackConfigResponse {
    fn from(config: &postback_configurations::Model) -> Self {
        Self {
            success: true,
            is_enabled: config.is_enabled,
            sale_url: config.sale_url.clone(),
            hold_url: config.hold_url.clone(),
            rejected_url: config.rejected_url.clone(),
            trash_url: config.trash_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPostbackRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPostbackResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i32,
    pub lead_id: Option<i32>,
    pub url: String,
    pub status: String,
    pub http_status: Option<i32>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<FixedOffset>,
}

impl From<&postback_notifications::Model> for NotificationResponse {
    fn from(row: &postback_notifications::Model) -> Self {
        Self {
            id: row.id,
            lead_id: row.lead_id,
            url: row.url.clone(),
            status: row.status.clone(),
            http_status: row.http_status,
            response_body: row.response_body.clone(),
            error_message: row.error_message.clone(),
            retry_count: row.retry_count,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub success: bool,
    pub notifications: Vec<NotificationResponse>,
}
