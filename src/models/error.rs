use serde::{Deserialize, Serialize};

use crate::services::rate_limit::RateLimitDecision;

/// Machine-readable code carried on 429 responses.
pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
/// Machine-readable code carried on optimistic-concurrency rejections.
pub const CONCURRENT_UPDATE: &str = "CONCURRENT_UPDATE";

/// Error body shared by every endpoint: always `success:false` plus a stable
/// message, with optional machine-readable fields where they apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_order_number: Option<String>,
}

impl ErrorResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: None,
            message: message.into(),
            retry_after: None,
            existing_order_number: None,
        }
    }

    pub fn with_code(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: Some(code.to_string()),
            ..Self::message(message)
        }
    }

    pub fn rate_limited(decision: &RateLimitDecision) -> Self {
        Self {
            retry_after: Some(decision.retry_after_secs()),
            ..Self::with_code(
                RATE_LIMIT_EXCEEDED,
                "Too many requests, please try again later",
            )
        }
    }

    /// Soft reject: the caller should treat this as a likely resubmission of
    /// the same logical order, not a system fault.
    pub fn duplicate(existing_order_number: String) -> Self {
        Self {
            existing_order_number: Some(existing_order_number),
            ..Self::message("An order with this phone number was already submitted today")
        }
    }

    /// Sanitized 500 body. The full fault goes to the log, not the caller.
    pub fn internal() -> Self {
        Self::message("Internal server error")
    }
}
