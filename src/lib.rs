// src/lib.rs

use sea_orm::DatabaseConnection;
use services::{postback::PostbackDispatcher, rate_limit::RateLimiters};
use std::sync::Arc;

// DatabaseConnection is not Clone when the mock driver is enabled, so the
// shared state keeps it behind an Arc.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub rate_limits: Arc<RateLimiters>,
    pub postbacks: PostbackDispatcher,
}

pub mod entities {
    pub mod prelude;
    pub mod leads;
    pub mod payout_exceptions;
    pub mod postback_configurations;
    pub mod postback_notifications;
    pub mod products;
    pub mod users;
}

pub mod services {
    pub mod duplicate_guard;
    pub mod lead_status;
    pub mod payout;
    pub mod postback;
    pub mod rate_limit;
}

pub mod handlers {
    pub mod auth;
    pub mod external_order;
    pub mod lead;
    pub mod payout_exception;
    pub mod postback;
}

pub mod models {
    pub mod error;
    pub mod external_order;
    pub mod lead;
    pub mod payout_exception;
    pub mod postback;
}

pub mod jobs {
    pub mod rate_limit_sweep;
}
