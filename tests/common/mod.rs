use std::sync::Arc;

use affiliate_backend::services::postback::PostbackDispatcher;
use affiliate_backend::services::rate_limit::RateLimiters;
use affiliate_backend::AppState;
use futures_util::FutureExt;
use sea_orm::DatabaseConnection;

/// Build an AppState around an arbitrary (usually mock) database connection.
/// The postback dispatcher gets a no-op handler so tests exercising the HTTP
/// surface never race the workers against the mock's scripted results.
pub fn test_app_state(db: DatabaseConnection) -> AppState {
    AppState {
        db: Arc::new(db),
        rate_limits: Arc::new(RateLimiters::new()),
        postbacks: PostbackDispatcher::start_with_handler(1, |_| async {}.boxed()),
    }
}
