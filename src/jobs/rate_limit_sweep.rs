use std::sync::Arc;
use tokio::time::{interval, Duration};

use crate::services::rate_limit::{RateLimiters, SWEEP_INTERVAL_SECS};

/// Periodically evict elapsed rate-limit windows so one-shot keys (e.g.
/// unauthenticated probes) cannot grow the counter maps without bound. Runs
/// independently of request traffic.
pub async fn start_rate_limit_sweep_job(limiters: Arc<RateLimiters>) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let evicted = limiters.sweep_all();
            if evicted > 0 {
                tracing::debug!("rate limit sweep evicted {} stale windows", evicted);
            }
        }
    });
}
