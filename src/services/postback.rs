//! Outbound postback dispatch.
//!
//! Status transitions enqueue a `PostbackJob` and move on; delivery happens on
//! background workers so a slow or unreachable endpoint never delays the caller
//! that changed the lead's status. Jobs are routed to a worker shard by lead
//! id, which keeps sends for the same lead FIFO while unrelated leads proceed
//! in parallel.
//!
//! Every dispatch writes a `postback_notifications` row that is updated in
//! place as retries happen; after the retry budget is spent the row stays
//! `failed` permanently. Log writes are best-effort and never block delivery.

use chrono::Utc;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::Client;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::entities::{leads, postback_configurations, postback_notifications, prelude::*};
use crate::services::lead_status::LeadStatus;

const NUM_SHARDS: usize = 4;
const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_STORED_BODY_CHARS: usize = 1024;

pub const NOTIFICATION_PENDING: &str = "pending";
pub const NOTIFICATION_SUCCESS: &str = "success";
pub const NOTIFICATION_FAILED: &str = "failed";

/// One requested postback. `lead_id` is `None` for manual test postbacks,
/// which follow the identical delivery contract.
#[derive(Debug, Clone)]
pub struct PostbackJob {
    pub user_id: i32,
    pub lead_id: Option<i32>,
    pub target_status: LeadStatus,
}

/// Retry budget for a single dispatch. `backoff` is the base delay, doubled
/// after each failed attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn delay_before_retry(&self, retries_done: u32) -> Duration {
        // 2s, 4s, 8s... with the default policy.
        self.backoff * 2u32.saturating_pow(retries_done)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum AttemptOutcome {
    /// Remote answered 2xx.
    Delivered { http_status: u16 },
    /// Remote answered non-2xx; the body is kept for the audit log.
    Rejected { http_status: u16, body: String },
    /// Transport-level failure, including the per-attempt timeout.
    Failed { error: String },
}

impl AttemptOutcome {
    fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Delivered { .. })
    }
}

/// Sharded fire-and-forget queue in front of the delivery workers.
#[derive(Clone)]
pub struct PostbackDispatcher {
    shards: Arc<Vec<mpsc::UnboundedSender<PostbackJob>>>,
}

impl PostbackDispatcher {
    /// Spawn the delivery workers against the real database.
    pub fn start(db: Arc<DatabaseConnection>) -> Self {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .expect("failed to build postback HTTP client");
        let policy = RetryPolicy::default();

        Self::start_with_handler(NUM_SHARDS, move |job| {
            let db = db.clone();
            let client = client.clone();
            let policy = policy.clone();
            async move {
                if let Err(e) = process_job(&db, &client, &policy, job).await {
                    tracing::error!("postback dispatch failed: {}", e);
                }
            }
            .boxed()
        })
    }

    /// Queue seam: spawn workers around an arbitrary job handler. Each shard
    /// processes its jobs strictly one at a time, which is what gives the
    /// per-lead ordering guarantee. Tests use this to observe queue behavior
    /// without a database or network.
    pub fn start_with_handler<F>(shard_count: usize, handler: F) -> Self
    where
        F: Fn(PostbackJob) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let mut shards = Vec::with_capacity(shard_count);

        for shard in 0..shard_count {
            let (tx, mut rx) = mpsc::unbounded_channel::<PostbackJob>();
            let handler = handler.clone();
            tokio::spawn(async move {
                while let Some(job) = rx.recv().await {
                    tracing::debug!(
                        "shard {} processing postback for user {} (lead {:?}, status {})",
                        shard,
                        job.user_id,
                        job.lead_id,
                        job.target_status.as_str()
                    );
                    handler(job).await;
                }
            });
            shards.push(tx);
        }

        Self {
            shards: Arc::new(shards),
        }
    }

    /// Hand a job to its shard. Never blocks and never fails the caller.
    pub fn enqueue(&self, job: PostbackJob) {
        let idx = shard_index(&job, self.shards.len());
        if self.shards[idx].send(job).is_err() {
            tracing::warn!("postback worker {} has shut down; dropping job", idx);
        }
    }
}

/// Same lead always lands on the same shard; test postbacks key off the user.
fn shard_index(job: &PostbackJob, shard_count: usize) -> usize {
    let key = job.lead_id.unwrap_or(job.user_id);
    key.unsigned_abs() as usize % shard_count.max(1)
}

/// The URL configured for a target status, if any. Empty strings count as
/// unset.
fn url_for(config: &postback_configurations::Model, status: LeadStatus) -> Option<String> {
    let url = match status {
        LeadStatus::Sale => config.sale_url.as_ref(),
        LeadStatus::Hold => config.hold_url.as_ref(),
        LeadStatus::Rejected => config.rejected_url.as_ref(),
        LeadStatus::Trash => config.trash_url.as_ref(),
        LeadStatus::Pending => None,
    };
    url.filter(|u| !u.trim().is_empty()).cloned()
}

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_STORED_BODY_CHARS).collect()
}

fn build_payload(job: &PostbackJob, lead: Option<&leads::Model>) -> serde_json::Value {
    match lead {
        Some(lead) => json!({
            "leadNumber": lead.lead_number,
            "status": job.target_status.as_str(),
            "value": lead.value,
            "payout": lead.payout,
            "productId": lead.product_id,
            "publisherId": lead.publisher_id,
            "quantity": lead.quantity,
            "customerName": lead.customer_name,
            "customerPhone": lead.customer_phone_formatted,
            "changedAt": Utc::now().to_rfc3339(),
        }),
        None => json!({
            "test": true,
            "leadNumber": serde_json::Value::Null,
            "status": job.target_status.as_str(),
            "changedAt": Utc::now().to_rfc3339(),
        }),
    }
}

/// One POST attempt. The reqwest client carries the per-attempt timeout, so a
/// hung endpoint surfaces here as `Failed`.
async fn attempt_send(client: &Client, url: &str, payload: &serde_json::Value) -> AttemptOutcome {
    match client.post(url).json(payload).send().await {
        Ok(response) => {
            let http_status = response.status().as_u16();
            if response.status().is_success() {
                AttemptOutcome::Delivered { http_status }
            } else {
                let body = response.text().await.unwrap_or_default();
                AttemptOutcome::Rejected {
                    http_status,
                    body: truncate_body(&body),
                }
            }
        }
        Err(e) => AttemptOutcome::Failed {
            error: truncate_body(&e.to_string()),
        },
    }
}

async fn record_attempt(
    db: &DatabaseConnection,
    notification_id: i32,
    status: &str,
    outcome: &AttemptOutcome,
    retry_count: u32,
) -> Result<(), DbErr> {
    let mut update = PostbackNotifications::update_many()
        .col_expr(postback_notifications::Column::Status, Expr::value(status))
        .col_expr(
            postback_notifications::Column::RetryCount,
            Expr::value(retry_count as i32),
        )
        .col_expr(
            postback_notifications::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        );

    update = match outcome {
        AttemptOutcome::Delivered { http_status } => update.col_expr(
            postback_notifications::Column::HttpStatus,
            Expr::value(*http_status as i32),
        ),
        AttemptOutcome::Rejected { http_status, body } => update
            .col_expr(
                postback_notifications::Column::HttpStatus,
                Expr::value(*http_status as i32),
            )
            .col_expr(
                postback_notifications::Column::ResponseBody,
                Expr::value(body.clone()),
            ),
        AttemptOutcome::Failed { error } => update.col_expr(
            postback_notifications::Column::ErrorMessage,
            Expr::value(error.clone()),
        ),
    };

    update
        .filter(postback_notifications::Column::Id.eq(notification_id))
        .exec(db)
        .await
        .map(|_| ())
}

/// Full dispatch of one job: config lookup, payload build, send with retries,
/// audit-log bookkeeping. Returning `Err` only means the job could not even be
/// attempted (config unreadable); delivery failures are terminal in the log,
/// never propagated.
pub async fn process_job(
    db: &DatabaseConnection,
    client: &Client,
    policy: &RetryPolicy,
    job: PostbackJob,
) -> Result<(), DbErr> {
    let config = PostbackConfigurations::find()
        .filter(postback_configurations::Column::UserId.eq(job.user_id))
        .one(db)
        .await?;

    let Some(config) = config else {
        tracing::debug!("user {} has no postback configuration; skipping", job.user_id);
        return Ok(());
    };
    if !config.is_enabled {
        tracing::debug!("postbacks disabled for user {}; skipping", job.user_id);
        return Ok(());
    }
    let Some(url) = url_for(&config, job.target_status) else {
        tracing::debug!(
            "user {} has no {} postback URL; skipping",
            job.user_id,
            job.target_status.as_str()
        );
        return Ok(());
    };

    let lead = match job.lead_id {
        Some(lead_id) => Leads::find_by_id(lead_id).one(db).await?,
        None => None,
    };

    let payload = build_payload(&job, lead.as_ref());

    // Record the attempt-group before sending. If the log write fails we keep
    // going: delivery matters more than the audit row.
    let notification_id = {
        let row = postback_notifications::ActiveModel {
            user_id: Set(job.user_id),
            lead_id: Set(job.lead_id),
            url: Set(url.clone()),
            status: Set(NOTIFICATION_PENDING.to_string()),
            retry_count: Set(0),
            ..Default::default()
        };
        match row.insert(db).await {
            Ok(model) => Some(model.id),
            Err(e) => {
                tracing::error!("failed to record postback notification: {}", e);
                None
            }
        }
    };

    let mut retries_done: u32 = 0;
    loop {
        let outcome = attempt_send(client, &url, &payload).await;

        let terminal = outcome.is_success() || retries_done >= policy.max_retries;
        let row_status = match (&outcome, terminal) {
            (AttemptOutcome::Delivered { .. }, _) => NOTIFICATION_SUCCESS,
            (_, true) => NOTIFICATION_FAILED,
            (_, false) => NOTIFICATION_PENDING,
        };

        if let Some(id) = notification_id {
            if let Err(e) = record_attempt(db, id, row_status, &outcome, retries_done).await {
                tracing::error!("failed to update postback notification {}: {}", id, e);
            }
        }

        match outcome {
            AttemptOutcome::Delivered { http_status } => {
                tracing::info!(
                    "postback to {} for user {} delivered ({})",
                    url,
                    job.user_id,
                    http_status
                );
                return Ok(());
            }
            AttemptOutcome::Rejected { http_status, .. } if terminal => {
                tracing::warn!(
                    "postback to {} for user {} rejected ({}) after {} retries",
                    url,
                    job.user_id,
                    http_status,
                    retries_done
                );
                return Ok(());
            }
            AttemptOutcome::Failed { ref error } if terminal => {
                tracing::warn!(
                    "postback to {} for user {} failed after {} retries: {}",
                    url,
                    job.user_id,
                    retries_done,
                    error
                );
                return Ok(());
            }
            _ => {
                tokio::time::sleep(policy.delay_before_retry(retries_done)).await;
                retries_done += 1;
            }
        }
    }
}
