//! Lead status lifecycle.
//!
//! The only entry transition is creation into `pending`; after that any status
//! may move to any other status except back to `pending` (moderators correct
//! misclassifications, so `trash` is retained-but-not-locked). This module is
//! the only writer of `leads.status`.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use std::fmt;
use uuid::Uuid;

use crate::entities::{leads, prelude::*};
use crate::services::postback::{PostbackDispatcher, PostbackJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadStatus {
    Pending,
    Hold,
    Sale,
    Rejected,
    Trash,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::Hold => "hold",
            LeadStatus::Sale => "sale",
            LeadStatus::Rejected => "rejected",
            LeadStatus::Trash => "trash",
        }
    }

    pub fn parse(s: &str) -> Option<LeadStatus> {
        match s {
            "pending" => Some(LeadStatus::Pending),
            "hold" => Some(LeadStatus::Hold),
            "sale" => Some(LeadStatus::Sale),
            "rejected" => Some(LeadStatus::Rejected),
            "trash" => Some(LeadStatus::Trash),
            _ => None,
        }
    }

    /// `pending` is entry-only, and a transition must change something.
    pub fn can_transition_to(&self, target: LeadStatus) -> bool {
        target != LeadStatus::Pending && target != *self
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum TransitionError {
    /// The requested target is not reachable from the current status.
    InvalidTransition { from: String, to: LeadStatus },
    /// The conditional update matched no row: someone else moved the lead
    /// first. Re-read and reissue if still applicable.
    Conflict,
    Db(DbErr),
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::InvalidTransition { from, to } => {
                write!(f, "cannot transition lead from {} to {}", from, to)
            }
            TransitionError::Conflict => {
                write!(f, "lead status changed concurrently; re-read and retry")
            }
            TransitionError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for TransitionError {}

impl From<DbErr> for TransitionError {
    fn from(e: DbErr) -> Self {
        TransitionError::Db(e)
    }
}

/// Everything needed to create a lead once the duplicate guard and payout
/// resolver have both passed.
pub struct NewLead {
    pub product_id: i32,
    pub user_id: i32,
    pub publisher_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_phone_formatted: String,
    pub customer_address: Option<String>,
    pub customer_city: Option<String>,
    pub quantity: i32,
    pub value: Decimal,
    pub payout: Decimal,
    pub sub1: Option<String>,
    pub sub2: Option<String>,
}

pub fn generate_lead_number() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("ORD-{}", id[..10].to_uppercase())
}

/// Entry transition: insert a new lead as `pending` with its payout
/// snapshotted. The snapshot is never recomputed on later transitions, so
/// override changes cannot retroactively alter already-communicated totals.
pub async fn create_lead(db: &DatabaseConnection, new: NewLead) -> Result<leads::Model, DbErr> {
    let now = Utc::now().fixed_offset();
    let lead = leads::ActiveModel {
        lead_number: Set(generate_lead_number()),
        product_id: Set(new.product_id),
        user_id: Set(new.user_id),
        publisher_id: Set(new.publisher_id),
        customer_name: Set(new.customer_name),
        customer_phone: Set(new.customer_phone),
        customer_phone_formatted: Set(new.customer_phone_formatted),
        customer_address: Set(new.customer_address),
        customer_city: Set(new.customer_city),
        quantity: Set(new.quantity),
        value: Set(new.value),
        payout: Set(new.payout),
        status: Set(LeadStatus::Pending.as_str().to_string()),
        sub1: Set(new.sub1),
        sub2: Set(new.sub2),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    lead.insert(db).await
}

/// Move `lead` to `target` with a compare-and-swap on the current status, then
/// hand the postback job to the dispatcher. A stale caller gets `Conflict`
/// instead of silently clobbering a newer write.
///
/// The enqueue happens after the update commits, outside any transaction. Two
/// transitions racing on the same lead serialize their writes through the CAS,
/// but a caller can be preempted between its commit and its enqueue, so the
/// postback stream for a lead follows enqueue order, not commit order. Callers
/// that need the stream to match the status history must not issue transitions
/// for the same lead concurrently.
pub async fn transition(
    db: &DatabaseConnection,
    dispatcher: &PostbackDispatcher,
    lead: &leads::Model,
    target: LeadStatus,
) -> Result<leads::Model, TransitionError> {
    let valid = match LeadStatus::parse(&lead.status) {
        Some(current) => current.can_transition_to(target),
        // A status we don't recognize is corrupt data; let moderators move
        // the lead somewhere sane rather than wedging it.
        None => target != LeadStatus::Pending,
    };
    if !valid {
        return Err(TransitionError::InvalidTransition {
            from: lead.status.clone(),
            to: target,
        });
    }

    let now = Utc::now().fixed_offset();
    let result = Leads::update_many()
        .col_expr(leads::Column::Status, Expr::value(target.as_str()))
        .col_expr(leads::Column::UpdatedAt, Expr::value(now))
        .filter(leads::Column::Id.eq(lead.id))
        .filter(leads::Column::Status.eq(lead.status.clone()))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(TransitionError::Conflict);
    }

    tracing::info!(
        "lead {} moved {} -> {}",
        lead.lead_number,
        lead.status,
        target
    );

    dispatcher.enqueue(PostbackJob {
        user_id: lead.user_id,
        lead_id: Some(lead.id),
        target_status: target,
    });

    let mut updated = lead.clone();
    updated.status = target.as_str().to_string();
    updated.updated_at = now;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use std::time::Duration;

    fn pending_lead() -> leads::Model {
        let now = Utc::now().fixed_offset();
        leads::Model {
            id: 42,
            lead_number: "ORD-TEST000001".to_string(),
            product_id: 10,
            user_id: 5,
            publisher_id: None,
            customer_name: "Jane Doe".to_string(),
            customer_phone: "+1 555 123 4567".to_string(),
            customer_phone_formatted: "15551234567".to_string(),
            customer_address: None,
            customer_city: None,
            quantity: 1,
            value: dec!(49.90),
            payout: dec!(30),
            status: "pending".to_string(),
            sub1: None,
            sub2: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn recording_dispatcher() -> (PostbackDispatcher, Arc<Mutex<Vec<LeadStatus>>>) {
        let seen: Arc<Mutex<Vec<LeadStatus>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let dispatcher = PostbackDispatcher::start_with_handler(1, move |job| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().push(job.target_status);
            }
            .boxed()
        });
        (dispatcher, seen)
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            LeadStatus::Pending,
            LeadStatus::Hold,
            LeadStatus::Sale,
            LeadStatus::Rejected,
            LeadStatus::Trash,
        ] {
            assert_eq!(LeadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LeadStatus::parse("cancelled"), None);
    }

    #[test]
    fn pending_is_entry_only_and_self_moves_are_invalid() {
        assert!(LeadStatus::Pending.can_transition_to(LeadStatus::Hold));
        assert!(LeadStatus::Pending.can_transition_to(LeadStatus::Trash));
        assert!(LeadStatus::Hold.can_transition_to(LeadStatus::Sale));
        assert!(LeadStatus::Trash.can_transition_to(LeadStatus::Sale));
        assert!(!LeadStatus::Sale.can_transition_to(LeadStatus::Pending));
        assert!(!LeadStatus::Hold.can_transition_to(LeadStatus::Hold));
    }

    #[test]
    fn lead_numbers_are_prefixed_and_distinct() {
        let a = generate_lead_number();
        let b = generate_lead_number();
        assert!(a.starts_with("ORD-"));
        assert_eq!(a.len(), 14);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn transition_sequence_dispatches_postbacks_in_order() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();
        let (dispatcher, seen) = recording_dispatcher();

        let lead = pending_lead();
        let on_hold = transition(&db, &dispatcher, &lead, LeadStatus::Hold)
            .await
            .unwrap();
        assert_eq!(on_hold.status, "hold");

        let sold = transition(&db, &dispatcher, &on_hold, LeadStatus::Sale)
            .await
            .unwrap();
        assert_eq!(sold.status, "sale");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*seen.lock(), vec![LeadStatus::Hold, LeadStatus::Sale]);
    }

    #[tokio::test]
    async fn stale_transition_is_rejected_not_overwritten() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let (dispatcher, seen) = recording_dispatcher();

        let lead = pending_lead();
        let err = transition(&db, &dispatcher, &lead, LeadStatus::Sale)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::Conflict));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(seen.lock().is_empty(), "no postback on a rejected CAS");
    }

    #[tokio::test]
    async fn invalid_target_never_touches_the_database() {
        // Mock has no exec results: any UPDATE would error loudly.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let (dispatcher, _) = recording_dispatcher();

        let mut lead = pending_lead();
        lead.status = "sale".to_string();
        let err = transition(&db, &dispatcher, &lead, LeadStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }
}
