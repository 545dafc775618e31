//! Payout resolution under the three-level override hierarchy.
//!
//! First match wins: publisher-specific exception, then affiliate-level
//! exception (publisher IS NULL), then the product's base payout. Pure read,
//! so creation-time snapshots and reporting-time recomputation agree unless
//! the override table changed in between.

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use std::fmt;

use crate::entities::{payout_exceptions, prelude::*, products};

#[derive(Debug)]
pub enum PayoutError {
    /// The product has no base payout and no override matched. A
    /// data-integrity fault, not user error.
    NoPayoutConfigured { product_id: i32 },
    Db(DbErr),
}

impl fmt::Display for PayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayoutError::NoPayoutConfigured { product_id } => {
                write!(f, "no payout configured for product {}", product_id)
            }
            PayoutError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for PayoutError {}

impl From<DbErr> for PayoutError {
    fn from(e: DbErr) -> Self {
        PayoutError::Db(e)
    }
}

/// Resolve the payout for a lead on `product` owned by `user_id`, optionally
/// tagged with a publisher. Each level is a single point lookup.
pub async fn resolve_payout(
    db: &DatabaseConnection,
    product: &products::Model,
    user_id: i32,
    publisher_id: Option<&str>,
) -> Result<Decimal, PayoutError> {
    // Level 1: publisher-specific override.
    if let Some(publisher) = publisher_id {
        let exception = PayoutExceptions::find()
            .filter(payout_exceptions::Column::ProductId.eq(product.id))
            .filter(payout_exceptions::Column::UserId.eq(user_id))
            .filter(payout_exceptions::Column::PublisherId.eq(publisher))
            .one(db)
            .await?;

        if let Some(exception) = exception {
            return Ok(exception.payout_amount);
        }
    }

    // Level 2: affiliate-wide override.
    let exception = PayoutExceptions::find()
        .filter(payout_exceptions::Column::ProductId.eq(product.id))
        .filter(payout_exceptions::Column::UserId.eq(user_id))
        .filter(payout_exceptions::Column::PublisherId.is_null())
        .one(db)
        .await?;

    if let Some(exception) = exception {
        return Ok(exception.payout_amount);
    }

    // Level 3: product default.
    product.payout.ok_or(PayoutError::NoPayoutConfigured {
        product_id: product.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn product(payout: Option<Decimal>) -> products::Model {
        products::Model {
            id: 10,
            name: "Slimming Tea".to_string(),
            price: dec!(49.90),
            payout,
            is_active: true,
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn exception(publisher_id: Option<&str>, amount: Decimal) -> payout_exceptions::Model {
        payout_exceptions::Model {
            id: 1,
            product_id: 10,
            user_id: 5,
            publisher_id: publisher_id.map(str::to_string),
            payout_amount: amount,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[tokio::test]
    async fn publisher_override_wins_over_everything() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![exception(Some("PUB1"), dec!(45))]])
            .into_connection();

        let amount = resolve_payout(&db, &product(Some(dec!(20))), 5, Some("PUB1"))
            .await
            .unwrap();
        assert_eq!(amount, dec!(45));
    }

    #[tokio::test]
    async fn falls_back_to_affiliate_override_when_publisher_misses() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<payout_exceptions::Model>::new()])
            .append_query_results([vec![exception(None, dec!(30))]])
            .into_connection();

        let amount = resolve_payout(&db, &product(Some(dec!(20))), 5, Some("PUB2"))
            .await
            .unwrap();
        assert_eq!(amount, dec!(30));
    }

    #[tokio::test]
    async fn affiliate_override_applies_without_publisher() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![exception(None, dec!(30))]])
            .into_connection();

        let amount = resolve_payout(&db, &product(Some(dec!(20))), 5, None)
            .await
            .unwrap();
        assert_eq!(amount, dec!(30));
    }

    #[tokio::test]
    async fn no_overrides_falls_back_to_product_default() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<payout_exceptions::Model>::new()])
            .into_connection();

        let amount = resolve_payout(&db, &product(Some(dec!(20))), 7, None)
            .await
            .unwrap();
        assert_eq!(amount, dec!(20));
    }

    #[tokio::test]
    async fn missing_product_default_is_a_configuration_fault() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<payout_exceptions::Model>::new()])
            .into_connection();

        let err = resolve_payout(&db, &product(None), 7, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PayoutError::NoPayoutConfigured { product_id: 10 }
        ));
    }

    #[tokio::test]
    async fn resolution_is_deterministic_for_fixed_state() {
        let affiliate_row = exception(None, dec!(30));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![affiliate_row.clone()]])
            .append_query_results([vec![affiliate_row]])
            .into_connection();

        let p = product(Some(dec!(20)));
        let first = resolve_payout(&db, &p, 5, None).await.unwrap();
        let second = resolve_payout(&db, &p, 5, None).await.unwrap();
        assert_eq!(first, second);
    }
}
