//! Same-day duplicate detection for incoming leads.
//!
//! This is an advisory check, not a uniqueness constraint: the check and the
//! subsequent insert are deliberately not atomic, so two requests racing within
//! that window can both pass. Deduplication here is a business heuristic, and
//! accepting that race is cheaper than serializing all ingestion.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::entities::{leads, prelude::*};

/// Minimal reference to an already-existing lead for the duplicate response.
#[derive(Debug, Clone)]
pub struct LeadRef {
    pub lead_number: String,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    pub existing: Option<LeadRef>,
}

impl DuplicateCheck {
    fn not_duplicate() -> Self {
        Self {
            is_duplicate: false,
            existing: None,
        }
    }
}

/// Strip a raw phone number down to its digits.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `[startOfDay, endOfDay)` of `day` in the server's local timezone.
pub fn local_day_bounds(day: NaiveDate) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let start_naive = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    let end_naive = (day + chrono::Days::new(1))
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default();

    // On a DST gap the local midnight may not exist; take the earliest valid
    // instant, falling back to reading the naive time as UTC.
    let to_local = |naive| {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&naive))
            .fixed_offset()
    };

    (to_local(start_naive), to_local(end_naive))
}

/// Check whether a lead with the same normalized phone was already created
/// today. `exclude_lead_number` lets an existing lead be re-checked against
/// everything but itself.
///
/// An empty phone never counts as a duplicate: an unformatted or missing
/// number cannot be reliably compared, so the permissive answer wins.
pub async fn is_duplicate_today(
    db: &DatabaseConnection,
    phone: &str,
    exclude_lead_number: Option<&str>,
) -> Result<DuplicateCheck, DbErr> {
    if phone.trim().is_empty() {
        return Ok(DuplicateCheck::not_duplicate());
    }

    let (start_of_day, end_of_day) = local_day_bounds(Local::now().date_naive());

    let mut query = Leads::find()
        .filter(leads::Column::CustomerPhoneFormatted.eq(phone))
        .filter(leads::Column::CreatedAt.gte(start_of_day))
        .filter(leads::Column::CreatedAt.lt(end_of_day));

    if let Some(lead_number) = exclude_lead_number {
        query = query.filter(leads::Column::LeadNumber.ne(lead_number));
    }

    let existing = query.one(db).await?;

    Ok(match existing {
        Some(lead) => DuplicateCheck {
            is_duplicate: true,
            existing: Some(LeadRef {
                lead_number: lead.lead_number,
                created_at: lead.created_at,
            }),
        },
        None => DuplicateCheck::not_duplicate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn sample_lead(lead_number: &str, phone: &str) -> leads::Model {
        let now = Utc::now().fixed_offset();
        leads::Model {
            id: 1,
            lead_number: lead_number.to_string(),
            product_id: 1,
            user_id: 5,
            publisher_id: None,
            customer_name: "Jane Doe".to_string(),
            customer_phone: phone.to_string(),
            customer_phone_formatted: normalize_phone(phone),
            customer_address: None,
            customer_city: None,
            quantity: 1,
            value: dec!(49.90),
            payout: dec!(20),
            status: "pending".to_string(),
            sub1: None,
            sub2: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn normalize_strips_everything_but_digits() {
        assert_eq!(normalize_phone("+1 (555) 123-4567"), "15551234567");
        assert_eq!(normalize_phone("0712 345 678"), "0712345678");
        assert_eq!(normalize_phone("n/a"), "");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn day_bounds_cover_a_full_day() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let (start, end) = local_day_bounds(day);
        assert!(start < end);
        let span_hours = (end - start).num_hours();
        // 23/25 only on DST transition days in some zones.
        assert!((23..=25).contains(&span_hours), "span was {}h", span_hours);
    }

    #[tokio::test]
    async fn empty_phone_is_never_a_duplicate() {
        // No query results appended: the guard must answer without touching
        // the database.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let check = is_duplicate_today(&db, "", None).await.unwrap();
        assert!(!check.is_duplicate);

        let check = is_duplicate_today(&db, "   ", None).await.unwrap();
        assert!(!check.is_duplicate);
    }

    #[tokio::test]
    async fn same_day_match_reports_existing_lead() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_lead("ORD-AAA111", "+1 555 123 4567")]])
            .into_connection();

        let check = is_duplicate_today(&db, "15551234567", None).await.unwrap();
        assert!(check.is_duplicate);
        assert_eq!(check.existing.unwrap().lead_number, "ORD-AAA111");
    }

    #[tokio::test]
    async fn no_match_means_no_duplicate() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<leads::Model>::new()])
            .into_connection();

        let check = is_duplicate_today(&db, "15551234567", Some("ORD-AAA111"))
            .await
            .unwrap();
        assert!(!check.is_duplicate);
        assert!(check.existing.is_none());
    }
}
