mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::patch,
    Router,
};
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use serde_json::{json, Value};
use tower::ServiceExt;

use affiliate_backend::entities::leads;
use affiliate_backend::handlers::lead;

use crate::common::test_app_state;

fn build_app(db: DatabaseConnection) -> Router {
    Router::new()
        .route("/api/leads/{lead_number}/status", patch(lead::update_lead_status))
        .with_state(test_app_state(db))
}

fn pending_lead() -> leads::Model {
    let now = Utc::now().fixed_offset();
    leads::Model {
        id: 42,
        lead_number: "ORD-PENDING001".to_string(),
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
        payout: dec!(20),
        status: "pending".to_string(),
        sub1: None,
        sub2: None,
        created_at: now,
        updated_at: now,
    }
}

fn patch_status(lead_number: &str, status: &str, user_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PATCH")
        .uri(format!("/api/leads/{}/status", lead_number))
        .header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }
    builder
        .body(Body::from(json!({ "status": status }).to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(patch_status("ORD-PENDING001", "hold", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_status_is_rejected_before_any_lookup() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(patch_status("ORD-PENDING001", "cancelled", Some("9")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Unknown status 'cancelled'");
}

#[tokio::test]
async fn unknown_lead_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<leads::Model>::new()])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(patch_status("ORD-NOPE", "hold", Some("9")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pending_lead_moves_to_hold() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![pending_lead()]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(patch_status("ORD-PENDING001", "hold", Some("9")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-ratelimit-remaining"));
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["lead"]["status"], "hold");
    assert_eq!(body["lead"]["leadNumber"], "ORD-PENDING001");
}

#[tokio::test]
async fn reverting_to_pending_is_invalid() {
    let mut lead_on_hold = pending_lead();
    lead_on_hold.status = "hold".to_string();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![lead_on_hold]])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(patch_status("ORD-PENDING001", "pending", Some("9")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stale_update_is_a_conflict_with_machine_code() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![pending_lead()]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(patch_status("ORD-PENDING001", "sale", Some("9")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"], "CONCURRENT_UPDATE");
}
