mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;

use affiliate_backend::entities::{postback_configurations, postback_notifications};
use affiliate_backend::handlers::postback;

use crate::common::test_app_state;

fn build_app(db: DatabaseConnection) -> Router {
    Router::new()
        .route("/api/postback-config", get(postback::get_postback_config))
        .route(
            "/api/postback-notifications",
            get(postback::list_postback_notifications),
        )
        .with_state(test_app_state(db))
}

fn failed_notification() -> postback_notifications::Model {
    let now = Utc::now().fixed_offset();
    postback_notifications::Model {
        id: 7,
        user_id: 5,
        lead_id: Some(42),
        url: "https://tracker.example.com/pb".to_string(),
        status: "failed".to_string(),
        http_status: Some(502),
        response_body: Some("Bad Gateway".to_string()),
        error_message: None,
        retry_count: 3,
        created_at: now,
        updated_at: now,
    }
}

fn get_as_user(uri: &str, user_id: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", user_id)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn notification_log_surfaces_the_stored_response_body() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![failed_notification()]])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(get_as_user("/api/postback-notifications", "5"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let row = &body["notifications"][0];
    assert_eq!(row["status"], "failed");
    assert_eq!(row["httpStatus"], 502);
    assert_eq!(row["responseBody"], "Bad Gateway");
    assert_eq!(row["retryCount"], 3);
}

#[tokio::test]
async fn missing_config_reads_as_disabled_defaults() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<postback_configurations::Model>::new()])
        .into_connection();
    let app = build_app(db);

    let response = app
        .oneshot(get_as_user("/api/postback-config", "5"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["isEnabled"], false);
    assert!(body["saleUrl"].is_null());
}
