//! Request identity helpers.
//!
//! External callers authenticate with `X-API-Key`. Internal callers arrive
//! through the platform's auth layer, which forwards the acting user as
//! `X-User-Id`; session and cookie handling are outside this service.

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{prelude::*, users};
use crate::models::error::ErrorResponse;

pub type AuthRejection = (StatusCode, Json<ErrorResponse>);

pub fn require_api_key(headers: &HeaderMap) -> Result<String, AuthRejection> {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::message("Missing X-API-Key header")),
        ))
}

pub async fn find_user_by_api_key(
    db: &DatabaseConnection,
    api_key: &str,
) -> Result<users::Model, AuthRejection> {
    let user = Users::find()
        .filter(users::Column::ApiKey.eq(api_key))
        .one(db)
        .await
        .map_err(|e| {
            tracing::error!("api key lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal()),
            )
        })?;

    user.ok_or((
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::message("Invalid API key")),
    ))
}

pub fn require_user_id(headers: &HeaderMap) -> Result<i32, AuthRejection> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i32>().ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::message("Missing or invalid X-User-Id header")),
        ))
}
