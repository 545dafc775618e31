//! Postback configuration and notification log endpoints.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::entities::{postback_configurations, postback_notifications, prelude::*};
use crate::handlers::auth::require_user_id;
use crate::models::error::ErrorResponse;
use crate::models::postback::{
    NotificationListResponse, NotificationResponse, PostbackConfigResponse, TestPostbackRequest,
    TestPostbackResponse, UpdatePostbackConfigRequest,
};
use crate::services::lead_status::LeadStatus;
use crate::services::postback::PostbackJob;
use crate::services::rate_limit::rate_limit_headers;
use crate::AppState;

const DEFAULT_NOTIFICATION_PAGE: u64 = 50;

fn respond<T: Serialize>(status: StatusCode, headers: HeaderMap, body: T) -> Response {
    (status, headers, Json(body)).into_response()
}

pub async fn get_postback_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let user_id = match require_user_id(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.general.check(&user_id.to_string());
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return respond(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    match PostbackConfigurations::find()
        .filter(postback_configurations::Column::UserId.eq(user_id))
        .one(&*state.db)
        .await
    {
        Ok(Some(config)) => respond(
            StatusCode::OK,
            rl_headers,
            PostbackConfigResponse::from(&config),
        ),
        Ok(None) => respond(StatusCode::OK, rl_headers, PostbackConfigResponse::unset()),
        Err(e) => {
            tracing::error!("postback config lookup failed for user {}: {}", user_id, e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            )
        }
    }
}

pub async fn update_postback_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdatePostbackConfigRequest>,
) -> Response {
    let user_id = match require_user_id(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.general.check(&user_id.to_string());
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return respond(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    let existing = match PostbackConfigurations::find()
        .filter(postback_configurations::Column::UserId.eq(user_id))
        .one(&*state.db)
        .await
    {
        Ok(existing) => existing,
        Err(e) => {
            tracing::error!("postback config lookup failed for user {}: {}", user_id, e);
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            );
        }
    };

    let saved = if let Some(existing) = existing {
        let mut active = existing.into_active_model();
        active.is_enabled = Set(payload.is_enabled);
        active.sale_url = Set(payload.sale_url);
        active.hold_url = Set(payload.hold_url);
        active.rejected_url = Set(payload.rejected_url);
        active.trash_url = Set(payload.trash_url);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&*state.db).await
    } else {
        let now = Utc::now().fixed_offset();
        postback_configurations::ActiveModel {
            user_id: Set(user_id),
            is_enabled: Set(payload.is_enabled),
            sale_url: Set(payload.sale_url),
            hold_url: Set(payload.hold_url),
            rejected_url: Set(payload.rejected_url),
            trash_url: Set(payload.trash_url),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*state.db)
        .await
    };

    match saved {
        Ok(config) => respond(
            StatusCode::OK,
            rl_headers,
            PostbackConfigResponse::from(&config),
        ),
        Err(e) => {
            tracing::error!("postback config save failed for user {}: {}", user_id, e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            )
        }
    }
}

/// Manual test postback: identical delivery contract, no lead attached.
pub async fn send_test_postback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TestPostbackRequest>,
) -> Response {
    let user_id = match require_user_id(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.general.check(&user_id.to_string());
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return respond(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    let target = match LeadStatus::parse(payload.status.trim()) {
        Some(status) if status != LeadStatus::Pending => status,
        _ => {
            return respond(
                StatusCode::BAD_REQUEST,
                rl_headers,
                ErrorResponse::message("status must be one of: sale, hold, rejected, trash"),
            )
        }
    };

    state.postbacks.enqueue(PostbackJob {
        user_id,
        lead_id: None,
        target_status: target,
    });

    respond(
        StatusCode::ACCEPTED,
        rl_headers,
        TestPostbackResponse {
            success: true,
            message: format!("Test {} postback queued", target),
        },
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    pub limit: Option<u64>,
}

pub async fn list_postback_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
    headers: HeaderMap,
) -> Response {
    let user_id = match require_user_id(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.general.check(&user_id.to_string());
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return respond(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_NOTIFICATION_PAGE)
        .min(DEFAULT_NOTIFICATION_PAGE * 4);

    match PostbackNotifications::find()
        .filter(postback_notifications::Column::UserId.eq(user_id))
        .order_by_desc(postback_notifications::Column::CreatedAt)
        .limit(limit)
        .all(&*state.db)
        .await
    {
        Ok(rows) => respond(
            StatusCode::OK,
            rl_headers,
            NotificationListResponse {
                success: true,
                notifications: rows.iter().map(NotificationResponse::from).collect(),
            },
        ),
        Err(e) => {
            tracing::error!("notification list failed for user {}: {}", user_id, e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            )
        }
    }
}
