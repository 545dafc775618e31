//! Payout exception administration.
//!
//! Exceptions are created and deleted, never edited; at most one row may exist
//! per (product, user, publisher) triple, with a NULL publisher meaning the
//! affiliate-wide override. Role enforcement happens upstream; these routes
//! sit behind the financial-operations rate limit.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entities::{payout_exceptions, prelude::*};
use crate::handlers::auth::require_user_id;
use crate::models::error::ErrorResponse;
use crate::models::payout_exception::{
    CreatePayoutExceptionRequest, CreatePayoutExceptionResponse, PayoutExceptionListResponse,
    PayoutExceptionResponse,
};
use crate::services::rate_limit::rate_limit_headers;
use crate::AppState;

fn respond<T: Serialize>(status: StatusCode, headers: HeaderMap, body: T) -> Response {
    (status, headers, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExceptionsQuery {
    pub user_id: Option<i32>,
    pub product_id: Option<i32>,
}

pub async fn list_payout_exceptions(
    State(state): State<AppState>,
    Query(query): Query<ListExceptionsQuery>,
    headers: HeaderMap,
) -> Response {
    let acting_user = match require_user_id(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.financial.check(&acting_user.to_string());
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return respond(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    let mut find = PayoutExceptions::find();
    if let Some(user_id) = query.user_id {
        find = find.filter(payout_exceptions::Column::UserId.eq(user_id));
    }
    if let Some(product_id) = query.product_id {
        find = find.filter(payout_exceptions::Column::ProductId.eq(product_id));
    }

    match find
        .order_by_asc(payout_exceptions::Column::Id)
        .all(&*state.db)
        .await
    {
        Ok(rows) => respond(
            StatusCode::OK,
            rl_headers,
            PayoutExceptionListResponse {
                success: true,
                exceptions: rows.iter().map(PayoutExceptionResponse::from).collect(),
            },
        ),
        Err(e) => {
            tracing::error!("payout exception list failed: {}", e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            )
        }
    }
}

pub async fn create_payout_exception(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePayoutExceptionRequest>,
) -> Response {
    let acting_user = match require_user_id(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.financial.check(&acting_user.to_string());
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return respond(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    if payload.payout_amount.is_sign_negative() {
        return respond(
            StatusCode::BAD_REQUEST,
            rl_headers,
            ErrorResponse::message("payoutAmount must not be negative"),
        );
    }
    let publisher_id = payload
        .publisher_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    // Advisory uniqueness check on the (product, user, publisher) triple; the
    // unique index backstops the non-NULL case.
    let mut existing = PayoutExceptions::find()
        .filter(payout_exceptions::Column::ProductId.eq(payload.product_id))
        .filter(payout_exceptions::Column::UserId.eq(payload.user_id));
    existing = match &publisher_id {
        Some(publisher) => {
            existing.filter(payout_exceptions::Column::PublisherId.eq(publisher.as_str()))
        }
        None => existing.filter(payout_exceptions::Column::PublisherId.is_null()),
    };

    match existing.one(&*state.db).await {
        Ok(Some(_)) => {
            return respond(
                StatusCode::CONFLICT,
                rl_headers,
                ErrorResponse::message(
                    "A payout exception already exists for this product, user and publisher",
                ),
            )
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("payout exception lookup failed: {}", e);
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            );
        }
    }

    let row = payout_exceptions::ActiveModel {
        product_id: Set(payload.product_id),
        user_id: Set(payload.user_id),
        publisher_id: Set(publisher_id),
        payout_amount: Set(payload.payout_amount),
        ..Default::default()
    };

    match row.insert(&*state.db).await {
        Ok(created) => respond(
            StatusCode::CREATED,
            rl_headers,
            CreatePayoutExceptionResponse {
                success: true,
                exception: PayoutExceptionResponse::from(&created),
            },
        ),
        Err(e) => {
            tracing::error!("payout exception insert failed: {}", e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            )
        }
    }
}

pub async fn delete_payout_exception(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    let acting_user = match require_user_id(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.financial.check(&acting_user.to_string());
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return respond(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    match PayoutExceptions::delete_by_id(id).exec(&*state.db).await {
        Ok(result) if result.rows_affected > 0 => respond(
            StatusCode::OK,
            rl_headers,
            json!({ "success": true, "message": "Payout exception deleted" }),
        ),
        Ok(_) => respond(
            StatusCode::NOT_FOUND,
            rl_headers,
            ErrorResponse::message("Unknown payout exception"),
        ),
        Err(e) => {
            tracing::error!("payout exception delete failed for {}: {}", id, e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            )
        }
    }
}
