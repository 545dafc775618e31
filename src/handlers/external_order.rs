//! External ingestion API: affiliates' systems submit orders here.
//!
//! Pipeline per request: rate limit -> field validation -> API key auth ->
//! product lookup -> duplicate guard -> payout resolution -> lead creation.
//! Duplicate hits are soft rejects the caller should treat idempotently.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::entities::{leads, prelude::*};
use crate::handlers::auth::{find_user_by_api_key, require_api_key};
use crate::models::error::ErrorResponse;
use crate::models::external_order::{
    CreateOrderRequest, CreateOrderResponse, OrderStatusResponse, OrderSummary,
};
use crate::services::duplicate_guard::{is_duplicate_today, normalize_phone};
use crate::services::lead_status::{create_lead, NewLead};
use crate::services::payout::{resolve_payout, PayoutError};
use crate::services::rate_limit::rate_limit_headers;
use crate::AppState;

fn reject<T: Serialize>(status: StatusCode, headers: HeaderMap, body: T) -> Response {
    (status, headers, Json(body)).into_response()
}

pub async fn create_external_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateOrderRequest>,
) -> Response {
    let api_key = match require_api_key(&headers) {
        Ok(key) => key,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.ingestion.check(&api_key);
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    // Field validation, cheapest first.
    let Some(product_id) = payload.product_id else {
        return reject(
            StatusCode::BAD_REQUEST,
            rl_headers,
            ErrorResponse::message("productId is required"),
        );
    };
    let customer_name = match payload.customer_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return reject(
                StatusCode::BAD_REQUEST,
                rl_headers,
                ErrorResponse::message("customerName is required"),
            )
        }
    };
    let customer_phone = match payload.customer_phone.as_deref().map(str::trim) {
        Some(phone) if !phone.is_empty() => phone.to_string(),
        _ => {
            return reject(
                StatusCode::BAD_REQUEST,
                rl_headers,
                ErrorResponse::message("customerPhone is required"),
            )
        }
    };
    let quantity = payload.quantity.unwrap_or(1);
    if quantity < 1 {
        return reject(
            StatusCode::BAD_REQUEST,
            rl_headers,
            ErrorResponse::message("quantity must be at least 1"),
        );
    }
    let phone_formatted = normalize_phone(&customer_phone);
    if phone_formatted.is_empty() {
        return reject(
            StatusCode::BAD_REQUEST,
            rl_headers,
            ErrorResponse::message("customerPhone must contain digits"),
        );
    }

    let user = match find_user_by_api_key(&*state.db, &api_key).await {
        Ok(user) => user,
        Err((status, body)) => return reject(status, rl_headers, body.0),
    };

    let product = match Products::find_by_id(product_id).one(&*state.db).await {
        Ok(Some(product)) if product.is_active => product,
        Ok(_) => {
            return reject(
                StatusCode::NOT_FOUND,
                rl_headers,
                ErrorResponse::message("Unknown product"),
            )
        }
        Err(e) => {
            tracing::error!("product lookup failed for {}: {}", product_id, e);
            return reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            );
        }
    };

    // Advisory same-day dedup; a racing insert can still slip through, which
    // is accepted (see duplicate_guard).
    match is_duplicate_today(&*state.db, &phone_formatted, None).await {
        Ok(check) if check.is_duplicate => {
            let existing = check
                .existing
                .map(|lead| lead.lead_number)
                .unwrap_or_default();
            let tail = &phone_formatted[phone_formatted.len().saturating_sub(4)..];
            tracing::info!(
                "duplicate order for phone ending {} (existing {})",
                tail,
                existing
            );
            return reject(
                StatusCode::CONFLICT,
                rl_headers,
                ErrorResponse::duplicate(existing),
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!("duplicate check failed: {}", e);
            return reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            );
        }
    }

    let payout = match resolve_payout(
        &*state.db,
        &product,
        user.id,
        payload.publisher_id.as_deref(),
    )
    .await
    {
        Ok(payout) => payout,
        Err(PayoutError::NoPayoutConfigured { product_id }) => {
            // Data-integrity fault: a well-formed product always has a base
            // payout. Never silently default to zero.
            tracing::error!(
                "product {} has no payout configured (user {}, publisher {:?})",
                product_id,
                user.id,
                payload.publisher_id
            );
            return reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            );
        }
        Err(PayoutError::Db(e)) => {
            tracing::error!("payout resolution failed: {}", e);
            return reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            );
        }
    };

    let value = product.price * Decimal::from(quantity);

    let lead = match create_lead(
        &*state.db,
        NewLead {
            product_id: product.id,
            user_id: user.id,
            publisher_id: payload.publisher_id,
            customer_name,
            customer_phone,
            customer_phone_formatted: phone_formatted,
            customer_address: payload.customer_address,
            customer_city: payload.customer_city,
            quantity,
            value,
            payout,
            sub1: payload.sub1,
            sub2: payload.sub2,
        },
    )
    .await
    {
        Ok(lead) => lead,
        Err(e) => {
            tracing::error!("lead insert failed: {}", e);
            return reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            );
        }
    };

    tracing::info!(
        "lead {} created for user {} (payout {})",
        lead.lead_number,
        user.id,
        lead.payout
    );

    (
        StatusCode::CREATED,
        rl_headers,
        Json(CreateOrderResponse {
            success: true,
            order: OrderSummary::from(&lead),
        }),
    )
        .into_response()
}

pub async fn get_order_status(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    headers: HeaderMap,
) -> Response {
    let api_key = match require_api_key(&headers) {
        Ok(key) => key,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.general.check(&api_key);
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    let user = match find_user_by_api_key(&*state.db, &api_key).await {
        Ok(user) => user,
        Err((status, body)) => return reject(status, rl_headers, body.0),
    };

    // Scoped to the key's owner so one affiliate cannot probe another's orders.
    let lead = match Leads::find()
        .filter(leads::Column::LeadNumber.eq(&order_number))
        .filter(leads::Column::UserId.eq(user.id))
        .one(&*state.db)
        .await
    {
        Ok(Some(lead)) => lead,
        Ok(None) => {
            return reject(
                StatusCode::NOT_FOUND,
                rl_headers,
                ErrorResponse::message("Unknown order"),
            )
        }
        Err(e) => {
            tracing::error!("order status lookup failed: {}", e);
            return reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            );
        }
    };

    (
        StatusCode::OK,
        rl_headers,
        Json(OrderStatusResponse {
            success: true,
            order_number: lead.lead_number,
            status: lead.status,
        }),
    )
        .into_response()
}
