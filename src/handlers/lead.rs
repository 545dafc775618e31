//! Internal lead endpoints: status transitions and lookups for the back
//! office. The acting user comes from the upstream auth layer via X-User-Id.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::entities::{leads, prelude::*};
use crate::handlers::auth::require_user_id;
use crate::models::error::{ErrorResponse, CONCURRENT_UPDATE};
use crate::models::lead::{LeadResponse, UpdateStatusRequest, UpdateStatusResponse};
use crate::services::lead_status::{transition, LeadStatus, TransitionError};
use crate::services::rate_limit::rate_limit_headers;
use crate::AppState;

fn respond<T: Serialize>(status: StatusCode, headers: HeaderMap, body: T) -> Response {
    (status, headers, Json(body)).into_response()
}

pub async fn get_lead(
    State(state): State<AppState>,
    Path(lead_number): Path<String>,
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

    match Leads::find()
        .filter(leads::Column::LeadNumber.eq(&lead_number))
        .one(&*state.db)
        .await
    {
        Ok(Some(lead)) => respond(StatusCode::OK, rl_headers, LeadResponse::from(&lead)),
        Ok(None) => respond(
            StatusCode::NOT_FOUND,
            rl_headers,
            ErrorResponse::message("Unknown lead"),
        ),
        Err(e) => {
            tracing::error!("lead lookup failed for {}: {}", lead_number, e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            )
        }
    }
}

pub async fn update_lead_status(
    State(state): State<AppState>,
    Path(lead_number): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateStatusRequest>,
) -> Response {
    let user_id = match require_user_id(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let decision = state.rate_limits.status_update.check(&user_id.to_string());
    let rl_headers = rate_limit_headers(&decision);
    if !decision.allowed {
        return respond(
            StatusCode::TOO_MANY_REQUESTS,
            rl_headers,
            ErrorResponse::rate_limited(&decision),
        );
    }

    let Some(target) = LeadStatus::parse(payload.status.trim()) else {
        return respond(
            StatusCode::BAD_REQUEST,
            rl_headers,
            ErrorResponse::message(format!("Unknown status '{}'", payload.status)),
        );
    };

    let lead = match Leads::find()
        .filter(leads::Column::LeadNumber.eq(&lead_number))
        .one(&*state.db)
        .await
    {
        Ok(Some(lead)) => lead,
        Ok(None) => {
            return respond(
                StatusCode::NOT_FOUND,
                rl_headers,
                ErrorResponse::message("Unknown lead"),
            )
        }
        Err(e) => {
            tracing::error!("lead lookup failed for {}: {}", lead_number, e);
            return respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            );
        }
    };

    match transition(&*state.db, &state.postbacks, &lead, target).await {
        Ok(updated) => respond(
            StatusCode::OK,
            rl_headers,
            UpdateStatusResponse {
                success: true,
                lead: LeadResponse::from(&updated),
            },
        ),
        Err(TransitionError::InvalidTransition { from, to }) => respond(
            StatusCode::BAD_REQUEST,
            rl_headers,
            ErrorResponse::message(format!("Cannot move lead from {} to {}", from, to)),
        ),
        Err(TransitionError::Conflict) => respond(
            StatusCode::CONFLICT,
            rl_headers,
            ErrorResponse::with_code(
                CONCURRENT_UPDATE,
                "Lead status changed concurrently; reload and retry",
            ),
        ),
        Err(TransitionError::Db(e)) => {
            tracing::error!("status transition failed for {}: {}", lead_number, e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                rl_headers,
                ErrorResponse::internal(),
            )
        }
    }
}
