// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user routes: token refresh, revocation and vitals queries.

use crate::error::{AppError, Result};
use crate::models::{AggregateResult, DataScope, OverallStatus};
use crate::routes::validated;
use crate::time_utils::parse_date;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/refresh-token", post(refresh_token))
        .route("/credentials/{user_id}", delete(revoke_credentials))
        .route("/user-info", get(user_info))
        .route("/vitals", post(get_vitals))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Map an aggregate to its HTTP status.
///
/// A full success whose storage failed is reported as partial content.
pub fn aggregate_status(aggregate: &AggregateResult) -> StatusCode {
    match aggregate.status {
        OverallStatus::Success if aggregate.storage_error.is_none() => StatusCode::OK,
        OverallStatus::Success | OverallStatus::Partial => StatusCode::PARTIAL_CONTENT,
        OverallStatus::Failure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ─── Tokens ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct UserRequest {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
}

/// Refresh one user's token pair.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>> {
    let request = validated(payload)?;
    state.fitbit.refresh_user(&request.user_id).await?;
    Ok(Json(StatusResponse {
        status: "refreshed",
    }))
}

/// Delete a user's stored credential.
async fn revoke_credentials(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<StatusResponse>> {
    state.fitbit.revoke(&user_id).await?;
    tracing::info!("Credential revoked");
    Ok(Json(StatusResponse { status: "deleted" }))
}

// ─── Vitals ──────────────────────────────────────────────────

/// Paired devices for a user.
async fn user_info(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<UserRequest>, QueryRejection>,
) -> Result<(StatusCode, Json<AggregateResult>)> {
    let Query(params) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scopes = [DataScope::UserInfo.name().to_string()];
    let aggregate = state
        .fitbit
        .fetch_scopes(&params.user_id, None, &scopes, false)
        .await?;

    Ok((aggregate_status(&aggregate), Json(aggregate)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct VitalsRequest {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
    /// YYYY-MM-DD; required by every scope except `user_info`
    #[serde(default)]
    pub date: Option<String>,
    #[validate(length(min = 1, message = "scope must not be empty"))]
    pub scope: Vec<String>,
    #[serde(default)]
    pub db_storage: bool,
}

/// Fetch several scopes for one user, optionally storing the result.
async fn get_vitals(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<VitalsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AggregateResult>)> {
    let request = validated(payload)?;

    let date = match request.date.as_deref() {
        Some(raw) => Some(
            parse_date(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid date '{}'", raw)))?,
        ),
        None => None,
    };
    if request.db_storage && date.is_none() {
        return Err(AppError::BadRequest(
            "db_storage requires a date".to_string(),
        ));
    }

    let aggregate = state
        .fitbit
        .fetch_scopes(&request.user_id, date, &request.scope, request.db_storage)
        .await?;

    Ok((aggregate_status(&aggregate), Json(aggregate)))
}
