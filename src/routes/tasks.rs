// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduler-triggered bulk jobs.
//!
//! These endpoints are called by Cloud Scheduler, guarded by
//! [`require_scheduler_token`](crate::middleware::scheduler_auth::require_scheduler_token).

use crate::error::{AppError, Result};
use crate::models::{BulkStatus, BulkSummary};
use crate::routes::validated;
use crate::time_utils::parse_date;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/refresh-all-tokens", post(refresh_all_tokens))
        .route("/tasks/daily-vitals", post(daily_vitals))
}

fn summary_status(summary: &BulkSummary) -> StatusCode {
    match summary.status {
        BulkStatus::AllOk => StatusCode::OK,
        BulkStatus::Partial => StatusCode::PARTIAL_CONTENT,
        BulkStatus::AllFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Refresh every stored user's token pair.
async fn refresh_all_tokens(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<BulkSummary>)> {
    let summary = state.bulk.refresh_all().await?;
    Ok((summary_status(&summary), Json(summary)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DailyVitalsRequest {
    #[validate(length(equal = 10, message = "date must be YYYY-MM-DD"))]
    pub date: String,
}

/// Fetch and store one day of vitals for every stored user.
async fn daily_vitals(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<DailyVitalsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BulkSummary>)> {
    let request = validated(payload)?;
    let date = parse_date(&request.date)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date '{}'", request.date)))?;

    let summary = state.bulk.fetch_all(date).await?;
    Ok((summary_status(&summary), Json(summary)))
}
