// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod tasks;
pub mod vitals;

use crate::error::{AppError, Result};
use crate::middleware::scheduler_auth::require_scheduler_token;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use validator::Validate;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Unwrap and validate a JSON body; any problem is a 400.
pub(crate) fn validated<T: Validate>(
    payload: std::result::Result<Json<T>, JsonRejection>,
) -> Result<T> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(body)
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(vitals::routes());

    // Scheduler routes (shared token when configured)
    let scheduler_routes = tasks::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_scheduler_token,
    ));

    Router::new()
        .merge(public_routes)
        .merge(scheduler_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
