// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Scheduler authentication middleware.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the scheduler's shared secret.
pub const SCHEDULER_TOKEN_HEADER: &str = "x-scheduler-token";

/// Require the scheduler token on `/tasks/*` routes when one is configured.
pub async fn require_scheduler_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.scheduler_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(SCHEDULER_TOKEN_HEADER)
        .map(|h| h.as_bytes())
        .unwrap_or_default();

    if !bool::from(provided.ct_eq(expected.as_bytes())) {
        tracing::warn!(
            path = %request.uri().path(),
            "Blocked tasks request with missing or invalid scheduler token"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
