// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit OAuth connection routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed `state` stays valid (10 minutes).
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/connect", get(connect))
        .route("/callback", get(callback))
}

/// Start OAuth flow - redirect to the Fitbit consent page.
async fn connect(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let oauth_state = sign_state(&state.config.oauth_state_key, now_millis()?)?;
    let auth_url = state.fitbit.client().authorization_url(&oauth_state);

    tracing::info!(
        client_id = %state.config.client_id,
        "Starting OAuth flow, redirecting to Fitbit"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub status: &'static str,
    /// Hashed user id
    pub user: String,
    pub new_user: bool,
}

/// OAuth callback - exchange code for tokens and store the credential.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Fitbit");
        return Err(AppError::BadRequest(format!("Authorization failed: {}", error)));
    }

    let oauth_state = params
        .state
        .ok_or_else(|| AppError::BadRequest("Missing state".to_string()))?;
    if !verify_state(&oauth_state, &state.config.oauth_state_key, now_millis()?) {
        tracing::warn!("Invalid, expired or tampered state parameter");
        return Err(AppError::BadRequest("Invalid state".to_string()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");
    let result = state.fitbit.handle_oauth_callback(&code).await?;

    Ok(Json(CallbackResponse {
        status: "connected",
        user: result.user_id_hash,
        new_user: result.is_new_user,
    }))
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Build a signed `state`: base64("nonce_hex|timestamp_hex|signature_hex").
fn sign_state(secret: &[u8], timestamp_ms: u128) -> Result<String> {
    let mut nonce = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let payload = format!("{}|{:x}", hex::encode(nonce), timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify the HMAC signature and age of an OAuth `state` parameter.
fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> bool {
    let Some(state_str) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let &[nonce_hex, timestamp_hex, signature_hex] = parts.as_slice() else {
        return false;
    };

    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{}|{}", nonce_hex, timestamp_hex).as_bytes());

    // verify_slice compares in constant time
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    match u128::from_str_radix(timestamp_hex, 16) {
        Ok(issued) => issued <= now_ms && now_ms - issued <= STATE_MAX_AGE_MS,
        Err(_) => false,
    }
}
