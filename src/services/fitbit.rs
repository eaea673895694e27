// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit API client and token lifecycle.
//!
//! Handles:
//! - OAuth code exchange and token refresh
//! - Per-scope data queries with normalized status classes
//! - Retry on 401 after refreshing the user's token
//! - Per-user locking so concurrent refreshes do not race

use crate::config::Config;
use crate::error::AppError;
use crate::models::DataScope;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Fitbit API client.
#[derive(Clone)]
pub struct FitbitClient {
    http: reqwest::Client,
    /// Caps vendor requests in flight across the process
    limiter: Arc<Semaphore>,
    base_url: String,
    authorization_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
}

impl FitbitClient {
    /// Create a new Fitbit client from configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            base_url: config.fitbit_api_url.trim_end_matches('/').to_string(),
            authorization_url: config.authorization_url.clone(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.oauth_scope.clone(),
        })
    }

    /// URL of the Fitbit consent page for the given `state`.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.authorization_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scope),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
        .map_err(AppError::FitbitApi)
    }

    /// Trade a refresh token for a new token pair.
    ///
    /// Fitbit refresh tokens are single-use: the returned pair replaces the
    /// stored one.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ])
        .await
        .map_err(AppError::TokenRefresh)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, String> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| format!("Request limiter closed: {}", e))?;

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(ACCEPT, "application/json")
            .header("accept-locale", "en_US")
            .header(ACCEPT_LANGUAGE, "metric")
            .form(form)
            .send()
            .await
            .map_err(|e| format!("Token request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                tracing::warn!("Fitbit rate limit hit on token endpoint (429)");
            }
            return Err(format!("HTTP {}: {}", status, body));
        }

        response
            .json()
            .await
            .map_err(|e| format!("JSON parse error: {}", e))
    }

    /// Query handler bound to one user's access token.
    pub fn query_handler(&self, token: String) -> FitbitQueryHandler {
        FitbitQueryHandler {
            http: self.http.clone(),
            limiter: self.limiter.clone(),
            base_url: self.base_url.clone(),
            token,
        }
    }
}

/// Token response from the Fitbit OAuth endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Fitbit encoded user id
    pub user_id: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("user_id", &self.user_id)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Normalized status class of a data query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Ok,
    Unauthorized,
    BadRequest,
    /// Any other 4xx, including 429
    OtherClientError,
    /// 5xx, transport faults and unusable 2xx bodies
    ServerError,
}

impl QueryStatus {
    pub fn from_http(status: u16) -> Self {
        match status {
            200..=299 => QueryStatus::Ok,
            401 => QueryStatus::Unauthorized,
            400 => QueryStatus::BadRequest,
            402..=499 => QueryStatus::OtherClientError,
            _ => QueryStatus::ServerError,
        }
    }
}

/// Result of one data query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub status: QueryStatus,
    /// Parsed body on success; error body (or `{"error": text}`) otherwise
    pub payload: Value,
}

impl QueryResponse {
    fn server_error(message: impl Into<String>) -> Self {
        Self {
            status: QueryStatus::ServerError,
            payload: json!({ "error": message.into() }),
        }
    }
}

/// Issues data queries for one user.
pub struct FitbitQueryHandler {
    http: reqwest::Client,
    limiter: Arc<Semaphore>,
    base_url: String,
    token: String,
}

impl FitbitQueryHandler {
    /// Replace the bearer token used for subsequent queries.
    pub fn update_token(&mut self, token: String) {
        self.token = token;
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Fetch one scope.
    ///
    /// Unknown scopes and missing dates are caller errors and never reach
    /// the network. Every vendor-side failure comes back as a
    /// [`QueryResponse`] with a non-`Ok` status.
    pub async fn fetch(
        &self,
        scope_name: &str,
        date: Option<NaiveDate>,
    ) -> Result<QueryResponse, AppError> {
        let scope = DataScope::from_name(scope_name)
            .ok_or_else(|| AppError::InvalidScope(scope_name.to_string()))?;
        let path = scope.path(date).ok_or_else(|| AppError::MissingParameter {
            scope: scope_name.to_string(),
            param: "date",
        })?;
        let url = format!("{}{}", self.base_url, path);

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Request limiter closed: {}", e)))?;

        let response = match self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT_LANGUAGE, "en_US")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(scope = scope_name, error = %e, "Fitbit request failed");
                return Ok(QueryResponse::server_error(format!("Request failed: {}", e)));
            }
        };

        let http_status = response.status().as_u16();
        let status = QueryStatus::from_http(http_status);
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(QueryResponse::server_error(format!("Body read failed: {}", e))),
        };

        if status != QueryStatus::Ok {
            tracing::debug!(scope = scope_name, http_status, ?status, "Fitbit query rejected");
            let payload =
                serde_json::from_str(&body).unwrap_or_else(|_| json!({ "error": body }));
            return Ok(QueryResponse { status, payload });
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(payload) if scope.endpoint().shape.matches(&payload) => Ok(QueryResponse {
                status: QueryStatus::Ok,
                payload,
            }),
            Ok(_) => Ok(QueryResponse::server_error(format!(
                "Unexpected response shape for {}",
                scope_name
            ))),
            Err(e) => Ok(QueryResponse::server_error(format!("JSON parse error: {}", e))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FitbitService - Token lifecycle and multi-scope fetches
// ─────────────────────────────────────────────────────────────────────────────

use crate::db::{CredentialStore, StoreError};
use crate::models::{AggregateResult, ScopeOutcome, ScopeResult};
use crate::services::aggregator::Aggregator;
use crate::services::cipher::hash_user_id;
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Upper bound on requests issued for a single scope.
pub const MAX_ATTEMPTS: u32 = 3;

/// Shared refresh locks, keyed by hashed user id.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Result of a completed OAuth callback.
#[derive(Debug, Clone)]
pub struct OAuthResult {
    pub user_id_hash: String,
    pub is_new_user: bool,
}

/// High-level Fitbit service that manages the token lifecycle.
///
/// This service encapsulates:
/// - Credential lookup and decryption
/// - Sequential per-scope fetches with bounded retry on 401
/// - Token refresh, serialized per user, with the new pair persisted
/// - Handing results to the [`Aggregator`]
#[derive(Clone)]
pub struct FitbitService {
    client: FitbitClient,
    credentials: CredentialStore,
    aggregator: Aggregator,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl FitbitService {
    pub fn new(
        client: FitbitClient,
        credentials: CredentialStore,
        aggregator: Aggregator,
        refresh_locks: RefreshLocks,
    ) -> Self {
        Self {
            client,
            credentials,
            aggregator,
            refresh_locks,
        }
    }

    pub fn client(&self) -> &FitbitClient {
        &self.client
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    // ─── Data Fetching ───────────────────────────────────────────────────────

    /// Fetch the requested scopes for a user and aggregate the results.
    ///
    /// Only a missing or unreadable credential fails the call; every
    /// per-scope failure is folded into the returned [`AggregateResult`].
    /// Repeated scope names are fetched once.
    pub async fn fetch_scopes(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
        scopes: &[String],
        persist: bool,
    ) -> Result<AggregateResult, AppError> {
        let record = self.credentials.read(user_id).await?;
        let credential = self.credentials.decode(&record)?;

        Ok(self
            .fetch_for_credential(&record.id, &credential.token, date, scopes, persist)
            .await)
    }

    /// Same as [`FitbitService::fetch_scopes`] for an already decoded credential.
    pub async fn fetch_for_credential(
        &self,
        hash_id: &str,
        token: &str,
        date: Option<NaiveDate>,
        scopes: &[String],
        persist: bool,
    ) -> AggregateResult {
        let mut handler = self.client.query_handler(token.to_string());
        // Set once a refresh fails; later 401s fail without refreshing again
        let mut refresh_error: Option<String> = None;
        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(scopes.len());

        for scope in scopes {
            if !seen.insert(scope.as_str()) {
                continue;
            }
            let result = self
                .fetch_scope(&mut handler, hash_id, scope, date, &mut refresh_error)
                .await;
            results.push(result);
        }

        let aggregate = self.aggregator.finalize(hash_id, date, results, persist).await;

        tracing::info!(
            user = %hash_id,
            status = ?aggregate.status,
            succeeded = aggregate.succeeded(),
            requested = aggregate.results.len(),
            "Vitals fetch complete"
        );

        aggregate
    }

    async fn fetch_scope(
        &self,
        handler: &mut FitbitQueryHandler,
        hash_id: &str,
        scope: &str,
        date: Option<NaiveDate>,
        refresh_error: &mut Option<String>,
    ) -> ScopeResult {
        let mut attempts = 0;

        let outcome = loop {
            let response = match handler.fetch(scope, date).await {
                Ok(response) => response,
                Err(e) => break ScopeOutcome::failure(e.to_string()),
            };
            attempts += 1;

            match response.status {
                QueryStatus::Ok => break ScopeOutcome::Success(response.payload),
                QueryStatus::Unauthorized if attempts < MAX_ATTEMPTS && refresh_error.is_none() => {
                    tracing::info!(user = %hash_id, scope, attempts, "Access token rejected, refreshing");
                    let refreshed = self.refresh_access_token(hash_id, Some(handler.token())).await;
                    match refreshed {
                        Ok(token) => handler.update_token(token),
                        Err(e) => {
                            let message = e.to_string();
                            *refresh_error = Some(message.clone());
                            break ScopeOutcome::failure(message);
                        }
                    }
                }
                QueryStatus::Unauthorized => {
                    break ScopeOutcome::Failure {
                        message: format!(
                            "Unauthorized access. User token has no access to {} data",
                            scope
                        ),
                        details: Some(response.payload),
                    }
                }
                QueryStatus::BadRequest => {
                    break ScopeOutcome::Failure {
                        message: format!("Bad request. Failed to fetch {} data", scope),
                        details: Some(response.payload),
                    }
                }
                QueryStatus::OtherClientError => {
                    break ScopeOutcome::Failure {
                        message: format!("An error occurred while fetching {} data", scope),
                        details: Some(response.payload),
                    }
                }
                QueryStatus::ServerError => {
                    tracing::warn!(user = %hash_id, scope, payload = %response.payload, "Fitbit server error");
                    break ScopeOutcome::failure(format!(
                        "An error occurred while fetching {} data",
                        scope
                    ));
                }
            }
        };

        ScopeResult {
            scope: scope.to_string(),
            attempts,
            outcome,
        }
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Per-user lock serializing every write of a user's token pair.
    fn lock_for(&self, hash_id: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(hash_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Refresh the access token for a hashed user id and persist the new pair.
    ///
    /// With `stale` set, a stored token that differs from it means another
    /// task already refreshed; that token is returned without a vendor call.
    pub async fn refresh_access_token(
        &self,
        hash_id: &str,
        stale: Option<&str>,
    ) -> Result<String, AppError> {
        let lock = self.lock_for(hash_id);
        let _guard = lock.lock().await;

        let record = self.credentials.read_by_hash(hash_id).await?;
        let credential = self.credentials.decode(&record)?;

        if let Some(stale) = stale {
            if credential.token != stale {
                tracing::debug!(user = %hash_id, "Token already refreshed by another task");
                return Ok(credential.token);
            }
        }

        let tokens = self.client.refresh_token(&credential.refresh_token).await?;
        self.credentials
            .update(hash_id, &tokens.access_token, &tokens.refresh_token)
            .await?;

        tracing::info!(user = %hash_id, "Token refreshed");
        Ok(tokens.access_token)
    }

    /// Refresh the token of a user identified by raw id.
    pub async fn refresh_user(&self, user_id: &str) -> Result<(), AppError> {
        let record = self.credentials.read(user_id).await?;
        self.refresh_access_token(&record.id, None).await?;
        Ok(())
    }

    // ─── OAuth & Revocation ──────────────────────────────────────────────────

    /// Exchange an authorization code and store the resulting credential.
    ///
    /// A user that connects again has their token pair replaced.
    pub async fn handle_oauth_callback(&self, code: &str) -> Result<OAuthResult, AppError> {
        let tokens = self.client.exchange_code(code).await?;
        let user_id = tokens
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::FitbitApi("Token response missing user_id".to_string()))?;
        let user_id_hash = hash_user_id(user_id);

        // An in-flight refresh must not overwrite the new pair
        let lock = self.lock_for(&user_id_hash);
        let _guard = lock.lock().await;

        let is_new_user = match self
            .credentials
            .insert(user_id, &tokens.access_token, &tokens.refresh_token)
            .await
        {
            Ok(()) => true,
            Err(StoreError::DuplicateKey(_)) => {
                self.credentials
                    .update(&user_id_hash, &tokens.access_token, &tokens.refresh_token)
                    .await?;
                false
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user = %user_id_hash, is_new_user, "OAuth complete");
        Ok(OAuthResult {
            user_id_hash,
            is_new_user,
        })
    }

    /// Delete the stored credential for a user.
    pub async fn revoke(&self, user_id: &str) -> Result<(), AppError> {
        self.credentials.delete(user_id).await?;
        self.refresh_locks.remove(&hash_user_id(user_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_status_from_http() {
        assert_eq!(QueryStatus::from_http(200), QueryStatus::Ok);
        assert_eq!(QueryStatus::from_http(204), QueryStatus::Ok);
        assert_eq!(QueryStatus::from_http(401), QueryStatus::Unauthorized);
        assert_eq!(QueryStatus::from_http(400), QueryStatus::BadRequest);
        assert_eq!(QueryStatus::from_http(403), QueryStatus::OtherClientError);
        assert_eq!(QueryStatus::from_http(429), QueryStatus::OtherClientError);
        assert_eq!(QueryStatus::from_http(500), QueryStatus::ServerError);
        assert_eq!(QueryStatus::from_http(503), QueryStatus::ServerError);
        assert_eq!(QueryStatus::from_http(302), QueryStatus::ServerError);
    }

    #[test]
    fn test_authorization_url() {
        let client = FitbitClient::new(&Config::test_default()).unwrap();
        let url = client.authorization_url("abc|def");

        assert!(url.starts_with("https://www.fitbit.com/oauth2/authorize?response_type=code"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback"));
        assert!(url.contains("state=abc%7Cdef"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_caller_errors_offline() {
        let client = FitbitClient::new(&Config::test_default()).unwrap();
        let handler = client.query_handler("token".to_string());

        assert!(matches!(
            handler.fetch("steps", None).await,
            Err(AppError::InvalidScope(_))
        ));
        assert!(matches!(
            handler.fetch("sleep", None).await,
            Err(AppError::MissingParameter { param: "date", .. })
        ));
    }

    #[test]
    fn test_token_response_debug_hides_tokens() {
        let tokens = TokenResponse {
            user_id: Some("ABC".to_string()),
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_in: Some(28800),
        };
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("secret"));
    }
}
