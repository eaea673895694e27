// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use vitals_retriever::config::Config;
use vitals_retriever::db::{DocumentStore, FirestoreDb, MemoryCollection};
use vitals_retriever::models::{CredentialRecord, VitalsRecord};
use vitals_retriever::routes::create_router;
use vitals_retriever::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Config whose Fitbit API and token endpoint point at a mock server.
#[allow(dead_code)]
pub fn test_config(server_url: &str) -> Config {
    let mut config = Config::test_default();
    config.fitbit_api_url = server_url.to_string();
    config.token_url = format!("{}/oauth2/token", server_url);
    config
}

/// A wired application over in-memory stores.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub credentials: Arc<MemoryCollection<CredentialRecord>>,
    pub vitals: Arc<MemoryCollection<VitalsRecord>>,
}

/// Create a test app with in-memory stores.
#[allow(dead_code)]
pub fn create_test_app(config: Config) -> TestApp {
    let credentials = Arc::new(MemoryCollection::<CredentialRecord>::new());
    let vitals = Arc::new(MemoryCollection::<VitalsRecord>::new());
    let state = Arc::new(
        AppState::new(config, credentials.clone(), vitals.clone())
            .expect("Failed to build app state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        credentials,
        vitals,
    }
}

/// Create a test app whose vitals store is unreachable.
#[allow(dead_code)]
pub fn create_test_app_offline_vitals(config: Config) -> (axum::Router, Arc<AppState>) {
    let credentials: Arc<dyn DocumentStore<CredentialRecord>> = Arc::new(MemoryCollection::new());
    let vitals: Arc<dyn DocumentStore<VitalsRecord>> =
        Arc::new(FirestoreDb::new_mock().collection("vitals"));
    let state = Arc::new(
        AppState::new(config, credentials, vitals).expect("Failed to build app state"),
    );
    (create_router(state.clone()), state)
}

/// Store a credential for a raw user id.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, user_id: &str, token: &str, refresh_token: &str) {
    state
        .fitbit
        .credentials()
        .insert(user_id, token, refresh_token)
        .await
        .expect("Failed to seed user");
}

/// JSON body returned by the mock token endpoint.
#[allow(dead_code)]
pub fn token_body(user_id: &str, access_token: &str, refresh_token: &str) -> String {
    serde_json::json!({
        "user_id": user_id,
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": 28800,
        "token_type": "Bearer",
    })
    .to_string()
}

/// Endpoint paths for 2024-01-15.
#[allow(dead_code)]
pub mod paths {
    pub const DATE: &str = "2024-01-15";
    pub const USER_INFO: &str = "/1/user/-/devices.json";
    pub const SLEEP: &str = "/1.2/user/-/sleep/date/2024-01-15.json";
    pub const HEART_RATE: &str = "/1/user/-/activities/heart/date/2024-01-15/1d/1sec.json";
    pub const HRV: &str = "/1/user/-/hrv/date/2024-01-15/all.json";
    pub const BREATHING_RATE: &str = "/1/user/-/br/date/2024-01-15/all.json";
    pub const SPO2: &str = "/1/user/-/spo2/date/2024-01-15/all.json";
    pub const ACTIVITY: &str = "/1/user/-/activities/steps/date/2024-01-15/1d/1min.json";
    pub const TOKEN: &str = "/oauth2/token";

    pub const DAILY: [&str; 6] = [SLEEP, HEART_RATE, HRV, BREATHING_RATE, SPO2, ACTIVITY];
}
