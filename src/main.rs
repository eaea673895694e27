// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vitals-Retriever API Server
//!
//! Connects Fitbit accounts and retrieves their daily vitals on demand or
//! from scheduled bulk jobs.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitals_retriever::{
    config::{Config, StorageBackend},
    db::{DocumentStore, FirestoreDb, MemoryCollection},
    models::{CredentialRecord, VitalsRecord},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Vitals-Retriever API");

    let (credentials, vitals): (
        Arc<dyn DocumentStore<CredentialRecord>>,
        Arc<dyn DocumentStore<VitalsRecord>>,
    ) = match config.storage_backend {
        StorageBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            (
                Arc::new(db.collection(&config.users_collection)),
                Arc::new(db.collection(&config.vitals_collection)),
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            (
                Arc::new(MemoryCollection::new()),
                Arc::new(MemoryCollection::new()),
            )
        }
    };

    if config.scheduler_token.is_none() {
        tracing::warn!("SCHEDULER_TOKEN not set; /tasks routes are unauthenticated");
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), credentials, vitals)?);

    // Build router
    let app = vitals_retriever::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vitals_retriever=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
