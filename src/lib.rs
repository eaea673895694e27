// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vitals-Retriever: daily health vitals from the Fitbit Web API
//!
//! This crate provides the backend API for connecting Fitbit accounts,
//! keeping their OAuth tokens fresh, and fetching and storing vitals.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{CredentialStore, DocumentStore, VitalsStore};
use models::{CredentialRecord, VitalsRecord};
use services::{Aggregator, BulkOrchestrator, DataCipher, FitbitClient, FitbitService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub fitbit: FitbitService,
    pub bulk: BulkOrchestrator,
}

impl AppState {
    /// Wire services over the given storage backends.
    pub fn new(
        config: Config,
        credentials: Arc<dyn DocumentStore<CredentialRecord>>,
        vitals: Arc<dyn DocumentStore<VitalsRecord>>,
    ) -> Result<Self, error::AppError> {
        let cipher = DataCipher::new(&config.cipher_key)?;
        let credentials = CredentialStore::new(credentials, cipher);
        let aggregator = Aggregator::new(VitalsStore::new(vitals));
        let client = FitbitClient::new(&config)?;

        let fitbit = FitbitService::new(
            client,
            credentials,
            aggregator,
            Arc::new(dashmap::DashMap::new()),
        );
        let bulk = BulkOrchestrator::new(fitbit.clone(), config.bulk_concurrency);

        Ok(Self {
            config,
            fitbit,
            bulk,
        })
    }
}
