// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregator;
pub mod bulk;
pub mod cipher;
pub mod fitbit;

pub use aggregator::Aggregator;
pub use bulk::BulkOrchestrator;
pub use cipher::DataCipher;
pub use fitbit::{FitbitClient, FitbitService, OAuthResult, QueryStatus};
