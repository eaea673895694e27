// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod bulk;
pub mod credential;
pub mod scope;
pub mod vitals;

pub use bulk::{BulkFailure, BulkStatus, BulkSummary, UserOutcome};
pub use credential::{CredentialRecord, DecodedCredential};
pub use scope::{DataScope, EndpointDescriptor, ResponseShape, DAILY_SCOPES};
pub use vitals::{AggregateResult, OverallStatus, ScopeOutcome, ScopeResult, VitalsRecord};
