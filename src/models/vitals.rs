// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregated vitals results and the stored vitals record.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Overall status of a multi-item operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    /// Every item succeeded
    Success,
    /// At least one item succeeded and at least one failed
    Partial,
    /// No item succeeded
    Failure,
}

impl OverallStatus {
    /// Classify `succeeded` out of `total` items.
    pub fn classify(succeeded: usize, total: usize) -> Self {
        if total > 0 && succeeded == total {
            OverallStatus::Success
        } else if succeeded > 0 {
            OverallStatus::Partial
        } else {
            OverallStatus::Failure
        }
    }
}

/// Final outcome for a single scope after all attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeOutcome {
    Success(Value),
    Failure {
        message: String,
        /// Body returned by Fitbit for client errors, if any
        details: Option<Value>,
    },
}

impl ScopeOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        ScopeOutcome::Failure {
            message: message.into(),
            details: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScopeOutcome::Success(_))
    }

    /// Payload on success, `{"error": ...}` on failure.
    pub fn to_json(&self) -> Value {
        match self {
            ScopeOutcome::Success(payload) => payload.clone(),
            ScopeOutcome::Failure {
                message,
                details: Some(details),
            } => json!({ "error": message, "details": details }),
            ScopeOutcome::Failure { message, .. } => json!({ "error": message }),
        }
    }
}

/// Result for one requested scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeResult {
    /// Scope name as requested (may be unknown)
    pub scope: String,
    /// Number of Fitbit requests issued for this scope
    pub attempts: u32,
    pub outcome: ScopeOutcome,
}

/// Combined per-scope results of a vitals request.
///
/// Holds exactly one entry per distinct requested scope.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub status: OverallStatus,
    pub results: Vec<ScopeResult>,
    /// Set when persisting to the vitals store failed; never affects `status`
    pub storage_error: Option<String>,
}

impl AggregateResult {
    pub fn from_results(results: Vec<ScopeResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
        Self {
            status: OverallStatus::classify(succeeded, results.len()),
            results,
            storage_error: None,
        }
    }

    pub fn get(&self, scope: &str) -> Option<&ScopeResult> {
        self.results.iter().find(|r| r.scope == scope)
    }

    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.is_success())
            .count()
    }

    /// Scope name to payload-or-error map.
    pub fn data(&self) -> Map<String, Value> {
        self.results
            .iter()
            .map(|r| (r.scope.clone(), r.outcome.to_json()))
            .collect()
    }
}

impl Serialize for AggregateResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            status: OverallStatus,
            data: Map<String, Value>,
            #[serde(skip_serializing_if = "Option::is_none")]
            storage_error: Option<&'a str>,
        }

        Wire {
            status: self.status,
            data: self.data(),
            storage_error: self.storage_error.as_deref(),
        }
        .serialize(serializer)
    }
}

/// Vitals stored in the vitals collection, one document per (user, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsRecord {
    /// SHA-256 hex of the raw user id
    pub user_id_hash: String,
    /// Date the vitals cover (YYYY-MM-DD)
    pub date: String,
    /// Scope name to payload-or-error map
    pub data: Value,
    /// When the record was written (RFC 3339)
    pub stored_at: String,
}

impl VitalsRecord {
    /// Document ID: `{user_id_hash}_{date}`.
    pub fn document_id(user_id_hash: &str, date: &str) -> String {
        format!("{}_{}", user_id_hash, date)
    }
}
