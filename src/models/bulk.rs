//! Summary of bulk operations across all stored users.

use serde::Serialize;

/// Outcome class of a bulk operation at user granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkStatus {
    AllOk,
    Partial,
    AllFailed,
}

/// A user that did not fully succeed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkFailure {
    /// Hashed user id
    pub user: String,
    pub error: String,
}

/// Counts per user for a bulk run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkSummary {
    pub status: BulkStatus,
    pub total: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub failures: Vec<BulkFailure>,
}

/// Per-user result fed into [`BulkSummary::from_outcomes`].
#[derive(Debug, Clone, PartialEq)]
pub enum UserOutcome {
    Succeeded,
    Partial(BulkFailure),
    Failed(BulkFailure),
}

impl BulkSummary {
    pub fn from_outcomes(outcomes: Vec<UserOutcome>) -> Self {
        let total = outcomes.len();
        let mut succeeded = 0;
        let mut partial = 0;
        let mut failures = Vec::new();

        for outcome in outcomes {
            match outcome {
                UserOutcome::Succeeded => succeeded += 1,
                UserOutcome::Partial(failure) => {
                    partial += 1;
                    failures.push(failure);
                }
                UserOutcome::Failed(failure) => failures.push(failure),
            }
        }

        let status = if total > 0 && succeeded == total {
            BulkStatus::AllOk
        } else if succeeded + partial > 0 {
            BulkStatus::Partial
        } else {
            BulkStatus::AllFailed
        };

        Self {
            status,
            total,
            succeeded,
            partial,
            failed: total - succeeded - partial,
            failures,
        }
    }
}
