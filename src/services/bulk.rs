// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk jobs run by the scheduler across every stored user.
//!
//! Users are processed with a bounded number in flight. A failure for one
//! user is recorded in the summary and never stops the batch.

use crate::error::AppError;
use crate::models::{
    BulkFailure, BulkSummary, CredentialRecord, OverallStatus, UserOutcome, DAILY_SCOPES,
};
use crate::services::fitbit::FitbitService;
use chrono::NaiveDate;
use futures_util::{stream, StreamExt};

pub struct BulkOrchestrator {
    fitbit: FitbitService,
    concurrency: usize,
}

impl BulkOrchestrator {
    pub fn new(fitbit: FitbitService, concurrency: usize) -> Self {
        Self {
            fitbit,
            concurrency: concurrency.max(1),
        }
    }

    /// Refresh the token pair of every stored user.
    pub async fn refresh_all(&self) -> Result<BulkSummary, AppError> {
        let records = self.fitbit.credentials().list_all().await?;
        tracing::info!(users = records.len(), "Refreshing all tokens");

        let outcomes = stream::iter(records)
            .map(|record| async move {
                match self.fitbit.refresh_access_token(&record.id, None).await {
                    Ok(_) => UserOutcome::Succeeded,
                    Err(e) => {
                        tracing::warn!(user = %record.id, error = %e, "Token refresh failed");
                        UserOutcome::Failed(BulkFailure {
                            user: record.id,
                            error: e.to_string(),
                        })
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let summary = BulkSummary::from_outcomes(outcomes);
        log_summary("refresh_all", &summary);
        Ok(summary)
    }

    /// Fetch and store the daily vitals of every stored user.
    pub async fn fetch_all(&self, date: NaiveDate) -> Result<BulkSummary, AppError> {
        let records = self.fitbit.credentials().list_all().await?;
        tracing::info!(users = records.len(), %date, "Fetching daily vitals");

        let scopes: Vec<String> = DAILY_SCOPES.iter().map(|s| s.name().to_string()).collect();
        let scopes = &scopes;

        let outcomes = stream::iter(records)
            .map(|record| async move { self.fetch_user(record, date, scopes).await })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let summary = BulkSummary::from_outcomes(outcomes);
        log_summary("fetch_all", &summary);
        Ok(summary)
    }

    async fn fetch_user(
        &self,
        record: CredentialRecord,
        date: NaiveDate,
        scopes: &[String],
    ) -> UserOutcome {
        let credential = match self.fitbit.credentials().decode(&record) {
            Ok(credential) => credential,
            Err(e) => {
                tracing::error!(user = %record.id, error = %e, "Cannot decode credential");
                return UserOutcome::Failed(BulkFailure {
                    user: record.id,
                    error: AppError::from(e).to_string(),
                });
            }
        };

        let aggregate = self
            .fitbit
            .fetch_for_credential(&record.id, &credential.token, Some(date), scopes, true)
            .await;

        if aggregate.status == OverallStatus::Success && aggregate.storage_error.is_none() {
            return UserOutcome::Succeeded;
        }

        let failed_scopes: Vec<&str> = aggregate
            .results
            .iter()
            .filter(|r| !r.outcome.is_success())
            .map(|r| r.scope.as_str())
            .collect();
        let mut error = if failed_scopes.is_empty() {
            String::new()
        } else {
            format!("Failed scopes: {}", failed_scopes.join(", "))
        };
        if let Some(storage_error) = &aggregate.storage_error {
            if !error.is_empty() {
                error.push_str("; ");
            }
            error.push_str(&format!("Storage failed: {}", storage_error));
        }

        let failure = BulkFailure {
            user: record.id,
            error,
        };
        if aggregate.succeeded() > 0 {
            UserOutcome::Partial(failure)
        } else {
            UserOutcome::Failed(failure)
        }
    }
}

fn log_summary(job: &'static str, summary: &BulkSummary) {
    tracing::info!(
        job,
        status = ?summary.status,
        total = summary.total,
        succeeded = summary.succeeded,
        partial = summary.partial,
        failed = summary.failed,
        "Bulk job complete"
    );
}
