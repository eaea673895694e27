//! Combines per-scope results and persists daily vitals.

use crate::db::VitalsStore;
use crate::models::{AggregateResult, ScopeResult, VitalsRecord};
use crate::time_utils::format_utc_rfc3339;
use chrono::NaiveDate;
use serde_json::Value;

#[derive(Clone)]
pub struct Aggregator {
    vitals: VitalsStore,
}

impl Aggregator {
    pub fn new(vitals: VitalsStore) -> Self {
        Self { vitals }
    }

    /// Build the aggregate and optionally persist it.
    ///
    /// Status comes from the scope outcomes alone. A failed write only sets
    /// `storage_error`.
    pub async fn finalize(
        &self,
        user_id_hash: &str,
        date: Option<NaiveDate>,
        results: Vec<ScopeResult>,
        persist: bool,
    ) -> AggregateResult {
        let mut aggregate = AggregateResult::from_results(results);

        if persist {
            if let Err(e) = self.persist(user_id_hash, date, &aggregate).await {
                tracing::warn!(user = %user_id_hash, error = %e, "Failed to store vitals");
                aggregate.storage_error = Some(e);
            }
        }

        aggregate
    }

    async fn persist(
        &self,
        user_id_hash: &str,
        date: Option<NaiveDate>,
        aggregate: &AggregateResult,
    ) -> Result<(), String> {
        let date = date.ok_or_else(|| "A date is required to store vitals".to_string())?;

        let record = VitalsRecord {
            user_id_hash: user_id_hash.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            data: Value::Object(aggregate.data()),
            stored_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        self.vitals.insert(&record).await.map_err(|e| e.to_string())?;
        tracing::debug!(user = %user_id_hash, date = %record.date, "Vitals stored");
        Ok(())
    }
}
