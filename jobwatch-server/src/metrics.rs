//! Failure metrics
//!
//! Counts failed-job observations per (database, job). A job that stays
//! failed is counted again on every poll that sees it, so a counter measures
//! observations, not incidents. Counters only ever grow.

use jobwatch_core::dto::metrics::FailureCount;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Key of a failure counter
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FailureKey {
    pub database_name: String,
    pub job_name: String,
}

/// Process-wide failure counters
#[derive(Debug, Default)]
pub struct FailureMetrics {
    counters: Mutex<BTreeMap<FailureKey, u64>>,
}

impl FailureMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation of a failed job
    pub fn record_failure(&self, database_name: &str, job_name: &str) {
        let key = FailureKey {
            database_name: database_name.to_string(),
            job_name: job_name.to_string(),
        };
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        *counters.entry(key).or_insert(0) += 1;
    }

    /// Copy of every counter
    pub fn snapshot(&self) -> BTreeMap<FailureKey, u64> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot flattened for export, ordered by database then job
    pub fn failure_counts(&self) -> Vec<FailureCount> {
        self.snapshot()
            .into_iter()
            .map(|(key, count)| FailureCount {
                database_name: key.database_name,
                job_name: key.job_name,
                count,
            })
            .collect()
    }
}
