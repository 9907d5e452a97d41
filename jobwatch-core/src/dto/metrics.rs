//! Metrics DTOs

use serde::{Deserialize, Serialize};

/// One failure counter in a metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCount {
    pub database_name: String,
    pub job_name: String,
    pub count: u64,
}
