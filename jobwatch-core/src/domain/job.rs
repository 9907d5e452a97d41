//! Job domain types

use serde::{Deserialize, Serialize};

/// A job row read from a remote database
///
/// `hostname` comes from the server's identity query, not from the jobs
/// table. `last_run` is passed through in the server's own format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub hostname: String,
    pub database_name: String,
    pub job_name: String,
    pub status: JobStatus,
    pub last_run: Option<String>,
}

/// Job status as reported by the remote database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl JobStatus {
    /// Maps a status column value, ignoring case and surrounding whitespace
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => JobStatus::Running,
            "succeeded" | "success" | "completed" => JobStatus::Succeeded,
            "failed" | "failure" | "error" => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Succeeded => write!(f, "Succeeded"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A failed job seen by the background checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedJob {
    pub job_name: String,
    pub status: JobStatus,
}
