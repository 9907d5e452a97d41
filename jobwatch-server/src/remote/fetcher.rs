//! Job status fetcher
//!
//! Runs the fixed job queries against an open connection and maps the rows
//! into job records. Every query is bounded by the fetcher's timeout.

use jobwatch_core::domain::job::{FailedJob, Job, JobStatus};
use std::time::Duration;
use tokio::time;

use super::{RemoteConnection, RemoteError, Row};

/// Identity of the server the connection landed on
pub const HOSTNAME_QUERY: &str = "SELECT CAST(@@hostname AS CHAR)";

/// Every job visible in the connected database
pub const JOBS_QUERY: &str = "SELECT DATABASE(), name, CAST(status AS CHAR), \
     CAST(last_run AS CHAR) FROM jobs";

/// Failed jobs only, filtered by the server
pub const FAILED_JOBS_QUERY: &str = "SELECT name, CAST(status AS CHAR) FROM jobs \
     WHERE LOWER(status) IN ('failed', 'failure', 'error')";

/// Executes job status queries with a per-query timeout
#[derive(Debug, Clone, Copy)]
pub struct JobStatusFetcher {
    timeout: Duration,
}

impl JobStatusFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(
        &self,
        connection: &mut dyn RemoteConnection,
        sql: &str,
    ) -> Result<Vec<Row>, RemoteError> {
        match time::timeout(self.timeout, connection.query(sql)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Query(format!(
                "query timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Returns the hostname the server reports for itself
    pub async fn fetch_hostname(
        &self,
        connection: &mut dyn RemoteConnection,
    ) -> Result<String, RemoteError> {
        let rows = self.run(connection, HOSTNAME_QUERY).await?;
        let row = rows
            .first()
            .ok_or_else(|| RemoteError::Query("hostname query returned no rows".to_string()))?;

        column(row, 0, "hostname")?
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Query("hostname is NULL".to_string()))
    }

    /// Returns every job in the connected database
    ///
    /// The hostname is resolved first and stamped on each job. No rows is a
    /// valid, empty result.
    pub async fn fetch_jobs(
        &self,
        connection: &mut dyn RemoteConnection,
    ) -> Result<Vec<Job>, RemoteError> {
        let hostname = self.fetch_hostname(connection).await?;
        let rows = self.run(connection, JOBS_QUERY).await?;

        rows.iter()
            .map(|row| -> Result<Job, RemoteError> {
                Ok(Job {
                    hostname: hostname.clone(),
                    database_name: column(row, 0, "database_name")?
                        .unwrap_or_default()
                        .to_string(),
                    job_name: required(row, 1, "job_name")?,
                    status: JobStatus::parse(column(row, 2, "status")?.unwrap_or_default()),
                    last_run: column(row, 3, "last_run")?.map(str::to_string),
                })
            })
            .collect()
    }

    /// Returns the name and status of every failed job
    pub async fn fetch_failed_job_names(
        &self,
        connection: &mut dyn RemoteConnection,
    ) -> Result<Vec<FailedJob>, RemoteError> {
        let rows = self.run(connection, FAILED_JOBS_QUERY).await?;

        rows.iter()
            .map(|row| -> Result<FailedJob, RemoteError> {
                Ok(FailedJob {
                    job_name: required(row, 0, "job_name")?,
                    status: JobStatus::parse(column(row, 1, "status")?.unwrap_or_default()),
                })
            })
            .collect()
    }
}

fn column<'a>(row: &'a Row, index: usize, name: &str) -> Result<Option<&'a str>, RemoteError> {
    row.get(index)
        .map(|value| value.as_deref())
        .ok_or_else(|| RemoteError::Query(format!("row is missing column {}", name)))
}

fn required(row: &Row, index: usize, name: &str) -> Result<String, RemoteError> {
    column(row, index, name)?
        .map(str::to_string)
        .ok_or_else(|| RemoteError::Query(format!("{} is NULL", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnection, FakeResource};

    fn fetcher() -> JobStatusFetcher {
        JobStatusFetcher::new(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_fetch_jobs_stamps_hostname_on_every_job() {
        let resource = FakeResource::reachable("mysql-01")
            .with_job("nightly_etl", "succeeded", Some("2024-05-01 02:00:00"))
            .with_job("refresh_cache", "FAILED", None);
        let mut conn = FakeConnection::new("sales", resource);

        let jobs = fetcher().fetch_jobs(&mut conn).await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|job| job.hostname == "mysql-01"));
        assert!(jobs.iter().all(|job| job.database_name == "sales"));
        assert_eq!(jobs[0].status, JobStatus::Succeeded);
        assert_eq!(jobs[0].last_run.as_deref(), Some("2024-05-01 02:00:00"));
        assert_eq!(jobs[1].status, JobStatus::Failed);
        assert_eq!(jobs[1].last_run, None);
        assert_eq!(
            conn.queries(),
            vec![HOSTNAME_QUERY.to_string(), JOBS_QUERY.to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_jobs_with_no_jobs_is_empty() {
        let mut conn = FakeConnection::new("sales", FakeResource::reachable("mysql-01"));
        let jobs = fetcher().fetch_jobs(&mut conn).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_jobs_propagates_query_error() {
        let resource = FakeResource::reachable("mysql-01").failing_queries();
        let mut conn = FakeConnection::new("sales", resource);

        let err = fetcher().fetch_jobs(&mut conn).await.unwrap_err();
        assert!(matches!(err, RemoteError::Query(_)));
    }

    #[tokio::test]
    async fn test_fetch_failed_job_names_only_returns_failures() {
        let resource = FakeResource::reachable("mysql-01")
            .with_job("nightly_etl", "succeeded", None)
            .with_job("refresh_cache", "failed", None)
            .with_job("rebuild_index", "error", None);
        let mut conn = FakeConnection::new("sales", resource);

        let failed = fetcher().fetch_failed_job_names(&mut conn).await.unwrap();

        let names: Vec<&str> = failed.iter().map(|job| job.job_name.as_str()).collect();
        assert_eq!(names, vec!["refresh_cache", "rebuild_index"]);
        assert!(failed.iter().all(|job| job.status == JobStatus::Failed));
    }

    #[test]
    fn test_missing_column_is_a_query_error() {
        let row: Row = vec![Some("only".to_string())];
        assert!(matches!(
            column(&row, 3, "last_run"),
            Err(RemoteError::Query(_))
        ));
        assert!(matches!(
            required(&vec![None], 0, "job_name"),
            Err(RemoteError::Query(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_query_times_out() {
        let resource = FakeResource::reachable("mysql-01").hanging_queries();
        let mut conn = FakeConnection::new("sales", resource);

        let err = fetcher().fetch_hostname(&mut conn).await.unwrap_err();
        assert!(matches!(err, RemoteError::Query(msg) if msg.contains("timed out")));
    }
}
