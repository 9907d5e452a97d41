//! In-memory stand-ins for remote databases, used by unit tests

use async_trait::async_trait;
use jobwatch_core::domain::credential::Credential;
use jobwatch_core::domain::job::JobStatus;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::remote::fetcher::{FAILED_JOBS_QUERY, HOSTNAME_QUERY, JOBS_QUERY};
use crate::remote::{ConnectionFactory, RemoteConnection, RemoteError, Row};

/// Behaviour of one fake database host
#[derive(Debug, Clone)]
pub struct FakeResource {
    hostname: String,
    reachable: bool,
    hung: bool,
    failing_queries: bool,
    hanging_queries: bool,
    /// Queries left that crash the calling task, shared across connections
    panics: Arc<AtomicUsize>,
    jobs: Vec<(String, String, Option<String>)>,
}

impl FakeResource {
    pub fn reachable(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            reachable: true,
            hung: false,
            failing_queries: false,
            hanging_queries: false,
            panics: Arc::default(),
            jobs: Vec::new(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::reachable("unreachable")
        }
    }

    /// Never answers a connection attempt
    pub fn hung() -> Self {
        Self {
            hung: true,
            ..Self::reachable("hung")
        }
    }

    pub fn with_job(mut self, name: &str, status: &str, last_run: Option<&str>) -> Self {
        self.jobs.push((
            name.to_string(),
            status.to_string(),
            last_run.map(str::to_string),
        ));
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.failing_queries = true;
        self
    }

    pub fn hanging_queries(mut self) -> Self {
        self.hanging_queries = true;
        self
    }

    /// The next `times` queries panic, killing whichever task runs them
    pub fn panicking_queries(self, times: usize) -> Self {
        self.panics.store(times, Ordering::SeqCst);
        self
    }

    fn answer(&self, database: &str, sql: &str) -> Result<Vec<Row>, RemoteError> {
        if self.failing_queries {
            return Err(RemoteError::Query(
                "Table 'jobs' doesn't exist".to_string(),
            ));
        }

        match sql {
            HOSTNAME_QUERY => Ok(vec![vec![Some(self.hostname.clone())]]),
            JOBS_QUERY => Ok(self
                .jobs
                .iter()
                .map(|(name, status, last_run)| {
                    vec![
                        Some(database.to_string()),
                        Some(name.clone()),
                        Some(status.clone()),
                        last_run.clone(),
                    ]
                })
                .collect()),
            FAILED_JOBS_QUERY => Ok(self
                .jobs
                .iter()
                .filter(|(_, status, _)| JobStatus::parse(status) == JobStatus::Failed)
                .map(|(name, status, _)| vec![Some(name.clone()), Some(status.clone())])
                .collect()),
            other => Err(RemoteError::Query(format!("unexpected query: {}", other))),
        }
    }
}

#[derive(Default)]
struct Activity {
    opens: HashMap<String, usize>,
    closes: HashMap<String, usize>,
    queries: HashMap<String, Vec<String>>,
}

/// Connection factory serving fake resources keyed by credential hostname
#[derive(Clone, Default)]
pub struct FakeFactory {
    resources: Arc<Mutex<HashMap<String, FakeResource>>>,
    activity: Arc<Mutex<Activity>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(self, host: &str, resource: FakeResource) -> Self {
        self.set_resource(host, resource);
        self
    }

    /// Replaces a host's behaviour, e.g. to take it offline mid-test
    pub fn set_resource(&self, host: &str, resource: FakeResource) {
        self.resources
            .lock()
            .unwrap()
            .insert(host.to_string(), resource);
    }

    pub fn opens(&self, host: &str) -> usize {
        self.activity.lock().unwrap().opens.get(host).copied().unwrap_or(0)
    }

    pub fn closes(&self, host: &str) -> usize {
        self.activity.lock().unwrap().closes.get(host).copied().unwrap_or(0)
    }

    /// Number of background failure checks executed against `host`
    pub fn failure_checks(&self, host: &str) -> usize {
        self.activity
            .lock()
            .unwrap()
            .queries
            .get(host)
            .map(|queries| queries.iter().filter(|q| *q == FAILED_JOBS_QUERY).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ConnectionFactory for FakeFactory {
    async fn open(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn RemoteConnection>, RemoteError> {
        let host = credential.hostname.clone();
        *self
            .activity
            .lock()
            .unwrap()
            .opens
            .entry(host.clone())
            .or_default() += 1;

        let resource = self.resources.lock().unwrap().get(&host).cloned();
        let resource = match resource {
            Some(resource) => resource,
            None => return Err(RemoteError::Connection(format!("unknown host {}", host))),
        };

        if resource.hung {
            std::future::pending::<()>().await;
        }
        if !resource.reachable {
            return Err(RemoteError::Connection(format!(
                "dial tcp {}:{}: connection refused",
                host, credential.port
            )));
        }

        Ok(Box::new(FakeConnection {
            host,
            database: credential.database.clone(),
            resource,
            activity: Arc::clone(&self.activity),
        }))
    }
}

/// Connection to a fake resource
pub struct FakeConnection {
    host: String,
    database: String,
    resource: FakeResource,
    activity: Arc<Mutex<Activity>>,
}

impl FakeConnection {
    /// A connection that is not tied to any factory
    pub fn new(database: &str, resource: FakeResource) -> Self {
        Self {
            host: resource.hostname.clone(),
            database: database.to_string(),
            resource,
            activity: Arc::default(),
        }
    }

    /// Queries executed on this connection's host, in order
    pub fn queries(&self) -> Vec<String> {
        self.activity
            .lock()
            .unwrap()
            .queries
            .get(&self.host)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteConnection for FakeConnection {
    async fn ping(&mut self) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, RemoteError> {
        self.activity
            .lock()
            .unwrap()
            .queries
            .entry(self.host.clone())
            .or_default()
            .push(sql.to_string());

        let panicking = self
            .resource
            .panics
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if panicking {
            panic!("query on {} crashed", self.host);
        }
        if self.resource.hanging_queries {
            std::future::pending::<()>().await;
        }
        self.resource.answer(&self.database, sql)
    }

    async fn close(self: Box<Self>) {
        *self
            .activity
            .lock()
            .unwrap()
            .closes
            .entry(self.host.clone())
            .or_default() += 1;
    }
}
