//! Service layer
//!
//! [`JobWatch`] is the entry point used by the HTTP adapter: it creates
//! sessions, lists a session's jobs on demand, and owns the background
//! poller. The on-demand path and the poller share the same connector and
//! fetcher but never share a connection.

mod session;

pub use session::SessionRegistry;

use jobwatch_core::domain::credential::Credential;
use jobwatch_core::domain::job::Job;
use jobwatch_core::domain::session::SessionId;
use jobwatch_core::dto::metrics::FailureCount;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::Result;
use crate::metrics::FailureMetrics;
use crate::remote::{ConnectionFactory, Connector, JobStatusFetcher};
use crate::repository::SessionStore;
use crate::scheduler::{PollerSettings, SessionPoller};

/// Session, job and polling operations
pub struct JobWatch {
    registry: Arc<SessionRegistry>,
    connector: Connector,
    fetcher: JobStatusFetcher,
    metrics: Arc<FailureMetrics>,
    settings: PollerSettings,
    poller: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl JobWatch {
    pub fn new(
        config: &Config,
        store: Arc<dyn SessionStore>,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Self {
        let connector = Connector::new(factory, config.connect_timeout);
        let registry = SessionRegistry::new(
            store,
            connector.clone(),
            config.session_ttl,
            config.store_timeout,
        );
        let (shutdown, _) = watch::channel(false);

        Self {
            registry: Arc::new(registry),
            connector,
            fetcher: JobStatusFetcher::new(config.query_timeout),
            metrics: Arc::new(FailureMetrics::new()),
            settings: PollerSettings {
                discovery_interval: config.discovery_interval,
                discovery_backoff: config.discovery_backoff,
            },
            poller: Mutex::new(None),
            shutdown,
        }
    }

    /// Probes `credential` and, if it connects, opens a session for it
    pub async fn create_session(&self, credential: Credential) -> Result<SessionId> {
        self.registry.create(credential).await
    }

    /// Reads every job of the session's database
    ///
    /// Opens a fresh connection for this call and always closes it, whether
    /// or not the queries succeed.
    pub async fn get_jobs_for_session(&self, id: &SessionId) -> Result<Vec<Job>> {
        let credential = self.registry.get(id).await?;

        let mut connection = self.connector.open(&credential).await?;
        let jobs = self.fetcher.fetch_jobs(connection.as_mut()).await;
        self.connector.release(connection).await;

        let jobs = jobs?;
        tracing::debug!("Fetched {} job(s) for session {}", jobs.len(), id);
        Ok(jobs)
    }

    /// Starts the background poller
    ///
    /// Only the first call spawns it; later calls do nothing. Errors inside
    /// the poller are logged, never returned.
    pub fn start_background_polling(&self) {
        let mut poller = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        if poller.is_some() {
            tracing::debug!("Background polling already running");
            return;
        }

        let session_poller = Arc::new(SessionPoller::new(
            Arc::clone(&self.registry),
            self.connector.clone(),
            self.fetcher,
            Arc::clone(&self.metrics),
            self.settings,
        ));
        *poller = Some(tokio::spawn(session_poller.run(self.shutdown.subscribe())));

        tracing::info!("Background polling started");
    }

    /// Whether the background poller is running
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Current failure counters
    pub fn failure_counts(&self) -> Vec<FailureCount> {
        self.metrics.failure_counts()
    }

    /// Stops the poller and every per-session task, waiting for them to finish
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        let handle = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("Background poller ended abnormally: {}", e);
            }
            tracing::info!("Background polling stopped");
        }
    }
}
