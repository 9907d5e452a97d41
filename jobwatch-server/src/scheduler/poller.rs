//! Session poller
//!
//! Discovery runs on its own loop and only starts and stops per-session
//! tasks. Each session task checks its database for failed jobs at that
//! session's effective interval until the session expires or the poller is
//! shut down. A failing session only ever affects its own task.

use jobwatch_core::domain::session::{Session, SessionId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::metrics::FailureMetrics;
use crate::remote::{Connector, JobStatusFetcher, RemoteError};
use crate::service::SessionRegistry;

/// Discovery cadence
#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    /// Pause between successful discovery passes
    pub discovery_interval: Duration,

    /// Pause after a failed discovery pass
    pub discovery_backoff: Duration,
}

/// Background poller for every live session
pub struct SessionPoller {
    registry: Arc<SessionRegistry>,
    connector: Connector,
    fetcher: JobStatusFetcher,
    metrics: Arc<FailureMetrics>,
    settings: PollerSettings,
}

/// A running per-session task and the signal that retires it
struct SessionTask {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

/// Per-session tasks owned by the discovery loop
#[derive(Default)]
struct SessionTasks {
    running: HashMap<SessionId, SessionTask>,
    /// Told to stop, possibly still finishing a check
    retiring: Vec<JoinHandle<()>>,
}

impl SessionPoller {
    pub fn new(
        registry: Arc<SessionRegistry>,
        connector: Connector,
        fetcher: JobStatusFetcher,
        metrics: Arc<FailureMetrics>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            registry,
            connector,
            fetcher,
            metrics,
            settings,
        }
    }

    /// Runs discovery until `shutdown` flips to true
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting session poller (discovery every {:?})",
            self.settings.discovery_interval
        );

        let mut tasks = SessionTasks::default();

        loop {
            let pause = match self.registry.list_active().await {
                Ok(sessions) => {
                    debug!("Discovered {} active session(s)", sessions.len());
                    self.reconcile(&mut tasks, sessions, &shutdown);
                    self.settings.discovery_interval
                }
                Err(e) => {
                    error!(
                        "Session discovery failed, retrying in {:?}: {}",
                        self.settings.discovery_backoff, e
                    );
                    self.settings.discovery_backoff
                }
            };

            tokio::select! {
                _ = time::sleep(pause) => {}
                _ = signalled(&mut shutdown) => break,
            }
        }

        info!(
            "Stopping {} session task(s)",
            tasks.running.len() + tasks.retiring.len()
        );
        for (id, task) in tasks.running {
            if let Err(e) = task.handle.await {
                warn!("Task for session {} ended abnormally: {}", id, e);
            }
        }
        for handle in tasks.retiring {
            if let Err(e) = handle.await {
                warn!("Task for an expired session ended abnormally: {}", e);
            }
        }
    }

    /// Starts tasks for new sessions, retires tasks for expired ones and
    /// restarts tasks that died
    fn reconcile(
        self: &Arc<Self>,
        tasks: &mut SessionTasks,
        sessions: Vec<Session>,
        shutdown: &watch::Receiver<bool>,
    ) {
        let active: HashSet<&SessionId> = sessions.iter().map(|session| &session.id).collect();

        let stale: Vec<SessionId> = tasks
            .running
            .iter()
            .filter(|(id, task)| !active.contains(id) || task.handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();

        for id in stale {
            let Some(task) = tasks.running.remove(&id) else {
                continue;
            };

            if active.contains(&id) {
                warn!("Task for session {} stopped unexpectedly, restarting", id);
            } else {
                // An in-flight check still releases its connection before the task exits.
                info!("Session {} expired, stopping its checks", id);
                task.stop.send_replace(true);
                tasks.retiring.push(task.handle);
            }
        }
        tasks.retiring.retain(|handle| !handle.is_finished());

        for session in sessions {
            if tasks.running.contains_key(&session.id) {
                continue;
            }

            info!(
                "Checking session {} ({}) every {:?}",
                session.id,
                session.credential.target(),
                session.credential.effective_interval()
            );

            let id = session.id.clone();
            let (stop, stop_rx) = watch::channel(false);
            let handle = tokio::spawn(Arc::clone(self).poll_session(
                session,
                stop_rx,
                shutdown.clone(),
            ));
            tasks.running.insert(id, SessionTask { handle, stop });
        }
    }

    /// Checks one session on its own timer until it is retired or shut down
    ///
    /// Signals are only observed between checks, so a running check always
    /// reaches its release.
    async fn poll_session(
        self: Arc<Self>,
        session: Session,
        mut stop: watch::Receiver<bool>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = time::interval(session.credential.effective_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = signalled(&mut shutdown) => return,
                _ = signalled(&mut stop) => {
                    debug!("Session {} retired", session.id);
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.check_session(&session).await {
                Ok(0) => debug!("Session {}: no failed jobs", session.id),
                Ok(failed) => info!("Session {}: {} failed job(s)", session.id, failed),
                Err(e) => warn!(
                    "Check for session {} ({}) failed: {}",
                    session.id,
                    session.credential.target(),
                    e
                ),
            }
        }
    }

    /// Opens a connection, records every failed job, and closes it again
    ///
    /// Returns the number of failed jobs observed.
    pub async fn check_session(&self, session: &Session) -> Result<usize, RemoteError> {
        let credential = &session.credential;

        let mut connection = self.connector.open(credential).await?;
        let failed = self.fetcher.fetch_failed_job_names(connection.as_mut()).await;
        self.connector.release(connection).await;

        let failed = failed?;
        for job in &failed {
            warn!(
                "Job {} in {} on {} is {}",
                job.job_name, credential.database, credential.hostname, job.status
            );
            self.metrics.record_failure(&credential.database, &job.job_name);
        }

        Ok(failed.len())
    }
}

/// Resolves once `signal` flips to true or its sending side is gone
async fn signalled(signal: &mut watch::Receiver<bool>) {
    while !*signal.borrow_and_update() {
        if signal.changed().await.is_err() {
            return;
        }
    }
}
