use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::db::job_store::{JobPatch, JobStore};
use crate::events::{EventSink, JobEvent};
use crate::remote::{GenerationClient, RemoteJobStatus};

/// Reason string persisted when the attempt budget runs out.
pub const TIMEOUT_REASON: &str = "polling timeout";

/// Polling policy for one job
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between two status polls
    pub interval: Duration,
    /// Maximum number of polls before the job is failed with a timeout
    pub max_attempts: u32,
    /// How often a failed terminal write is retried
    pub persist_retries: u32,
    /// Delay between terminal write retries
    pub persist_retry_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 120,
            persist_retries: 3,
            persist_retry_delay: Duration::from_millis(500),
        }
    }
}

/// Drives jobs from `processing` to a terminal state.
///
/// One tokio task per job, registered in `active` so a second loop can never
/// start for a job that already has one. Each task is the single writer for
/// its job: a new status poll is only issued after the previous result has
/// been persisted.
pub struct PollCoordinator {
    client: Arc<dyn GenerationClient>,
    store: Arc<dyn JobStore>,
    events: Arc<dyn EventSink>,
    config: PollConfig,
    active: Mutex<HashMap<i64, JoinHandle<()>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PollCoordinator {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        store: Arc<dyn JobStore>,
        events: Arc<dyn EventSink>,
        config: PollConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            store,
            events,
            config,
            active: Mutex::new(HashMap::new()),
            shutdown_rx,
        })
    }

    /// Start polling a job. Returns `false` without spawning when a poll
    /// loop for this job is already running.
    pub async fn start(self: Arc<Self>, job_id: i64, external_id: String) -> bool {
        let mut active = self.active.lock().await;
        if let Some(handle) = active.get(&job_id) {
            if !handle.is_finished() {
                warn!(job_id, "poll loop already active, not starting a second one");
                return false;
            }
        }

        let coordinator = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            coordinator.poll_job(job_id, external_id).await;
        });
        active.insert(job_id, handle);
        info!(job_id, "poll loop started");
        true
    }

    /// Number of currently registered poll loops.
    pub async fn active_jobs(&self) -> usize {
        let mut active = self.active.lock().await;
        active.retain(|_, handle| !handle.is_finished());
        active.len()
    }

    /// Wait for every registered poll loop to finish. Called during
    /// shutdown after the stop signal has been sent.
    pub async fn join_active(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut active = self.active.lock().await;
            active.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                error!("poll task panicked: {:?}", e);
            }
        }
    }

    async fn poll_job(self: Arc<Self>, job_id: i64, external_id: String) {
        let mut shutdown_rx = self.shutdown_rx.clone();

        for attempt in 1..=self.config.max_attempts {
            if self.wait_interval(&mut shutdown_rx).await {
                info!(job_id, "shutdown signalled, stopping poll loop without further writes");
                self.deregister(job_id).await;
                return;
            }

            match self.client.fetch_status(&external_id).await {
                Ok(RemoteJobStatus::Running { progress }) => {
                    // Observers hear about progress before it hits storage.
                    self.events.emit(&JobEvent::Progress { job_id, progress });
                    if let Err(e) = self.store.update(job_id, JobPatch::progress(progress)).await {
                        warn!(job_id, error = %e, "failed to persist progress update");
                    }
                }
                Ok(RemoteJobStatus::Succeeded { result_url }) => {
                    info!(job_id, attempt, "job succeeded remotely");
                    self.events.emit(&JobEvent::Completed {
                        job_id,
                        result_url: result_url.clone(),
                    });
                    self.persist_terminal(job_id, JobPatch::completed(result_url)).await;
                    self.deregister(job_id).await;
                    return;
                }
                Ok(RemoteJobStatus::Failed { reason }) => {
                    info!(job_id, attempt, reason = %reason, "job failed remotely");
                    self.events.emit(&JobEvent::Failed {
                        job_id,
                        reason: reason.clone(),
                    });
                    self.persist_terminal(job_id, JobPatch::failed(reason)).await;
                    self.deregister(job_id).await;
                    return;
                }
                Err(e) => {
                    // Transient: the attempt still counts against the budget.
                    warn!(job_id, attempt, error = %e, "status poll failed, will retry");
                }
            }
        }

        info!(job_id, attempts = self.config.max_attempts, "attempt budget exhausted");
        self.events.emit(&JobEvent::Failed {
            job_id,
            reason: TIMEOUT_REASON.to_string(),
        });
        self.persist_terminal(job_id, JobPatch::failed(TIMEOUT_REASON.to_string()))
            .await;
        self.deregister(job_id).await;
    }

    /// Sleep one poll interval. Returns `true` when shutdown was signalled
    /// during the wait.
    async fn wait_interval(&self, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        if *shutdown_rx.borrow() {
            return true;
        }
        let delay = sleep(self.config.interval);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => return false,
                changed = shutdown_rx.changed() => match changed {
                    Ok(()) if *shutdown_rx.borrow() => return true,
                    Ok(()) => {}
                    Err(_) => {
                        // Sender gone; finish the wait and keep polling.
                        delay.await;
                        return false;
                    }
                },
            }
        }
    }

    /// Write a terminal transition, retrying on store errors. A terminal
    /// transition is never silently dropped: after the retries run out the
    /// inconsistency is surfaced in the log.
    async fn persist_terminal(&self, job_id: i64, patch: JobPatch) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.update(job_id, patch.clone()).await {
                Ok(Some(_)) => return,
                Ok(None) => {
                    warn!(job_id, "terminal write skipped: job already terminal or missing");
                    return;
                }
                Err(e) if attempt <= self.config.persist_retries => {
                    warn!(job_id, attempt, error = %e, "terminal write failed, retrying");
                    sleep(self.config.persist_retry_delay).await;
                }
                Err(e) => {
                    error!(
                        job_id,
                        error = %e,
                        "giving up on terminal write after retries, job left inconsistent"
                    );
                    return;
                }
            }
        }
    }

    async fn deregister(&self, job_id: i64) {
        self.active.lock().await.remove(&job_id);
    }
}
