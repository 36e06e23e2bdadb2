#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use vidgen_jobs::api::job::models::{AspectRatio, DurationSecs, JobRecord, SizeTier};
use vidgen_jobs::api::job::JobService;
use vidgen_jobs::db::{JobPatch, JobStore, MemoryJobStore, NewJob, StoreError};
use vidgen_jobs::events::{EventSink, JobEvent};
use vidgen_jobs::remote::{GenerationClient, GenerationError, RemoteJobStatus};
use vidgen_jobs::worker::{PollConfig, PollCoordinator};

/// Generation client driven by a scripted sequence of status answers.
///
/// `fetch_status` pops the next scripted answer; once the script runs dry it
/// keeps reporting `Running { progress: 0 }`, which is how a never-finishing
/// remote job is simulated.
pub struct ScriptedClient {
    submit_result: Mutex<Option<Result<String, GenerationError>>>,
    statuses: Mutex<VecDeque<Result<RemoteJobStatus, GenerationError>>>,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl ScriptedClient {
    /// Client whose submit succeeds with the given external id.
    pub fn accepting(external_id: &str) -> Self {
        Self {
            submit_result: Mutex::new(Some(Ok(external_id.to_string()))),
            statuses: Mutex::new(VecDeque::new()),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Client whose submit is rejected by the remote service.
    pub fn rejecting(code: i64, msg: &str) -> Self {
        Self {
            submit_result: Mutex::new(Some(Err(GenerationError::Remote {
                code,
                msg: msg.to_string(),
            }))),
            statuses: Mutex::new(VecDeque::new()),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_status(&self, status: Result<RemoteJobStatus, GenerationError>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn submit(
        &self,
        _prompt: &str,
        _aspect_ratio: AspectRatio,
        _duration: DurationSecs,
        _size: SizeTier,
    ) -> Result<String, GenerationError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submit_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(GenerationError::Malformed("unscripted submit".to_string())))
    }

    async fn fetch_status(&self, _external_id: &str) -> Result<RemoteJobStatus, GenerationError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(RemoteJobStatus::Running { progress: 0 }))
    }
}

/// Store wrapper that fails the first N `update` calls with a database
/// error before delegating to the wrapped in-memory store. Reads and
/// creates always pass through.
pub struct FlakyJobStore {
    inner: Arc<MemoryJobStore>,
    update_failures: Mutex<usize>,
}

impl FlakyJobStore {
    pub fn new(inner: Arc<MemoryJobStore>, failing_updates: usize) -> Self {
        Self {
            inner,
            update_failures: Mutex::new(failing_updates),
        }
    }
}

#[async_trait]
impl JobStore for FlakyJobStore {
    async fn create(&self, job: NewJob) -> Result<JobRecord, StoreError> {
        self.inner.create(job).await
    }

    async fn update(&self, id: i64, patch: JobPatch) -> Result<Option<JobRecord>, StoreError> {
        {
            let mut remaining = self.update_failures.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Database(sqlx::Error::PoolClosed));
            }
        }
        self.inner.update(id, patch).await
    }

    async fn get(&self, id: i64) -> Result<Option<JobRecord>, StoreError> {
        self.inner.get(id).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<JobRecord>, StoreError> {
        self.inner.list_by_owner(owner_id).await
    }

    async fn list_in_flight(&self) -> Result<Vec<JobRecord>, StoreError> {
        self.inner.list_in_flight().await
    }
}

/// Event sink that records everything it sees.
pub struct RecordingSink {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &JobEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Fully wired orchestration core over in-memory fakes.
pub struct Harness {
    pub store: Arc<MemoryJobStore>,
    pub client: Arc<ScriptedClient>,
    pub events: Arc<RecordingSink>,
    pub coordinator: Arc<PollCoordinator>,
    pub service: Arc<JobService>,
    pub shutdown_tx: watch::Sender<bool>,
}

pub fn harness(client: ScriptedClient) -> Harness {
    harness_with_attempts(client, 10)
}

pub fn harness_with_attempts(client: ScriptedClient, max_attempts: u32) -> Harness {
    let store = Arc::new(MemoryJobStore::new());
    let client = Arc::new(client);
    let events = Arc::new(RecordingSink::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let coordinator = PollCoordinator::new(
        client.clone(),
        store.clone(),
        events.clone(),
        PollConfig {
            interval: Duration::from_millis(5),
            max_attempts,
            persist_retries: 1,
            persist_retry_delay: Duration::from_millis(5),
        },
        shutdown_rx,
    );

    let service = Arc::new(JobService::new(
        store.clone(),
        client.clone(),
        events.clone(),
        coordinator.clone(),
    ));

    Harness {
        store,
        client,
        events,
        coordinator,
        service,
        shutdown_tx,
    }
}

/// Poll the store until the job turns terminal, or panic after ~2 seconds.
pub async fn wait_until_terminal(store: &MemoryJobStore, id: i64) -> JobRecord {
    for _ in 0..400 {
        if let Some(record) = store.get(id).await.unwrap() {
            if record.status.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} did not reach a terminal state in time", id);
}

/// Default submission request with only the prompt set.
pub fn submit_request(prompt: &str) -> vidgen_jobs::api::job::dto::SubmitJobRequest {
    vidgen_jobs::api::job::dto::SubmitJobRequest {
        prompt: prompt.to_string(),
        aspect_ratio: None,
        duration: None,
        size: None,
        style: None,
        motion: None,
    }
}
