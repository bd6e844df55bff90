//! The upload pipeline driven by host events.
//!
//! The host calls [`Uploader::on_host_loaded`] once at startup and
//! [`Uploader::on_recording_saved`] whenever a recording lands on disk. Each
//! recording becomes an independent job: resolve the endpoint, split the
//! file, and push chunks through the scheduler with the retry policy.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use replaybot_settings::{SettingKey, SettingsStore};
use replaybot_transfer::{ChunkReader, TransferError, generate_base_name};

use crate::client::{ChunkTransport, ChunkUploader, HttpTransport};
use crate::config::UploaderConfig;
use crate::credential::{CredentialInvalidator, LogNotifier, Notifier, ensure_credential};
use crate::endpoint::EndpointResolver;
use crate::error::UploadError;
use crate::retry::{ChunkOutcome, RetryPolicy};
use crate::scheduler::UploadScheduler;
use crate::types::{JobReport, UploadJob};

/// Handle to a running upload job.
pub struct JobHandle {
    id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<Result<JobReport, UploadError>>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stops dispatching chunks and cancels those in flight.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the job to finish.
    pub async fn wait(self) -> Result<JobReport, UploadError> {
        self.handle
            .await
            .map_err(|e| UploadError::Join(e.to_string()))?
    }
}

/// Entry point of the upload pipeline.
#[derive(Clone)]
pub struct Uploader {
    inner: Arc<Inner>,
}

struct Inner {
    config: UploaderConfig,
    store: Arc<dyn SettingsStore>,
    resolver: EndpointResolver,
    chunk_uploader: ChunkUploader,
    retry: RetryPolicy,
    notifier: Arc<dyn Notifier>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Uploader {
    pub fn new(
        config: UploaderConfig,
        store: Arc<dyn SettingsStore>,
        transport: Arc<dyn ChunkTransport>,
        notifier: Arc<dyn Notifier>,
        rng: Box<dyn RngCore + Send>,
    ) -> Result<Self, UploadError> {
        let resolver = EndpointResolver::new(&config, store.clone())?;
        let chunk_uploader =
            ChunkUploader::new(transport, CredentialInvalidator::new(store.clone()));

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                store,
                resolver,
                chunk_uploader,
                retry: RetryPolicy::single_retry(),
                notifier,
                rng: Mutex::new(rng),
                cancel: CancellationToken::new(),
                tracker: TaskTracker::new(),
            }),
        })
    }

    /// Uploader over HTTP that reports the linking link through the log.
    pub fn with_defaults(
        config: UploaderConfig,
        store: Arc<dyn SettingsStore>,
    ) -> Result<Self, UploadError> {
        Self::new(
            config,
            store,
            Arc::new(HttpTransport::new()?),
            Arc::new(LogNotifier),
            Box::new(StdRng::from_entropy()),
        )
    }

    /// Resolves the endpoint in the background so the first job starts with
    /// fresh concurrency and bot name. Failures are only logged.
    pub fn on_host_loaded(&self) -> JoinHandle<String> {
        let inner = self.inner.clone();
        self.inner.tracker.spawn(async move {
            let credential = inner.store.get(SettingKey::Token);
            inner.resolver.resolve(&credential).await
        })
    }

    /// Starts uploading the recording at `path`.
    ///
    /// Returns `None` without starting a job when no credential is stored
    /// (the linking flow is started instead) or after shutdown.
    pub fn on_recording_saved(&self, path: impl Into<PathBuf>) -> Option<JobHandle> {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            warn!("uploader is shut down, ignoring recording");
            return None;
        }

        let credential = ensure_credential(
            inner.store.as_ref(),
            &mut **lock_rng(&inner.rng),
            inner.notifier.as_ref(),
            &inner.config.link_base_url,
        )?;

        let path = path.into();
        let id = Uuid::new_v4();
        let cancel = inner.cancel.child_token();
        info!(job = %id, path = %path.display(), "recording saved, starting upload");

        let span = info_span!("upload_job", job = %id);
        let handle = inner.tracker.spawn(
            run_job(inner.clone(), id, path, credential, cancel.clone()).instrument(span),
        );
        Some(JobHandle { id, cancel, handle })
    }

    /// Cancels every job and waits for all pipeline tasks to end.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        info!("uploader shut down");
    }
}

fn lock_rng(rng: &Mutex<Box<dyn RngCore + Send>>) -> MutexGuard<'_, Box<dyn RngCore + Send>> {
    rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    fn base_name(&self, source: &Path) -> String {
        let now = chrono::Local::now().naive_local();
        generate_base_name(&mut **lock_rng(&self.rng), now, &source.to_string_lossy())
    }
}

async fn run_job(
    inner: Arc<Inner>,
    id: Uuid,
    source: PathBuf,
    credential: String,
    cancel: CancellationToken,
) -> Result<JobReport, UploadError> {
    let upload_url = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("job cancelled while resolving the endpoint");
            return Err(UploadError::Cancelled);
        }
        url = inner.resolver.resolve(&credential) => url,
    };
    let limit = inner.resolver.max_uploads();

    let chunk_size = inner.config.chunk_size;
    let open_path = source.clone();
    let open = tokio::task::spawn_blocking(move || ChunkReader::open(&open_path, chunk_size));
    let mut reader = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(UploadError::Cancelled),
        opened = open => opened.map_err(|e| UploadError::Join(e.to_string()))??,
    };

    if reader.total_chunks() == 0 {
        warn!(path = %source.display(), "recording is empty, nothing to upload");
        return Err(UploadError::EmptyFile(source.display().to_string()));
    }

    let job = UploadJob {
        id,
        base_name: inner.base_name(&source),
        source,
        credential,
        upload_url,
        total_chunks: reader.total_chunks(),
        dev: inner.config.is_dev,
    };
    info!(
        file_name = %job.base_name,
        total_chunks = job.total_chunks,
        limit,
        upload_url = %job.upload_url,
        "upload started"
    );

    let mut scheduler: UploadScheduler<ChunkOutcome> = UploadScheduler::new(limit, cancel);
    let mut dispatched = 0u64;
    let mut read_error = None;

    loop {
        let read = tokio::task::spawn_blocking(move || {
            let next = reader.next_chunk();
            (reader, next)
        })
        .await;

        let chunk = match read {
            Ok((returned, Ok(Some(chunk)))) => {
                reader = returned;
                chunk
            }
            Ok((_, Ok(None))) => break,
            Ok((_, Err(e))) => {
                warn!(error = %e, dispatched, "read failed, stopping dispatch");
                read_error = Some(e.to_string());
                break;
            }
            Err(e) => {
                let e = TransferError::Io(std::io::Error::other(e.to_string()));
                warn!(error = %e, dispatched, "read task failed, stopping dispatch");
                read_error = Some(e.to_string());
                break;
            }
        };

        let Ok(admission) = scheduler.admit().await else {
            debug!(dispatched, "job cancelled, stopping dispatch");
            break;
        };

        let request = job.request_for(&chunk);
        let chunk_uploader = inner.chunk_uploader.clone();
        let retry = inner.retry;
        scheduler.spawn(admission, async move {
            retry.run(&chunk_uploader, &request).await
        });
        dispatched += 1;
    }

    let drained = scheduler.join_all().await;
    let mut outcomes = drained.completed;
    outcomes.sort_by_key(|o| o.sequence);

    let acked = outcomes.iter().filter(|o| o.succeeded()).count() as u64;
    let failed: Vec<u64> = outcomes
        .iter()
        .filter(|o| !o.succeeded())
        .map(|o| o.sequence)
        .collect();

    let report = JobReport {
        job_id: job.id,
        file_name: job.base_name,
        upload_url: job.upload_url,
        total_chunks: job.total_chunks,
        dispatched,
        acked,
        failed,
        unfinished: (drained.cancelled + drained.panicked) as u64,
        read_error,
        outcomes,
    };

    if report.is_complete() {
        info!(file_name = %report.file_name, chunks = report.total_chunks, "upload finished");
    } else {
        warn!(
            file_name = %report.file_name,
            acked = report.acked,
            total_chunks = report.total_chunks,
            failed = ?report.failed,
            unfinished = report.unfinished,
            "upload finished incomplete"
        );
    }
    Ok(report)
}
