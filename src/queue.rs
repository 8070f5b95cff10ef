//! Queue orchestration: adding videos, running one job, and the sequential
//! "download all" driver.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::{Clipboard, MetadataFetcher, Transfer};
use crate::error::QueueError;
use crate::events::{EventSink, QueueEvent};
use crate::job::{DownloadJob, JobSettings};
use crate::model::JobId;
use crate::registry::JobRegistry;
use crate::url::is_video_url;

/// Owns the registry and the collaborators; the UI talks only to this.
pub struct QueueOrchestrator {
    registry: JobRegistry,
    fetcher: Arc<dyn MetadataFetcher>,
    transfer: Arc<dyn Transfer>,
    events: EventSink,
    settings: RwLock<JobSettings>,
    runtime: Handle,
    next_id: AtomicU64,
}

impl QueueOrchestrator {
    pub fn new(
        runtime: Handle,
        fetcher: Arc<dyn MetadataFetcher>,
        transfer: Arc<dyn Transfer>,
        events: EventSink,
        settings: JobSettings,
    ) -> Self {
        Self {
            registry: JobRegistry::new(),
            fetcher,
            transfer,
            events,
            settings: RwLock::new(settings),
            runtime,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn jobs(&self) -> Vec<Arc<DownloadJob>> {
        self.registry.snapshot()
    }

    pub fn settings(&self) -> JobSettings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Output folder for jobs created from now on; existing jobs keep theirs.
    pub fn set_output_dir(&self, dir: PathBuf) {
        info!(dir = %dir.display(), "output folder changed");
        self.settings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .output_dir = dir;
    }

    /// Validates `input`, fetches its metadata and queues a new pending job.
    pub async fn add_url(&self, input: &str) -> Result<Arc<DownloadJob>, QueueError> {
        let url = input.trim();
        if url.is_empty() || !is_video_url(url) {
            return Err(self.surface(QueueError::invalid_input(url)));
        }

        debug!(%url, "fetching video info");
        let metadata = match self.fetcher.fetch(url).await {
            Ok(meta) => meta,
            Err(err) => return Err(self.surface(QueueError::fetch_failure(url, &err))),
        };

        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let job = DownloadJob::new(
            id,
            metadata.clone(),
            &self.settings(),
            Arc::clone(&self.transfer),
            self.events.clone(),
            self.runtime.clone(),
        );
        self.registry.append(Arc::clone(&job));
        info!(job_id = %id, title = %metadata.title, %url, "video queued");

        self.events.send(QueueEvent::JobAdded {
            job_id: id,
            metadata,
        });
        self.events.publish(job.snapshot());
        Ok(job)
    }

    /// Reads the clipboard and queues its URL.
    pub async fn add_from_clipboard(
        &self,
        clipboard: &dyn Clipboard,
    ) -> Result<Arc<DownloadJob>, QueueError> {
        let text = match clipboard.read_text() {
            Ok(text) => text.map(|t| t.trim().to_string()).unwrap_or_default(),
            Err(err) => {
                return Err(self.surface(QueueError::ClipboardUnavailable(format!("{err:#}"))));
            }
        };
        if text.is_empty() {
            return Err(self.surface(QueueError::EmptyClipboard));
        }
        if !is_video_url(&text) {
            return Err(self.surface(QueueError::InvalidClipboardContent));
        }
        self.add_url(&text).await
    }

    /// Starts one job; false if it had already been started.
    pub fn run_one(&self, job: &Arc<DownloadJob>) -> bool {
        job.start()
    }

    /// Starts the job with the given id, if it is still queued.
    pub fn start(&self, id: JobId) -> bool {
        match self.registry.get(id) {
            Some(job) => self.run_one(&job),
            None => false,
        }
    }

    /// Drops the job from the visible queue. An in-flight transfer keeps running.
    pub fn remove(&self, id: JobId) -> bool {
        let Some(job) = self.registry.remove(id) else {
            return false;
        };
        info!(
            job_id = %id,
            title = %job.metadata().title,
            running = job.is_started() && !job.is_finished(),
            "job removed"
        );
        self.events.send(QueueEvent::JobRemoved(id));
        true
    }

    /// Runs every unfinished job one after another, in creation order.
    ///
    /// Returns immediately; the sequencing happens on its own task. An empty
    /// queue yields `EmptyQueue` and spawns nothing.
    pub fn run_all(self: &Arc<Self>) -> Result<JoinHandle<()>, QueueError> {
        if self.registry.is_empty() {
            return Err(self.surface(QueueError::EmptyQueue));
        }
        let jobs = self.registry.snapshot();
        let this = Arc::clone(self);
        Ok(self.runtime.spawn(async move { this.run_sequentially(jobs).await }))
    }

    async fn run_sequentially(&self, jobs: Vec<Arc<DownloadJob>>) {
        info!(count = jobs.len(), "download all started");
        for job in jobs {
            if job.is_finished() {
                continue;
            }
            if !self.registry.contains(job.id()) {
                debug!(job_id = %job.id(), "skipping job removed from queue");
                continue;
            }
            self.run_one(&job);
            job.wait().await;
        }
        info!("download all finished");
    }

    fn surface(&self, err: QueueError) -> QueueError {
        self.events.alert(&err);
        err
    }
}
