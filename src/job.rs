//! One queued video: metadata, state machine, progress and completion signal.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::{AudioTarget, Transfer, TransferRequest};
use crate::error::QueueError;
use crate::events::EventSink;
use crate::lock;
use crate::model::{JobId, JobState, JobUpdate, Phase, VideoMetadata};
use crate::progress::{Progress, ProgressReporter, RawProgress, SyntheticSchedule};

/// Per-job parameters stamped at creation time
#[derive(Debug, Clone, PartialEq)]
pub struct JobSettings {
    /// Fixed folder every artifact lands in
    pub output_dir: PathBuf,
    pub audio: AudioTarget,
    pub schedule: SyntheticSchedule,
}

#[derive(Debug, Clone)]
struct JobStatus {
    state: JobState,
    progress: f32,
    phase: Phase,
}

/// A download job and everything needed to run it exactly once.
pub struct DownloadJob {
    id: JobId,
    metadata: VideoMetadata,
    request: TransferRequest,
    schedule: SyntheticSchedule,
    transfer: Arc<dyn Transfer>,
    events: EventSink,
    runtime: Handle,
    started: AtomicBool,
    status: Mutex<JobStatus>,
    done: watch::Sender<bool>,
}

impl std::fmt::Debug for DownloadJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = lock(&self.status);
        f.debug_struct("DownloadJob")
            .field("id", &self.id)
            .field("title", &self.metadata.title)
            .field("state", &status.state)
            .field("progress", &status.progress)
            .finish()
    }
}

impl DownloadJob {
    pub fn new(
        id: JobId,
        metadata: VideoMetadata,
        settings: &JobSettings,
        transfer: Arc<dyn Transfer>,
        events: EventSink,
        runtime: Handle,
    ) -> Arc<Self> {
        let request = TransferRequest {
            source_url: metadata.source_url.clone(),
            output_dir: settings.output_dir.clone(),
            title: metadata.title.clone(),
            audio: settings.audio.clone(),
        };
        let (done, _) = watch::channel(false);
        Arc::new(Self {
            id,
            metadata,
            request,
            schedule: settings.schedule,
            transfer,
            events,
            runtime,
            started: AtomicBool::new(false),
            status: Mutex::new(JobStatus {
                state: JobState::Pending,
                progress: 0.0,
                phase: Phase::Transferring,
            }),
            done,
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.request.output_dir
    }

    pub fn state(&self) -> JobState {
        lock(&self.status).state.clone()
    }

    pub fn progress(&self) -> f32 {
        lock(&self.status).progress
    }

    /// Current `(id, state, progress, phase)` tuple.
    pub fn snapshot(&self) -> JobUpdate {
        let status = lock(&self.status);
        JobUpdate {
            job_id: self.id,
            state: status.state.clone(),
            progress: status.progress,
            phase: status.phase,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// True once the completion signal has fired.
    pub fn is_finished(&self) -> bool {
        *self.done.borrow()
    }

    /// Starts the transfer on the runtime. Returns false if the job was already started.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!(job_id = %self.id, "start ignored, job already started");
            return false;
        }
        info!(job_id = %self.id, title = %self.metadata.title, "starting download");
        self.transition(JobState::Running);
        self.runtime.spawn(Arc::clone(self).drive());
        true
    }

    /// Resolves once the job has completed or failed; immediately if it already has.
    pub async fn wait(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|done| *done).await;
    }

    async fn drive(self: Arc<Self>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transfer = Arc::clone(&self.transfer);
        let request = self.request.clone();
        let mut work = tokio::spawn(async move { transfer.transfer(&request, tx).await });

        let mut reporter = ProgressReporter::new(self.schedule);
        let mut ticker: Option<Interval> = None;

        let outcome = loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => {
                    self.report(reporter.apply(event));
                    if reporter.is_synthesizing() && ticker.is_none() {
                        ticker = Some(synthetic_ticker(reporter.schedule()));
                    }
                }
                _ = next_tick(&mut ticker) => {
                    self.report(reporter.tick());
                    if !reporter.is_synthesizing() {
                        ticker = None;
                    }
                }
                joined = &mut work => break joined,
            }
        };

        // Anything sent right before the transfer returned.
        while let Ok(event) = rx.try_recv() {
            self.report(reporter.apply(event));
        }

        match outcome {
            Ok(Ok(())) => {
                self.report(reporter.apply(RawProgress::Finished));
                self.transition(JobState::Completed);
                info!(
                    job_id = %self.id,
                    title = %self.metadata.title,
                    dir = %self.request.output_dir.display(),
                    "download complete"
                );
            }
            Ok(Err(err)) => self.fail(format!("{err:#}")),
            Err(join_err) => self.fail(format!("transfer task aborted: {join_err}")),
        }
        self.fire_completion();
    }

    fn fail(&self, reason: String) {
        warn!(job_id = %self.id, title = %self.metadata.title, %reason, "download failed");
        self.transition(JobState::Failed(reason.clone()));
        self.events
            .alert(&QueueError::transfer_failure(&self.metadata.title, reason));
    }

    fn transition(&self, next: JobState) {
        let update = {
            let mut status = lock(&self.status);
            if !status.state.can_advance_to(&next) {
                warn!(job_id = %self.id, from = ?status.state, to = ?next, "illegal state transition ignored");
                return;
            }
            status.state = next;
            match status.state {
                JobState::Completed => {
                    status.progress = 1.0;
                    status.phase = Phase::Completed;
                }
                JobState::Failed(_) => status.phase = Phase::Failed,
                _ => {}
            }
            self.update_from(&status)
        };
        debug!(job_id = %self.id, state = ?update.state, "state changed");
        self.events.publish(update);
    }

    fn report(&self, reading: Option<Progress>) {
        let Some(reading) = reading else {
            return;
        };
        let update = {
            let mut status = lock(&self.status);
            if status.state.is_terminal() {
                return;
            }
            status.progress = status.progress.max(reading.fraction);
            status.phase = reading.phase;
            if reading.phase == Phase::Converting && status.state == JobState::Running {
                status.state = JobState::Converting;
            }
            self.update_from(&status)
        };
        debug!(job_id = %self.id, progress = update.progress, phase = ?update.phase, "progress");
        self.events.publish(update);
    }

    fn update_from(&self, status: &JobStatus) -> JobUpdate {
        JobUpdate {
            job_id: self.id,
            state: status.state.clone(),
            progress: status.progress,
            phase: status.phase,
        }
    }

    fn fire_completion(&self) {
        let already = self.done.send_replace(true);
        debug_assert!(!already, "completion signal fired twice");
    }
}

fn synthetic_ticker(schedule: SyntheticSchedule) -> Interval {
    let period = schedule.step_interval().max(Duration::from_millis(1));
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
