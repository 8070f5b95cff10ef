//! Download queue core for the MP3 downloader: jobs, progress tracking and
//! the sequential "download all" orchestrator.

use std::sync::{Mutex, MutexGuard, PoisonError};

// Collaborator traits (metadata, transfer, clipboard)
pub mod backend;
// System clipboard via arboard
pub mod clipboard;
// On-disk settings
pub mod config;
// yt-dlp backed collaborators
pub mod downloader;
// Error taxonomy
pub mod error;
// Update-dispatch channel toward the UI
pub mod events;
// Single download job state machine
pub mod job;
// tracing subscriber setup
pub mod logging;
// Data models shared with the UI
pub mod model;
// Raw progress parsing and normalization
pub mod progress;
// Queue orchestration ("download one" / "download all")
pub mod queue;
// Ordered job collection
pub mod registry;
// Video URL recognition
pub mod url;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::QueueError;
pub use events::{EventSink, QueueEvent};
pub use job::{DownloadJob, JobSettings};
pub use model::{JobId, JobState, JobUpdate, Phase, VideoMetadata};
pub use queue::QueueOrchestrator;

/// Locks a mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
