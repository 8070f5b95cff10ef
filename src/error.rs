//! Error types surfaced by the download queue.

use thiserror::Error;

/// Everything a queue action can report to the user.
///
/// Input and clipboard variants are raised before any job exists. `FetchFailure`
/// aborts creation of a single job. `TransferFailure` is scoped to one job and
/// never stops the rest of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Empty or malformed URL typed by the user
    #[error("{}", invalid_input_message(.url))]
    InvalidInput { url: String },

    /// The metadata collaborator could not resolve the URL
    #[error("could not fetch video info:\n{reason}")]
    FetchFailure { url: String, reason: String },

    /// Download or transcode failed for one job
    #[error("an error occurred while downloading \"{title}\":\n{reason}")]
    TransferFailure { title: String, reason: String },

    /// "Download all" with nothing queued
    #[error("no videos to download")]
    EmptyQueue,

    /// Clipboard holds no text
    #[error("no text found on the clipboard")]
    EmptyClipboard,

    /// Clipboard text is not a video URL
    #[error("the clipboard content is not a valid YouTube URL")]
    InvalidClipboardContent,

    /// Clipboard backend could not be opened or read
    #[error("clipboard unavailable: {0}")]
    ClipboardUnavailable(String),
}

fn invalid_input_message(url: &str) -> String {
    if url.trim().is_empty() {
        "please enter a YouTube URL".to_string()
    } else {
        "this is not a YouTube URL, please enter a valid link".to_string()
    }
}

impl QueueError {
    pub fn invalid_input(url: impl Into<String>) -> Self {
        Self::InvalidInput { url: url.into() }
    }

    /// Flattens a collaborator error chain into a fetch failure.
    pub fn fetch_failure(url: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::FetchFailure {
            url: url.into(),
            reason: format!("{err:#}"),
        }
    }

    pub fn transfer_failure(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransferFailure {
            title: title.into(),
            reason: reason.into(),
        }
    }
}
