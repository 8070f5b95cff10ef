use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a queued job, unique for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable snapshot of what the metadata fetch returned for one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video title, also used as the output filename stem
    pub title: String,
    /// Channel name
    pub uploader: String,
    /// Display duration (e.g. "3:45")
    pub duration: String,
    /// Thumbnail image URL, if the source provides one
    pub thumbnail: Option<String>,
    /// Canonical page URL handed to the transfer
    pub source_url: String,
}

/// Lifecycle of a download job
///
/// `Pending -> Running -> Converting -> Completed`, with `Failed` reachable from
/// `Running` or `Converting`. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Queued, not started yet
    Pending,
    /// Transfer in progress
    Running,
    /// Transcoding to audio
    Converting,
    /// Artifact written
    Completed,
    /// Transfer or transcode failed
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed(_))
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_advance_to(&self, next: &JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Converting)
                | (Running, Completed)
                | (Converting, Completed)
                | (Running, Failed(_))
                | (Converting, Failed(_))
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobState::Pending => "Pending",
            JobState::Running => "Downloading…",
            JobState::Converting => "Converting…",
            JobState::Completed => "Download complete",
            JobState::Failed(_) => "Failed",
        }
    }
}

/// Display phase attached to a progress value; drives the progress bar colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Transferring,
    Converting,
    Completed,
    /// Terminal failure; overrides whatever the bar showed before
    Failed,
}

/// Normalized update pushed to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub state: JobState,
    /// Fraction in `[0.0, 1.0]`
    pub progress: f32,
    pub phase: Phase,
}
