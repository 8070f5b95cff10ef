//! Collaborator seams: metadata lookup, the actual transfer, and the clipboard.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::model::VideoMetadata;
use crate::progress::RawProgress;

/// Target encoding for the extracted audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTarget {
    /// Codec passed to `--audio-format` (e.g. "mp3")
    pub codec: String,
    /// Quality passed to `--audio-quality` (kbps for mp3)
    pub quality: String,
}

impl Default for AudioTarget {
    fn default() -> Self {
        Self {
            codec: "mp3".to_string(),
            quality: "192".to_string(),
        }
    }
}

/// Everything the transfer collaborator needs for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source_url: String,
    pub output_dir: PathBuf,
    /// Filename stem of the artifact
    pub title: String,
    pub audio: AudioTarget,
}

/// Resolves a URL to its metadata. Must not touch the filesystem.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<VideoMetadata>;
}

/// Downloads and transcodes one video.
///
/// Raw events go out on `progress` from the implementation's own task.
/// Dropping the sender means no further events will arrive.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: UnboundedSender<RawProgress>,
    ) -> anyhow::Result<()>;
}

/// Read-only access to the system clipboard's text
pub trait Clipboard: Send + Sync {
    fn read_text(&self) -> anyhow::Result<Option<String>>;
}
