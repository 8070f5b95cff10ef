//! Fakes for the collaborator traits, shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::backend::{AudioTarget, Clipboard, MetadataFetcher, Transfer, TransferRequest};
use crate::events::QueueEvent;
use crate::job::JobSettings;
use crate::model::{JobUpdate, VideoMetadata};
use crate::progress::{RawProgress, SyntheticSchedule};

pub fn metadata(title: &str) -> VideoMetadata {
    VideoMetadata {
        title: title.to_string(),
        uploader: "Chan".to_string(),
        duration: "3:45".to_string(),
        thumbnail: None,
        source_url: format!("https://www.youtube.com/watch?v={}", title.replace(' ', "_")),
    }
}

pub fn settings() -> JobSettings {
    JobSettings {
        output_dir: PathBuf::from("/tmp/mp3-queue-tests"),
        audio: AudioTarget::default(),
        schedule: SyntheticSchedule {
            steps: 10,
            window: Duration::from_secs(1),
        },
    }
}

pub fn bytes(done: u64, total: u64) -> RawProgress {
    RawProgress::Transferring {
        bytes_done: Some(done),
        bytes_total: Some(total),
    }
}

/// Every event currently buffered in the receiver.
pub fn drain(rx: &mut UnboundedReceiver<QueueEvent>) -> Vec<QueueEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

pub fn job_updates(events: &[QueueEvent]) -> Vec<JobUpdate> {
    events
        .iter()
        .filter_map(|ev| match ev {
            QueueEvent::JobChanged(u) => Some(u.clone()),
            _ => None,
        })
        .collect()
}

pub fn alerts(events: &[QueueEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|ev| match ev {
            QueueEvent::Alert(msg) => Some(msg.clone()),
            _ => None,
        })
        .collect()
}

/// Fetcher that derives metadata from the video id in the URL.
#[derive(Default)]
pub struct StaticFetcher {
    titles: HashMap<String, String>,
    failing: HashSet<String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, url: &str, title: &str) -> Self {
        self.titles.insert(url.to_string(), title.to_string());
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }
}

#[async_trait]
impl MetadataFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<VideoMetadata> {
        if self.failing.contains(url) {
            anyhow::bail!("Video unavailable");
        }
        let title = self
            .titles
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.rsplit(['=', '/']).next().unwrap_or(url).to_string());
        let mut meta = metadata(&title);
        meta.source_url = url.to_string();
        Ok(meta)
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    Emit(RawProgress),
    Sleep(Duration),
    Fail(&'static str),
}

/// Transfer that plays back a per-title script and records start/end order.
#[derive(Clone, Default)]
pub struct ScriptedTransfer {
    scripts: Arc<Mutex<HashMap<String, Vec<Step>>>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(self, title: &str, steps: Vec<Step>) -> Self {
        self.scripts.lock().unwrap().insert(title.to_string(), steps);
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn starts(&self, title: &str) -> usize {
        let key = format!("start:{title}");
        self.log().iter().filter(|l| **l == key).count()
    }

    fn default_script() -> Vec<Step> {
        vec![
            Step::Emit(bytes(50, 100)),
            Step::Emit(RawProgress::Converting),
            Step::Sleep(Duration::from_millis(300)),
        ]
    }
}

#[async_trait]
impl Transfer for ScriptedTransfer {
    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: UnboundedSender<RawProgress>,
    ) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(format!("start:{}", request.title));
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&request.title)
            .cloned()
            .unwrap_or_else(Self::default_script);

        let mut result = Ok(());
        for step in script {
            match step {
                Step::Emit(ev) => {
                    let _ = progress.send(ev);
                }
                Step::Sleep(d) => tokio::time::sleep(d).await,
                Step::Fail(reason) => {
                    result = Err(anyhow::anyhow!(reason));
                    break;
                }
            }
        }
        self.log.lock().unwrap().push(format!("end:{}", request.title));
        result
    }
}

pub struct FixedClipboard(pub Result<Option<String>, &'static str>);

impl Clipboard for FixedClipboard {
    fn read_text(&self) -> anyhow::Result<Option<String>> {
        self.0.clone().map_err(|e| anyhow::anyhow!(e))
    }
}
