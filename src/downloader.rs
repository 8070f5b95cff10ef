use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::{fs::File, io::Write};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use rust_embed::RustEmbed;
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    sync::mpsc::UnboundedSender,
};
use tracing::{debug, info, warn};

use crate::backend::{MetadataFetcher, Transfer, TransferRequest};
use crate::config::AppConfig;
use crate::model::VideoMetadata;
use crate::progress::{RawProgress, download_template, parse_progress_from_line, postprocess_template};

#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

fn ytdlp_bin_name() -> &'static str {
    if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" }
}

/// yt-dlp as both the metadata fetcher and the transfer.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    ffmpeg: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(binary: PathBuf, ffmpeg: Option<PathBuf>) -> Self {
        Self { binary, ffmpeg }
    }

    /// Configured path, then the bundled executable, then `yt-dlp` on PATH.
    pub fn locate(config: &AppConfig) -> Self {
        let binary = match &config.ytdlp_path {
            Some(path) => path.clone(),
            None => match extract_embedded() {
                Ok(Some(path)) => path,
                Ok(None) => PathBuf::from(ytdlp_bin_name()),
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "bundled yt-dlp unusable, falling back to PATH");
                    PathBuf::from(ytdlp_bin_name())
                }
            },
        };
        info!(binary = %binary.display(), "using yt-dlp");
        Self::new(binary, config.ffmpeg_path.clone())
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn transfer_args(&self, request: &TransferRequest) -> Vec<String> {
        let mut args = vec![
            "-x".to_owned(),
            "--audio-format".to_owned(),
            request.audio.codec.clone(),
            "--audio-quality".to_owned(),
            request.audio.quality.clone(),
            "--no-playlist".to_owned(),
            "--newline".to_owned(),
            "--progress-template".to_owned(),
            download_template(),
            "--progress-template".to_owned(),
            postprocess_template(),
        ];
        if let Some(ffmpeg) = &self.ffmpeg {
            args.push("--ffmpeg-location".to_owned());
            args.push(ffmpeg.display().to_string());
        }
        args.push("-o".to_owned());
        args.push(
            request
                .output_dir
                .join("%(title)s.%(ext)s")
                .display()
                .to_string(),
        );
        args.push(request.source_url.clone());
        args
    }
}

/// Writes the bundled yt-dlp (if any) to the temp dir once and returns its path.
fn extract_embedded() -> anyhow::Result<Option<PathBuf>> {
    let bin = ytdlp_bin_name();
    let Some(data) = Asset::get(bin) else {
        return Ok(None);
    };
    let tmp = std::env::temp_dir().join(bin);
    if !tmp.exists() {
        let mut f = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        f.write_all(&data.data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))?;
        }
    }
    Ok(Some(tmp))
}

/// Maps `--dump-single-json` output onto our metadata, with display fallbacks.
pub fn metadata_from_json(json: &Value, requested_url: &str) -> VideoMetadata {
    let text = |key: &str| json.get(key).and_then(Value::as_str).map(str::to_owned);

    let duration = text("duration_string").unwrap_or_else(|| {
        let secs = json.get("duration").and_then(Value::as_f64).unwrap_or(0.0);
        format!("{} sec", secs.round() as u64)
    });

    VideoMetadata {
        title: text("title").unwrap_or_else(|| "Untitled".to_string()),
        uploader: text("uploader").unwrap_or_else(|| "Unknown channel".to_string()),
        duration,
        thumbnail: text("thumbnail"),
        source_url: text("webpage_url").unwrap_or_else(|| requested_url.to_string()),
    }
}

#[async_trait]
impl MetadataFetcher for YtDlp {
    async fn fetch(&self, url: &str) -> anyhow::Result<VideoMetadata> {
        let output = Command::new(&self.binary)
            .args([
                "--dump-single-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.binary.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("yt-dlp failed: {}", stderr.trim()));
        }

        let json: Value =
            serde_json::from_slice(&output.stdout).context("yt-dlp returned invalid JSON")?;
        Ok(metadata_from_json(&json, url))
    }
}

#[async_trait]
impl Transfer for YtDlp {
    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: UnboundedSender<RawProgress>,
    ) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .with_context(|| format!("create {}", request.output_dir.display()))?;

        let args = self.transfer_args(request);
        debug!(?args, "spawning yt-dlp");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", self.binary.display()))?;

        let out = child.stdout.take().context("yt-dlp stdout not captured")?;
        let err = child.stderr.take().context("yt-dlp stderr not captured")?;

        // Drained concurrently so a chatty stderr can't block the child.
        let stderr_tail = tokio::spawn(async move {
            let mut last = None;
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    last = Some(line);
                }
            }
            last
        });

        let mut lines = BufReader::new(out).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(event) = parse_progress_from_line(&line) {
                let _ = progress.send(event);
            }
        }

        let status = child.wait().await.context("yt-dlp process failed")?;
        let last_error = stderr_tail.await.ok().flatten();

        if !status.success() {
            return Err(match last_error {
                Some(line) => anyhow!("{line}"),
                None => anyhow!("yt-dlp exited with {status}"),
            });
        }

        let _ = progress.send(RawProgress::Finished);
        Ok(())
    }
}
