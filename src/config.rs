//! User settings, stored as JSON under the platform config directory.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::backend::AudioTarget;
use crate::job::JobSettings;
use crate::progress::SyntheticSchedule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the config directory")]
    NoConfigDir,
    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Folder every MP3 is written to
    pub output_dir: PathBuf,
    pub audio_format: String,
    pub audio_quality: String,
    /// Number of synthetic steps shown while converting
    pub conversion_steps: u32,
    /// Wall-clock length of the synthetic conversion run
    pub conversion_window_ms: u64,
    pub ytdlp_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let audio = AudioTarget::default();
        let schedule = SyntheticSchedule::default();
        Self {
            output_dir: default_output_dir(),
            audio_format: audio.codec,
            audio_quality: audio.quality,
            conversion_steps: schedule.steps,
            conversion_window_ms: schedule.window.as_millis() as u64,
            ytdlp_path: None,
            ffmpeg_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// `~/Desktop/class_mp3`, or a relative `class_mp3` when there is no home.
pub fn default_output_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Desktop")))
        .map(|d| d.join("class_mp3"))
        .unwrap_or_else(|| PathBuf::from("class_mp3"))
}

/// `<config_dir>/mp3-queue/config.json`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|d| d.join("mp3-queue").join("config.json"))
        .ok_or(ConfigError::NoConfigDir)
}

impl AppConfig {
    /// Loads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&default_config_path()?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)?;
        info!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn save_default(&self) -> Result<(), ConfigError> {
        self.save(&default_config_path()?)
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            output_dir: self.output_dir.clone(),
            audio: AudioTarget {
                codec: self.audio_format.clone(),
                quality: self.audio_quality.clone(),
            },
            schedule: SyntheticSchedule {
                steps: self.conversion_steps.max(1),
                window: Duration::from_millis(self.conversion_window_ms),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert!(cfg.output_dir.ends_with("class_mp3"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "audio_quality": "320", "conversion_steps": 20 }"#).unwrap();

        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.audio_quality, "320");
        assert_eq!(cfg.audio_format, "mp3");

        let settings = cfg.job_settings();
        assert_eq!(settings.schedule.steps, 20);
        assert_eq!(settings.schedule.window, Duration::from_secs(5));
        assert_eq!(settings.audio.quality, "320");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = AppConfig {
            output_dir: PathBuf::from("/srv/music"),
            ytdlp_path: Some(PathBuf::from("/opt/yt-dlp")),
            ..AppConfig::default()
        };
        cfg.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn zero_steps_clamped() {
        let cfg = AppConfig {
            conversion_steps: 0,
            ..AppConfig::default()
        };
        assert_eq!(cfg.job_settings().schedule.steps, 1);
    }
}
