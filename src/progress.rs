//! Raw transfer signals and their normalization into a monotonic fraction.

use std::time::Duration;

use crate::model::Phase;

/// Prefix of the download lines printed through `--progress-template`
pub const DOWNLOAD_MARKER: &str = "mp3q-dl";
/// Prefix of the post-processing lines printed through `--progress-template`
pub const POSTPROCESS_MARKER: &str = "mp3q-pp";

/// yt-dlp template for download progress lines.
pub fn download_template() -> String {
    format!(
        "download:{DOWNLOAD_MARKER} %(progress.status)s %(progress.downloaded_bytes)s \
         %(progress.total_bytes)s %(progress.total_bytes_estimate)s"
    )
}

/// yt-dlp template for post-processor lines.
pub fn postprocess_template() -> String {
    format!("postprocess:{POSTPROCESS_MARKER} %(progress.status)s %(progress.postprocessor)s")
}

/// Raw event as emitted by the transfer collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawProgress {
    /// Bytes are being fetched; either count may be unknown
    Transferring {
        bytes_done: Option<u64>,
        bytes_total: Option<u64>,
    },
    /// Post-processing (transcoding) started; carries no progress of its own
    Converting,
    /// The artifact is in place
    Finished,
}

/// Parses one stdout line produced by the templates above.
pub fn parse_progress_from_line(line: &str) -> Option<RawProgress> {
    let mut fields = line.split_whitespace();
    match fields.next()? {
        DOWNLOAD_MARKER => {
            let status = fields.next()?;
            if status != "downloading" && status != "finished" {
                return None;
            }
            let bytes_done = fields.next().and_then(parse_count);
            let total = fields.next().and_then(parse_count);
            let estimate = fields.next().and_then(parse_count);
            Some(RawProgress::Transferring {
                bytes_done,
                bytes_total: total.or(estimate),
            })
        }
        POSTPROCESS_MARKER => match fields.next()? {
            "started" | "processing" => Some(RawProgress::Converting),
            _ => None,
        },
        _ => None,
    }
}

/// yt-dlp prints "NA" for missing fields and floats for estimates.
fn parse_count(field: &str) -> Option<u64> {
    if let Ok(v) = field.parse::<u64>() {
        return Some(v);
    }
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}

/// Fixed wall-clock plan for the synthesized conversion progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticSchedule {
    pub steps: u32,
    pub window: Duration,
}

impl Default for SyntheticSchedule {
    fn default() -> Self {
        Self {
            steps: 50,
            window: Duration::from_secs(5),
        }
    }
}

impl SyntheticSchedule {
    pub fn step_interval(&self) -> Duration {
        self.window / self.steps.max(1)
    }
}

/// One normalized reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub fraction: f32,
    pub phase: Phase,
}

/// Turns raw events into a non-decreasing fraction plus a display phase.
///
/// The reporter is a plain state machine: the owning job feeds it raw events
/// and clock ticks from a single task, so native and synthetic updates can
/// never race. Once conversion starts, late `Transferring` events are dropped;
/// once the phase is `Completed`, everything is.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    fraction: f32,
    phase: Phase,
    steps_left: Option<u32>,
    schedule: SyntheticSchedule,
}

impl ProgressReporter {
    pub fn new(schedule: SyntheticSchedule) -> Self {
        Self {
            fraction: 0.0,
            phase: Phase::Transferring,
            steps_left: None,
            schedule,
        }
    }

    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn schedule(&self) -> SyntheticSchedule {
        self.schedule
    }

    /// True while synthetic steps remain to be emitted.
    pub fn is_synthesizing(&self) -> bool {
        self.steps_left.is_some()
    }

    fn snapshot(&self) -> Progress {
        Progress {
            fraction: self.fraction,
            phase: self.phase,
        }
    }

    /// Applies a raw event; returns the new reading if anything visible changed.
    pub fn apply(&mut self, event: RawProgress) -> Option<Progress> {
        if self.phase == Phase::Completed {
            return None;
        }
        match event {
            RawProgress::Transferring {
                bytes_done: Some(done),
                bytes_total: Some(total),
            } if total > 0 && self.phase == Phase::Transferring => {
                let fraction = (done as f64 / total as f64).clamp(0.0, 1.0) as f32;
                if fraction <= self.fraction {
                    return None;
                }
                self.fraction = fraction;
                Some(self.snapshot())
            }
            RawProgress::Transferring { .. } => None,
            RawProgress::Converting => {
                if self.phase != Phase::Transferring {
                    return None;
                }
                self.phase = Phase::Converting;
                self.steps_left = Some(self.schedule.steps.max(1));
                Some(self.snapshot())
            }
            RawProgress::Finished => {
                self.fraction = 1.0;
                self.phase = Phase::Completed;
                self.steps_left = None;
                Some(self.snapshot())
            }
        }
    }

    /// Advances the synthetic conversion by one step.
    ///
    /// Each step closes `1 / steps_left` of the remaining gap, so the last
    /// step lands exactly on 1.0.
    pub fn tick(&mut self) -> Option<Progress> {
        let left = self.steps_left?;
        if left <= 1 {
            self.fraction = 1.0;
            self.phase = Phase::Completed;
            self.steps_left = None;
        } else {
            let next = self.fraction + (1.0 - self.fraction) / left as f32;
            self.fraction = next.clamp(self.fraction, 1.0);
            self.steps_left = Some(left - 1);
        }
        Some(self.snapshot())
    }
}
