//! Desktop front end: queue YouTube videos and download them as MP3.

// Thumbnail fetching module
mod thumbnail;

use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::anyhow;
// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{Color32, ColorImage, RichText, TextureOptions, Visuals};
use mp3_queue::{
    JobId, JobState, JobUpdate, Phase, QueueEvent, QueueOrchestrator, VideoMetadata,
    clipboard::SystemClipboard, config::AppConfig, downloader::YtDlp, events, logging,
};
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use tokio::{runtime::Runtime, sync::mpsc::UnboundedReceiver};
use tracing::{info, warn};

const ORANGE: Color32 = Color32::from_rgb(255, 152, 0);
const GREEN: Color32 = Color32::from_rgb(76, 175, 80);

/// Program entry point: loads settings, wires the queue and launches the GUI
fn main() -> anyhow::Result<()> {
    let loaded = AppConfig::load_default();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    logging::init(&config.log_level);
    if let Err(err) = &loaded {
        warn!(error = %err, "falling back to default settings");
    }

    let rt = Arc::new(Runtime::new()?);
    let backend = Arc::new(YtDlp::locate(&config));
    let (sink, rx) = events::channel();
    let queue = Arc::new(QueueOrchestrator::new(
        rt.handle().clone(),
        backend.clone(),
        backend,
        sink,
        config.job_settings(),
    ));
    info!(output_dir = %config.output_dir.display(), "starting");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([600.0, 600.0])
            .with_max_inner_size([600.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "MP3 Downloader",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(QueueApp::new(rt, queue, rx, config))
        }),
    )
    .map_err(|e| anyhow!("GUI error: {e}"))
}

/// What the window knows about one job
struct JobCard {
    id: JobId,
    metadata: VideoMetadata,
    state: JobState,
    progress: f32,
    phase: Phase,
}

impl JobCard {
    fn apply(&mut self, update: JobUpdate) {
        self.state = update.state;
        self.progress = self.progress.max(update.progress);
        self.phase = update.phase;
    }

    fn bar_color(&self) -> Color32 {
        match self.phase {
            Phase::Transferring => ORANGE,
            Phase::Converting | Phase::Completed => GREEN,
            Phase::Failed => Color32::RED,
        }
    }
}

/// Application state for the GUI
struct QueueApp {
    runtime: Arc<Runtime>,
    queue: Arc<QueueOrchestrator>,
    events: UnboundedReceiver<QueueEvent>,
    config: AppConfig,
    /// Input field for YouTube URL
    url_input: String,
    /// Cards in creation order
    cards: Vec<JobCard>,
    /// Cached textures for video thumbnails
    thumbnails: HashMap<JobId, egui::TextureHandle>,
    /// Incoming thumbnail fetch results
    thumbnail_results: Arc<Mutex<Vec<(JobId, ColorImage)>>>,
    /// Messages waiting for the modal, oldest first
    alerts: VecDeque<String>,
}

impl QueueApp {
    fn new(
        runtime: Arc<Runtime>,
        queue: Arc<QueueOrchestrator>,
        events: UnboundedReceiver<QueueEvent>,
        config: AppConfig,
    ) -> Self {
        Self {
            runtime,
            queue,
            events,
            config,
            url_input: String::new(),
            cards: Vec::new(),
            thumbnails: HashMap::new(),
            thumbnail_results: Arc::new(Mutex::new(Vec::new())),
            alerts: VecDeque::new(),
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                QueueEvent::JobAdded { job_id, metadata } => {
                    if let Some(url) = metadata.thumbnail.clone() {
                        self.fetch_thumbnail(ctx, job_id, url);
                    }
                    self.cards.push(JobCard {
                        id: job_id,
                        metadata,
                        state: JobState::Pending,
                        progress: 0.0,
                        phase: Phase::Transferring,
                    });
                }
                QueueEvent::JobChanged(update) => {
                    if let Some(card) = self.cards.iter_mut().find(|c| c.id == update.job_id) {
                        card.apply(update);
                    }
                }
                QueueEvent::JobRemoved(id) => {
                    self.cards.retain(|c| c.id != id);
                    self.thumbnails.remove(&id);
                }
                QueueEvent::Alert(message) => self.alerts.push_back(message),
            }
        }
    }

    fn fetch_thumbnail(&self, ctx: &egui::Context, id: JobId, url: String) {
        let results = Arc::clone(&self.thumbnail_results);
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            if let Some(img) = thumbnail::fetch_thumbnail(&url) {
                if let Ok(mut pending) = results.lock() {
                    pending.push((id, img));
                }
                ctx.request_repaint();
            }
        });
    }

    fn load_thumbnails(&mut self, ctx: &egui::Context) {
        let Ok(mut pending) = self.thumbnail_results.lock() else {
            return;
        };
        for (id, img) in pending.drain(..) {
            let tex = ctx.load_texture(format!("thumb-{}", id.0), img, TextureOptions::default());
            self.thumbnails.insert(id, tex);
        }
    }

    fn add_url(&mut self, ctx: &egui::Context) {
        let url = std::mem::take(&mut self.url_input);
        let queue = Arc::clone(&self.queue);
        let ctx = ctx.clone();
        // Failures reach the UI through the alert channel.
        self.runtime.spawn(async move {
            let _ = queue.add_url(&url).await;
            ctx.request_repaint();
        });
    }

    fn paste_from_clipboard(&mut self, ctx: &egui::Context) {
        let queue = Arc::clone(&self.queue);
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let _ = queue.add_from_clipboard(&SystemClipboard).await;
            ctx.request_repaint();
        });
    }

    fn browse_output_dir(&mut self) {
        let Some(folder) = FileDialog::new()
            .set_directory(&self.config.output_dir)
            .pick_folder()
        else {
            return;
        };
        self.queue.set_output_dir(folder.clone());
        self.config.output_dir = folder;
        if let Err(err) = self.config.save_default() {
            warn!(error = %err, "could not save settings");
        }
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alerts.front().cloned() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Warning")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.alerts.pop_front();
        }
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for QueueApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.drain_events(ctx);
        self.load_thumbnails(ctx);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let width = (ui.available_width() - 190.0).max(120.0);
                let input = ui.add(
                    egui::TextEdit::singleline(&mut self.url_input)
                        .hint_text("YouTube URL")
                        .desired_width(width),
                );
                let submitted =
                    input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Add").clicked() || submitted {
                    self.add_url(ctx);
                }
                if ui.button("⬇ Download all").clicked() {
                    // EmptyQueue is reported through the alert channel.
                    let _ = self.queue.run_all();
                }
            });
            ui.horizontal(|ui| {
                ui.label("Download folder:");
                ui.label(RichText::new(self.config.output_dir.display().to_string()).weak());
                if ui.button("Browse…").clicked() {
                    self.browse_output_dir();
                }
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    let mut to_start = Vec::new();
                    let mut to_remove = Vec::new();
                    let mut to_open = None;

                    for card in &self.cards {
                        ui.group(|ui| {
                            ui.horizontal(|ui| {
                                ui.vertical(|ui| {
                                    if let Some(tex) = self.thumbnails.get(&card.id) {
                                        ui.add(
                                            egui::Image::new(tex)
                                                .fit_to_exact_size(egui::vec2(80.0, 80.0)),
                                        );
                                    }
                                    ui.label(RichText::new(&card.metadata.duration).small());
                                });
                                ui.vertical(|ui| {
                                    ui.horizontal(|ui| {
                                        ui.label(RichText::new(&card.metadata.title).strong());
                                        if ui
                                            .add(egui::Button::new("❌").fill(Color32::DARK_RED))
                                            .on_hover_text("Remove")
                                            .clicked()
                                        {
                                            to_remove.push(card.id);
                                        }
                                    });
                                    ui.label(RichText::new(&card.metadata.uploader).small());
                                    match &card.state {
                                        JobState::Pending => {
                                            if ui.button("⬇").on_hover_text("Download").clicked() {
                                                to_start.push(card.id);
                                            }
                                        }
                                        JobState::Completed => {
                                            ui.horizontal(|ui| {
                                                ui.label(card.state.label());
                                                if ui.button("Open Folder").clicked() {
                                                    to_open = Some(card.id);
                                                }
                                            });
                                        }
                                        JobState::Failed(reason) => {
                                            ui.label(RichText::new(reason).color(Color32::RED));
                                        }
                                        other => {
                                            ui.label(other.label());
                                        }
                                    }
                                });
                            });
                            ui.add(
                                egui::ProgressBar::new(card.progress)
                                    .fill(card.bar_color())
                                    .show_percentage(),
                            );
                        });
                    }

                    for id in to_start {
                        self.queue.start(id);
                    }
                    for id in to_remove {
                        self.queue.remove(id);
                    }
                    if let Some(id) = to_open {
                        let folder = self
                            .queue
                            .registry()
                            .get(id)
                            .map(|job| job.output_dir().to_path_buf())
                            .unwrap_or_else(|| self.config.output_dir.clone());
                        open_folder(folder);
                    }
                });
        });

        egui::Area::new(egui::Id::new("paste_fab"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .show(ctx, |ui| {
                if ui
                    .add(egui::Button::new(RichText::new("▶ Paste URL").size(16.0)))
                    .on_hover_text("Add the URL on the clipboard")
                    .clicked()
                {
                    self.paste_from_clipboard(ctx);
                }
            });

        self.show_alert(ctx);

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

/// Opens the download folder in the platform file manager
fn open_folder(folder: PathBuf) {
    std::thread::spawn(move || {
        #[cfg(target_os = "windows")]
        {
            let _ = std::process::Command::new("explorer").arg(folder).spawn();
        }
        #[cfg(target_os = "macos")]
        {
            let _ = std::process::Command::new("open").arg(folder).spawn();
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            let _ = std::process::Command::new("xdg-open").arg(folder).spawn();
        }
    });
}
