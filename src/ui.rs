// UI module for the MoodLens application

use crate::camera::LiveSession;
use crate::image_source::{ImageInput, PixelOrder};
use crate::models::DetectionRecord;
use crate::pipeline::{DetectionOutcome, DetectionPipeline};
use crate::store::DetectionStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Poll interval for the live view; keeps the loop bounded and cancellable
const LIVE_POLL_INTERVAL: Duration = Duration::from_millis(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Upload,
    Live,
    History,
}

/// A user-visible status line; informational outcomes are rendered
/// distinctly from errors
enum Status {
    Success(String),
    Info(String),
    Error(String),
}

impl Status {
    fn show(&self, ui: &mut egui::Ui) {
        match self {
            Status::Success(text) => {
                ui.colored_label(egui::Color32::from_rgb(67, 160, 71), text)
            }
            Status::Info(text) => ui.colored_label(egui::Color32::LIGHT_BLUE, text),
            Status::Error(text) => ui.colored_label(egui::Color32::from_rgb(229, 57, 53), text),
        };
    }
}

/// An image dropped into the upload tab, held until the user predicts
struct PendingUpload {
    input: ImageInput,
    label: String,
    texture: egui::TextureHandle,
}

/// Main application UI
pub struct MoodLensApp {
    pipeline: DetectionPipeline,
    store: Arc<DetectionStore>,
    live: LiveSession,
    active_tab: Tab,

    upload: Option<PendingUpload>,
    upload_status: Option<Status>,

    camera_texture: Option<egui::TextureHandle>,
    live_status: Option<Status>,

    history: Vec<DetectionRecord>,
    history_stale: bool,
    history_status: Option<Status>,
    thumbnails: HashMap<i64, egui::TextureHandle>,
}

impl MoodLensApp {
    /// Creates a new MoodLensApp
    pub fn new(pipeline: DetectionPipeline, store: Arc<DetectionStore>) -> Self {
        Self {
            pipeline,
            store,
            live: LiveSession::new(),
            active_tab: Tab::Upload,
            upload: None,
            upload_status: None,
            camera_texture: None,
            live_status: None,
            history: Vec::new(),
            history_stale: true,
            history_status: None,
            thumbnails: HashMap::new(),
        }
    }

    fn load_rgba_texture(
        ctx: &egui::Context,
        name: &str,
        image: &image::DynamicImage,
    ) -> egui::TextureHandle {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [width as usize, height as usize],
            rgba.as_raw(),
        );
        ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
    }

    /// Renders the tab selector row
    fn render_tab_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("tab_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for (tab, label) in [
                    (Tab::Upload, "Image Upload"),
                    (Tab::Live, "Live Capture"),
                    (Tab::History, "History"),
                ] {
                    if ui
                        .selectable_label(self.active_tab == tab, label)
                        .clicked()
                        && self.active_tab != tab
                    {
                        // Leaving the live tab must not keep the camera open
                        if self.active_tab == Tab::Live {
                            self.live.stop();
                            self.camera_texture = None;
                        }
                        self.active_tab = tab;
                    }
                }
            });
        });
    }

    /// Accepts a file dropped anywhere in the window while the upload tab
    /// is active
    fn take_dropped_file(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|input| input.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };

        let input = if let Some(bytes) = file.bytes {
            ImageInput::Bytes {
                name: file.name.clone(),
                data: bytes.to_vec(),
            }
        } else if let Some(path) = file.path {
            ImageInput::Path(path)
        } else {
            return;
        };

        match input.decode() {
            Ok(image) => {
                let label = input
                    .display_name()
                    .unwrap_or_else(|| "dropped image".to_string());
                let texture = Self::load_rgba_texture(ctx, "upload_preview", &image);
                self.upload = Some(PendingUpload {
                    input,
                    label,
                    texture,
                });
                self.upload_status = None;
            }
            Err(e) => {
                self.upload_status = Some(Status::Error(format!("Could not read image: {e}")));
            }
        }
    }

    fn render_upload_tab(&mut self, ctx: &egui::Context) {
        self.take_dropped_file(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Image Emotion Detector");
            ui.label("Drop a picture here and I'll tell you what emotion it shows!");
            ui.add_space(8.0);

            let Some(upload) = &self.upload else {
                ui.label("Waiting for an image (jpg, png, webp)...");
                return;
            };

            ui.label(&upload.label);
            ui.add(
                egui::Image::new(&upload.texture)
                    .max_size(egui::vec2(420.0, 420.0))
                    .maintain_aspect_ratio(true),
            );
            ui.add_space(8.0);

            if ui.button("Predict Emotion").clicked() {
                let input = upload.input.clone();
                self.upload_status = Some(self.run_prediction(&input));
            }

            if let Some(status) = &self.upload_status {
                ui.add_space(4.0);
                status.show(ui);
            }
        });
    }

    /// Runs the pipeline for one input and folds the outcome into a status
    fn run_prediction(&mut self, input: &ImageInput) -> Status {
        match self.pipeline.run_once(input, None) {
            Ok(DetectionOutcome::Detected { prediction, .. }) => {
                self.history_stale = true;
                Status::Success(format!(
                    "Detected Emotion: {} {} ({:.2}%)",
                    prediction.emotion,
                    prediction.emotion.emoji(),
                    prediction.confidence_percent()
                ))
            }
            Ok(DetectionOutcome::NoDetection) => {
                Status::Info("No face detected. Try another image.".to_string())
            }
            Err(e) => {
                error!("Prediction failed: {}", e);
                Status::Error(format!("Prediction failed: {e}"))
            }
        }
    }

    fn render_live_tab(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Live Capture");

            if !self.live.is_streaming() {
                ui.label("Start the camera to capture a live image");
                if ui.button("Start Camera").clicked() {
                    if let Err(e) = self.live.start() {
                        error!("Camera start failed: {}", e);
                        self.live_status = Some(Status::Error(e.to_string()));
                    } else {
                        self.live_status = None;
                    }
                }
            } else {
                ui.horizontal(|ui| {
                    if ui.button("Stop Camera").clicked() {
                        self.live.stop();
                        self.camera_texture = None;
                    }
                    if ui.button("Analyze Emotion").clicked() {
                        if let Some(frame) = self.live.request_analyze() {
                            let input = ImageInput::Frame {
                                frame,
                                order: PixelOrder::Rgb,
                            };
                            self.live_status = Some(self.run_prediction(&input));
                            self.live.finish();
                            self.camera_texture = None;
                        }
                    }
                });
            }

            // Poll one frame per repaint while streaming; the session
            // releases the camera itself if the read fails
            if self.live.is_streaming() {
                match self.live.poll_frame() {
                    Ok(frame) => {
                        let color_image = egui::ColorImage::from_rgb(
                            [frame.width as usize, frame.height as usize],
                            &frame.data,
                        );
                        self.camera_texture = Some(ctx.load_texture(
                            "camera",
                            color_image,
                            egui::TextureOptions::LINEAR,
                        ));
                    }
                    Err(e) => {
                        self.live_status = Some(Status::Error(format!(
                            "Failed to access the camera: {e}"
                        )));
                        self.camera_texture = None;
                    }
                }
                ctx.request_repaint_after(LIVE_POLL_INTERVAL);
            }

            if let Some(texture) = &self.camera_texture {
                ui.add(
                    egui::Image::new(texture)
                        .max_size(egui::vec2(640.0, 480.0))
                        .maintain_aspect_ratio(true),
                );
            }

            if let Some(status) = &self.live_status {
                ui.add_space(4.0);
                status.show(ui);
            }
        });
    }

    fn refresh_history(&mut self) {
        if !self.history_stale {
            return;
        }
        match self.store.list_all() {
            Ok(records) => {
                let live_ids: std::collections::HashSet<i64> =
                    records.iter().map(|r| r.id).collect();
                self.thumbnails.retain(|id, _| live_ids.contains(id));
                self.history = records;
                self.history_stale = false;
                self.history_status = None;
            }
            Err(e) => {
                error!("Failed to load history: {}", e);
                self.history_status = Some(Status::Error(format!("Failed to load history: {e}")));
                self.history_stale = false;
            }
        }
    }

    fn thumbnail_texture(
        thumbnails: &mut HashMap<i64, egui::TextureHandle>,
        ctx: &egui::Context,
        record: &DetectionRecord,
    ) -> Option<egui::TextureHandle> {
        if let Some(texture) = thumbnails.get(&record.id) {
            return Some(texture.clone());
        }
        let data = record.image_data.as_ref()?;
        let image = image::load_from_memory(data).ok()?.thumbnail(120, 120);
        let texture = Self::load_rgba_texture(ctx, &format!("thumb_{}", record.id), &image);
        thumbnails.insert(record.id, texture.clone());
        Some(texture)
    }

    fn render_history_tab(&mut self, ctx: &egui::Context) {
        self.refresh_history();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Detection History");

            if let Some(status) = &self.history_status {
                status.show(ui);
            }

            if self.history.is_empty() {
                ui.label("No history available. Analyze images to see detection history.");
                return;
            }

            ui.label(format!("Total Records: {}", self.history.len()));
            ui.add_space(6.0);

            let mut delete_requested = None;
            egui::ScrollArea::vertical().show(ui, |ui| {
                for record in &self.history {
                    ui.horizontal(|ui| {
                        if let Some(texture) =
                            Self::thumbnail_texture(&mut self.thumbnails, ctx, record)
                        {
                            ui.add(
                                egui::Image::new(&texture)
                                    .max_size(egui::vec2(100.0, 100.0))
                                    .maintain_aspect_ratio(true),
                            );
                        }
                        ui.vertical(|ui| {
                            ui.label(format!("Image Name: {}", record.image_name));
                            ui.label(format!(
                                "Detected Emotion: {} {}",
                                record.emotion,
                                record.emotion.emoji()
                            ));
                            ui.label(format!(
                                "Confidence: {:.2}%",
                                record.confidence * 100.0
                            ));
                            ui.label(&record.timestamp);
                            if ui.button("Delete").clicked() {
                                delete_requested = Some(record.id);
                            }
                        });
                    });
                    ui.separator();
                }
            });

            if let Some(id) = delete_requested {
                if let Err(e) = self.store.delete(id) {
                    error!("Failed to delete record {}: {}", id, e);
                    self.history_status =
                        Some(Status::Error(format!("Failed to delete record: {e}")));
                }
                self.history_stale = true;
            }
        });
    }
}

impl eframe::App for MoodLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.render_tab_bar(ctx);

        match self.active_tab {
            Tab::Upload => self.render_upload_tab(ctx),
            Tab::Live => self.render_live_tab(ctx),
            Tab::History => self.render_history_tab(ctx),
        }
    }
}
