// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait. It owns the signing session, runs the slow steps
//! (page layout, image decode, embedding) on background threads, and
//! routes UI actions into session transitions.

use crate::error::SignError;
use crate::io::media::{decode_preview, FileSelection, Raster};
use crate::io::render::{PageRenderer, RenderedPage};
use crate::io::save::DialogSaveTarget;
use crate::models::session::{ExportOutcome, NoticeLevel, SigningSession};
use crate::models::settings::Settings;
use crate::ui::{canvas, controls};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

/// A background result tagged with the generation it was started for.
type Tagged<T> = (u64, Result<T, SignError>);

/// Main application state.
pub struct SignerApp {
    session: SigningSession,

    renderer: Arc<dyn PageRenderer>,

    /// Rasterized page, when the renderer provides one
    page_texture: Option<egui::TextureHandle>,

    /// Decoded signature image
    mark_texture: Option<egui::TextureHandle>,

    /// Receiver for background page layout
    page_loader: Option<Receiver<Tagged<RenderedPage>>>,

    /// Receiver for background signature decoding
    mark_loader: Option<Receiver<Tagged<Raster>>>,

    /// Receiver for the running export
    exporter: Option<Receiver<ExportOutcome>>,
}

impl SignerApp {
    /// Create a new application instance.
    pub fn new(settings: &Settings, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            session: SigningSession::new(settings),
            renderer,
            page_texture: None,
            mark_texture: None,
            page_loader: None,
            mark_loader: None,
            exporter: None,
        }
    }

    fn is_loading(&self) -> bool {
        self.page_loader.is_some() || self.mark_loader.is_some()
    }

    /// Load a PDF and lay out its first page (asynchronously).
    fn open_document(&mut self, path: PathBuf) {
        let selection = match FileSelection::read(&path) {
            Ok(selection) => selection,
            Err(e) => {
                log::error!("{:#}", e);
                return;
            }
        };

        let bytes = selection.bytes.clone();
        let Ok(generation) = self.session.load_document(selection) else {
            return;
        };
        self.page_texture = None;

        let (sender, receiver) = channel();
        self.page_loader = Some(receiver);

        let renderer = Arc::clone(&self.renderer);
        let scale = self.session.render_scale();
        std::thread::spawn(move || {
            let result = renderer.render_first_page(&bytes, scale);
            let _ = sender.send((generation, result));
        });
    }

    /// Load a signature image and decode its preview (asynchronously).
    fn open_mark(&mut self, path: PathBuf) {
        let selection = match FileSelection::read(&path) {
            Ok(selection) => selection,
            Err(e) => {
                log::error!("{:#}", e);
                return;
            }
        };

        let bytes = selection.bytes.clone();
        let Ok(generation) = self.session.load_mark(selection) else {
            return;
        };
        self.mark_texture = None;

        let (sender, receiver) = channel();
        self.mark_loader = Some(receiver);

        std::thread::spawn(move || {
            let _ = sender.send((generation, decode_preview(&bytes)));
        });
    }

    /// Start embedding on a worker thread. The button is disabled until the
    /// outcome comes back.
    fn start_export(&mut self) {
        let job = match self.session.begin_export() {
            Ok(job) => job,
            Err(e) => {
                log::warn!("Export not started: {}", e);
                return;
            }
        };

        let (sender, receiver) = channel();
        self.exporter = Some(receiver);
        std::thread::spawn(move || {
            let _ = sender.send(job.run());
        });
    }

    fn poll_background(&mut self, ctx: &egui::Context) {
        if let Some(ref receiver) = self.page_loader {
            match receiver.try_recv() {
                Ok((generation, result)) => {
                    self.page_loader = None;
                    if let Some(raster) = self.session.apply_render(generation, result) {
                        self.page_texture = Some(upload(ctx, "page_preview", &raster));
                    }
                }
                Err(TryRecvError::Disconnected) => {
                    self.page_loader = None;
                    if let Some(generation) = self.session.documents().current().map(|d| d.generation) {
                        self.session.apply_render(
                            generation,
                            Err(SignError::RenderingFailure("page renderer stopped".into())),
                        );
                    }
                }
                Err(TryRecvError::Empty) => {}
            }
        }

        if let Some(ref receiver) = self.mark_loader {
            match receiver.try_recv() {
                Ok((generation, result)) => {
                    self.mark_loader = None;
                    if let Some(raster) = self.session.apply_preview(generation, result) {
                        self.mark_texture = Some(upload(ctx, "signature", &raster));
                    }
                }
                Err(TryRecvError::Disconnected) => {
                    self.mark_loader = None;
                    if let Some(generation) = self.session.marks().current().map(|m| m.generation) {
                        self.session.apply_preview(
                            generation,
                            Err(SignError::DecodeFailure("image decoder stopped".into())),
                        );
                    }
                }
                Err(TryRecvError::Empty) => {}
            }
        }

        if let Some(ref receiver) = self.exporter {
            match receiver.try_recv() {
                Ok(outcome) => {
                    self.exporter = None;
                    // Errors are already logged and shown by the session
                    let _ = self.session.finish_export(outcome, &DialogSaveTarget);
                }
                Err(TryRecvError::Disconnected) => {
                    self.exporter = None;
                    self.session
                        .abort_export(SignError::EmbedFailure("export worker stopped".into()));
                }
                Err(TryRecvError::Empty) => {}
            }
        }

        self.session.expire_completion(Instant::now());
    }

    fn handle_canvas(&mut self, action: canvas::CanvasAction) {
        match action {
            canvas::CanvasAction::Press(point) => {
                self.session.pointer_down(point);
            }
            canvas::CanvasAction::DragTo(point) => {
                self.session.pointer_move(point);
            }
            canvas::CanvasAction::Release => {
                self.session.pointer_up();
            }
            canvas::CanvasAction::Leave => {
                self.session.pointer_leave();
            }
            canvas::CanvasAction::None => {}
        }
    }

    fn pick_document(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PDF", &["pdf"])
            .pick_file()
        {
            self.open_document(path);
        }
    }

    fn pick_mark(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"])
            .pick_file()
        {
            self.open_mark(path);
        }
    }
}

fn upload(ctx: &egui::Context, name: &str, raster: &Raster) -> egui::TextureHandle {
    let size = [raster.width as usize, raster.height as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &raster.pixels);
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

impl eframe::App for SignerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_background(ctx);

        // Keep polling while background work or the "saved" badge is pending
        if self.is_loading() || self.exporter.is_some() || self.session.is_complete() {
            ctx.request_repaint();
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open PDF...").clicked() {
                        self.pick_document();
                        ui.close_menu();
                    }
                    if ui.button("Open Signature...").clicked() {
                        self.pick_mark();
                        ui.close_menu();
                    }
                    ui.separator();
                    let can_export = self.session.can_export();
                    if ui
                        .add_enabled(can_export, egui::Button::new("Download Signed PDF..."))
                        .clicked()
                    {
                        self.start_export();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match self.session.notice() {
                    Some(notice) => {
                        let color = match notice.level {
                            NoticeLevel::Info => ui.visuals().text_color(),
                            NoticeLevel::Success => egui::Color32::from_rgb(22, 163, 74),
                            NoticeLevel::Warning => ui.visuals().warn_fg_color,
                            NoticeLevel::Error => ui.visuals().error_fg_color,
                        };
                        ui.label(egui::RichText::new(&notice.text).color(color));
                    }
                    None => {
                        ui.label("No file loaded");
                    }
                }
                if self.session.is_dragging() {
                    ui.separator();
                    let p = self.session.placement();
                    ui.label(format!("Placing at ({:.0}, {:.0})", p.x, p.y));
                }
            });
        });

        // Controls panel (left side)
        let controls_action = egui::SidePanel::left("controls")
            .default_width(260.0)
            .show(ctx, |ui| controls::show(ui, &mut self.session, &self.mark_texture))
            .inner;

        match controls_action {
            controls::ControlsAction::OpenDocument => self.pick_document(),
            controls::ControlsAction::OpenMark => self.pick_mark(),
            controls::ControlsAction::Resize(width, height) => {
                self.session.set_display_size(width, height);
            }
            controls::ControlsAction::Export => self.start_export(),
            controls::ControlsAction::None => {}
        }

        // Main canvas (center)
        let loading = self.is_loading();
        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                canvas::show(
                    ui,
                    &self.session,
                    &self.page_texture,
                    &self.mark_texture,
                    loading,
                )
            })
            .inner;

        self.handle_canvas(canvas_action);
    }
}
