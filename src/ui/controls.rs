// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Side panel with file pickers, mark sizing and the export button.

use crate::models::session::{ExportState, SigningSession};

/// Result of side panel interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlsAction {
    None,
    OpenDocument,
    OpenMark,
    Resize(f64, f64),
    Export,
}

/// Display the side panel.
pub fn show(
    ui: &mut egui::Ui,
    session: &mut SigningSession,
    mark_texture: &Option<egui::TextureHandle>,
) -> ControlsAction {
    let mut action = ControlsAction::None;

    ui.add_space(8.0);
    ui.heading("Upload PDF");
    if ui.button("📄 Choose PDF...").clicked() {
        action = ControlsAction::OpenDocument;
    }

    if let Some(doc) = session.documents().current() {
        let doc_name = doc.name.clone();
        ui.group(|ui| {
            ui.label(egui::RichText::new("Uploaded PDF:").weak());
            ui.label(egui::RichText::new(doc_name).strong());

            ui.add_space(6.0);
            ui.label("Download file name");
            let mut name = session.export_name().to_string();
            if ui.text_edit_singleline(&mut name).changed() {
                session.set_export_name(name);
            }
            ui.label(egui::RichText::new(session.export_file_name()).small().weak());
        });
    }

    ui.add_space(12.0);
    ui.separator();
    ui.heading("Upload Signature");
    if ui.button("✍ Choose image...").clicked() {
        action = ControlsAction::OpenMark;
    }

    if session.marks().current().is_some() {
        ui.group(|ui| {
            ui.label(egui::RichText::new("Preview:").weak());
            let size = session.mark_size();
            match mark_texture {
                Some(texture) => {
                    ui.add(
                        egui::Image::new(texture)
                            .fit_to_exact_size(egui::vec2(size.width as f32, size.height as f32)),
                    );
                }
                None => {
                    ui.spinner();
                }
            }

            if let Some((w, h)) = session.marks().current().and_then(|m| m.preview_size()) {
                ui.label(egui::RichText::new(format!("Source image {}×{}", w, h)).small().weak());
            }

            let mut width = size.width;
            let mut height = size.height;
            ui.horizontal(|ui| {
                ui.label("Width");
                ui.add(egui::DragValue::new(&mut width).speed(1.0).suffix(" px"));
            });
            ui.horizontal(|ui| {
                ui.label("Height");
                ui.add(egui::DragValue::new(&mut height).speed(1.0).suffix(" px"));
            });
            if width != size.width || height != size.height {
                action = ControlsAction::Resize(width, height);
            }
        });
    }

    if session.documents().current().is_some() && session.marks().current().is_some() {
        ui.add_space(12.0);
        ui.separator();

        let (label, fill) = match session.export_state() {
            ExportState::Complete { .. } => (
                "✔ Downloaded Successfully!",
                egui::Color32::from_rgb(22, 163, 74),
            ),
            ExportState::InFlight { .. } => ("⏳ Processing...", egui::Color32::from_gray(140)),
            ExportState::Ready => ("⬇ Download Signed PDF", egui::Color32::from_rgb(37, 99, 235)),
        };
        let button = egui::Button::new(egui::RichText::new(label).color(egui::Color32::WHITE).strong())
            .fill(fill)
            .min_size(egui::vec2(ui.available_width(), 40.0));

        let response = ui.add_enabled(session.can_export(), button);
        let response = match session.export_blocker() {
            Some(reason) => response.on_disabled_hover_text(reason),
            None => response,
        };
        if response.clicked() {
            action = ControlsAction::Export;
        }
    }

    action
}
