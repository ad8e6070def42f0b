// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Page canvas with the draggable signature.
//!
//! This module draws page 1 at its rendered size, overlays the mark at the
//! session's placement, and translates raw pointer input into drag events.

use crate::models::session::SigningSession;
use crate::util::geometry::Point;

/// Result of canvas interaction.
pub enum CanvasAction {
    None,
    Press(Point),
    DragTo(Point),
    Release,
    Leave,
}

/// Display the page canvas and report pointer activity relative to the page.
pub fn show(
    ui: &mut egui::Ui,
    session: &SigningSession,
    page_texture: &Option<egui::TextureHandle>,
    mark_texture: &Option<egui::TextureHandle>,
    loading: bool,
) -> CanvasAction {
    let mut action = CanvasAction::None;
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        let Some(viewport) = session.viewport() else {
            if session.documents().current().is_some() || loading {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
            } else {
                show_welcome(ui);
            }
            return;
        };

        egui::ScrollArea::both()
            .drag_to_scroll(false)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let (page_rect, _) = ui.allocate_exact_size(
                    egui::vec2(viewport.width as f32, viewport.height as f32),
                    egui::Sense::hover(),
                );

                let painter = ui.painter_at(page_rect);
                painter.rect_filled(page_rect, 0.0, egui::Color32::WHITE);
                match page_texture {
                    Some(texture) => {
                        painter.image(
                            texture.id(),
                            page_rect,
                            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                            egui::Color32::WHITE,
                        );
                    }
                    None => {
                        painter.text(
                            page_rect.center(),
                            egui::Align2::CENTER_CENTER,
                            "Page preview unavailable",
                            egui::FontId::proportional(14.0),
                            egui::Color32::from_gray(170),
                        );
                    }
                }

                if let Some(texture) = mark_texture {
                    let placement = session.placement();
                    let mark = session.mark_size();
                    let mark_rect = egui::Rect::from_min_size(
                        page_rect.min + egui::vec2(placement.x as f32, placement.y as f32),
                        egui::vec2(mark.width as f32, mark.height as f32),
                    );

                    // Claim the drag so the scroll area and window ignore it
                    let response = ui.interact(
                        mark_rect,
                        ui.id().with("signature_mark"),
                        egui::Sense::drag(),
                    );
                    if response.hovered() || session.is_dragging() {
                        ui.ctx().set_cursor_icon(egui::CursorIcon::Move);
                    }

                    draw_mark(ui.painter(), texture, mark_rect, session.is_dragging());
                }

                action = pointer_action(ui, page_rect, session.is_dragging());
            });
    });

    action
}

/// Translate this frame's pointer state into a canvas action.
fn pointer_action(ui: &egui::Ui, page_rect: egui::Rect, dragging: bool) -> CanvasAction {
    let to_page = |pos: egui::Pos2| {
        Point::new((pos.x - page_rect.min.x) as f64, (pos.y - page_rect.min.y) as f64)
    };

    ui.input(|input| {
        let pointer = &input.pointer;
        let position = pointer.latest_pos();

        if dragging {
            if pointer.primary_released() {
                return CanvasAction::Release;
            }
            return match position {
                Some(pos) if page_rect.contains(pos) => CanvasAction::DragTo(to_page(pos)),
                _ => CanvasAction::Leave,
            };
        }

        match pointer.press_origin() {
            Some(pos) if pointer.primary_pressed() && page_rect.contains(pos) => {
                CanvasAction::Press(to_page(pos))
            }
            _ => CanvasAction::None,
        }
    })
}

fn draw_mark(
    painter: &egui::Painter,
    texture: &egui::TextureHandle,
    rect: egui::Rect,
    dragging: bool,
) {
    painter.rect_filled(rect, 2.0, egui::Color32::WHITE);
    painter.image(
        texture.id(),
        rect,
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );

    let border = if dragging {
        egui::Color32::from_rgb(37, 99, 235)
    } else {
        egui::Color32::from_rgb(96, 165, 250)
    };
    painter.rect_stroke(rect, 2.0, egui::Stroke::new(2.0, border));

    painter.text(
        rect.center_top() - egui::vec2(0.0, 4.0),
        egui::Align2::CENTER_BOTTOM,
        "Drag to position",
        egui::FontId::proportional(12.0),
        egui::Color32::from_rgb(37, 99, 235),
    );
}

fn show_welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("SIGPLACE")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("Signature Placement Tool")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Upload a PDF to see preview")
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → Open PDF...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}
