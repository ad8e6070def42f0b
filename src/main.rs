// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! SIGPLACE - Signature Placement Tool
//!
//! A cross-platform desktop application for placing a signature image
//! on the first page of a PDF and saving the stamped document.

mod app;
mod error;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::SignerApp;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let settings = io::serialization::load_settings();
    let renderer = io::render::default_renderer();

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("SIGPLACE - Signature Placement Tool"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "SIGPLACE",
        options,
        Box::new(move |_cc| Ok(Box::new(SignerApp::new(&settings, renderer)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
