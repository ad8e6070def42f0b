// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Settings serialization and deserialization.
//!
//! This module handles reading and writing the settings file in YAML
//! and JSON formats.

use crate::models::settings::Settings;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "sigplace";
const SETTINGS_FILENAME: &str = "settings.yaml";

/// Export settings to YAML format.
pub fn export_yaml(data: &Settings, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Import settings from YAML format.
pub fn import_yaml(path: &Path) -> Result<Settings> {
    let yaml = std::fs::read_to_string(path)?;
    let data = serde_yaml::from_str(&yaml)?;
    Ok(data)
}

/// Import settings from JSON format.
pub fn import_json(path: &Path) -> Result<Settings> {
    let json = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(&json)?;
    Ok(data)
}

/// Import settings, choosing the format by file extension.
pub fn import_settings(path: &Path) -> Result<Settings> {
    let extension = path.extension().and_then(|s| s.to_str());
    let settings = match extension {
        Some("yaml") | Some("yml") => import_yaml(path),
        Some("json") => import_json(path),
        _ => bail!("Unsupported settings extension: {:?}", extension),
    }
    .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    Ok(settings.sanitized())
}

pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load the settings file, writing one with defaults on first run.
///
/// Never fails: problems are logged and defaults are used.
pub fn load_settings() -> Settings {
    let Some(path) = settings_path() else {
        log::warn!("Could not determine config directory, using default settings");
        return Settings::default();
    };

    if path.exists() {
        match import_settings(&path) {
            Ok(settings) => {
                log::debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::error!("{:#}", e);
                Settings::default()
            }
        }
    } else {
        log::info!("Settings file not found, creating with defaults at {}", path.display());
        let settings = Settings::default();
        if let Err(e) = export_yaml(&settings, &path) {
            log::warn!("Failed to write default settings: {}", e);
        }
        settings
    }
}
