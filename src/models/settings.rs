// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! User-tunable defaults.
//!
//! Read once at startup from `settings.yaml` in the platform config
//! directory. Every field has a default so partial files are fine.

use crate::models::placement::Placement;
use crate::util::geometry::Size;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name used for the exported file when the name field is left empty.
pub const FALLBACK_EXPORT_NAME: &str = "signed-document";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Display size given to the mark before the user adjusts it.
    pub initial_mark_width: f64,
    pub initial_mark_height: f64,
    /// Where the mark first appears, relative to the page's top-left corner.
    pub initial_x: f64,
    pub initial_y: f64,
    /// Screen pixels per PDF point when laying out the page.
    pub render_scale: f64,
    pub fallback_export_name: String,
    /// How long the "saved" badge stays up after an export.
    pub complete_notice_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_mark_width: 100.0,
            initial_mark_height: 50.0,
            initial_x: 50.0,
            initial_y: 50.0,
            render_scale: 1.0,
            fallback_export_name: FALLBACK_EXPORT_NAME.to_string(),
            complete_notice_secs: 3,
        }
    }
}

impl Settings {
    /// Replace values that would break the session with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if !positive(self.initial_mark_width) {
            self.initial_mark_width = defaults.initial_mark_width;
        }
        if !positive(self.initial_mark_height) {
            self.initial_mark_height = defaults.initial_mark_height;
        }
        if !(self.initial_x.is_finite() && self.initial_x >= 0.0) {
            self.initial_x = defaults.initial_x;
        }
        if !(self.initial_y.is_finite() && self.initial_y >= 0.0) {
            self.initial_y = defaults.initial_y;
        }
        if !positive(self.render_scale) {
            log::warn!("Ignoring render_scale {}, using 1.0", self.render_scale);
            self.render_scale = defaults.render_scale;
        }
        if self.fallback_export_name.trim().is_empty() {
            self.fallback_export_name = defaults.fallback_export_name;
        }
        self
    }

    pub fn initial_mark_size(&self) -> Size {
        Size::new(self.initial_mark_width, self.initial_mark_height)
    }

    pub fn initial_placement(&self) -> Placement {
        Placement::new(self.initial_x, self.initial_y)
    }

    pub fn complete_notice(&self) -> Duration {
        Duration::from_secs(self.complete_notice_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings: Settings = serde_yaml::from_str("render_scale: 1.5\n").unwrap();
        assert_eq!(settings.render_scale, 1.5);
        assert_eq!(settings.initial_mark_size(), Size::new(100.0, 50.0));
        assert_eq!(settings.fallback_export_name, "signed-document");
    }

    #[test]
    fn test_sanitize_rejects_nonsense() {
        let settings = Settings {
            initial_mark_width: 0.0,
            initial_mark_height: -4.0,
            initial_x: f64::NAN,
            render_scale: 0.0,
            fallback_export_name: "  ".to_string(),
            ..Settings::default()
        }
        .sanitized();
        assert_eq!(settings, Settings::default());
    }
}
