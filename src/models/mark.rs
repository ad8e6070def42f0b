// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The signature image and its on-screen size.

use crate::error::SignError;
use crate::io::media::FileSelection;
use crate::util::geometry::Size;
use std::sync::Arc;

/// Smallest width or height the mark may be given, in pixels.
pub const MIN_MARK_SIDE: f64 = 1.0;

/// Largest width or height the mark may be given, in pixels.
pub const MAX_MARK_SIDE: f64 = 10_000.0;

/// Image encodings as far as embedding is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkFormat {
    Png,
    Jpeg,
    /// Any other image type. Previewable, but refused at export.
    Unsupported(&'static str),
}

impl MarkFormat {
    pub fn from_mime(mime: &'static str) -> Self {
        match mime {
            "image/png" => MarkFormat::Png,
            "image/jpeg" => MarkFormat::Jpeg,
            other => MarkFormat::Unsupported(other),
        }
    }

    pub fn is_embeddable(&self) -> bool {
        !matches!(self, MarkFormat::Unsupported(_))
    }
}

#[derive(Debug, Clone)]
pub struct LoadedMark {
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub format: MarkFormat,
    pub generation: u64,
    /// Pixel dimensions of the decoded preview; `None` while decoding.
    preview: Option<(u32, u32)>,
}

impl LoadedMark {
    pub fn preview_size(&self) -> Option<(u32, u32)> {
        self.preview
    }

    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }
}

/// Holds the current mark plus the display size, which outlives any single
/// image: replacing the signature keeps the size the user dialled in.
#[derive(Debug)]
pub struct MarkSource {
    current: Option<LoadedMark>,
    generation: u64,
    display: Size,
}

impl MarkSource {
    pub fn new(initial_display: Size) -> Self {
        Self {
            current: None,
            generation: 0,
            display: clamp_display(initial_display, Size::new(MIN_MARK_SIDE, MIN_MARK_SIDE)),
        }
    }

    pub fn current(&self) -> Option<&LoadedMark> {
        self.current.as_ref()
    }

    pub fn display_size(&self) -> Size {
        self.display
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|mark| mark.generation == generation)
    }

    /// Replace the current mark. Anything that is not an image is rejected
    /// without touching state.
    pub fn load(&mut self, selection: FileSelection) -> Result<&LoadedMark, SignError> {
        let mime = match selection.mime {
            Some(mime) if selection.is_image() => mime,
            _ => {
                return Err(SignError::InvalidFileType {
                    expected: "a PNG or JPEG image",
                    found: selection.describe_type(),
                })
            }
        };

        let format = MarkFormat::from_mime(mime);
        if !format.is_embeddable() {
            log::warn!("{} is {}, it can be previewed but not embedded", selection.name, mime);
        }

        self.generation += 1;
        log::info!(
            "Loaded signature {} ({}, {} bytes, generation {})",
            selection.name,
            mime,
            selection.bytes.len(),
            self.generation
        );
        Ok(&*self.current.insert(LoadedMark {
            name: selection.name,
            bytes: selection.bytes.into(),
            format,
            generation: self.generation,
            preview: None,
        }))
    }

    /// Mark the preview for `generation` as decoded. Returns `false` if the
    /// image has been replaced in the meantime.
    pub fn set_preview(&mut self, generation: u64, width: u32, height: u32) -> bool {
        match self.current.as_mut() {
            Some(mark) if mark.generation == generation => {
                mark.preview = Some((width, height));
                true
            }
            _ => false,
        }
    }

    /// Drop the mark for `generation`, e.g. when its image cannot be
    /// decoded. Returns `false` if it was already replaced.
    pub fn discard(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        if let Some(mark) = self.current.take() {
            log::info!("Dropped signature {} (generation {})", mark.name, generation);
        }
        true
    }

    /// Set the display size, clamping each side to `MIN_MARK_SIDE..=MAX_MARK_SIDE`.
    /// Non-finite input keeps the previous value for that side.
    pub fn set_display_size(&mut self, width: f64, height: f64) -> Size {
        self.display = clamp_display(Size::new(width, height), self.display);
        self.display
    }
}

fn clamp_display(requested: Size, previous: Size) -> Size {
    let side = |value: f64, fallback: f64| {
        if value.is_finite() {
            value.clamp(MIN_MARK_SIDE, MAX_MARK_SIDE)
        } else {
            fallback
        }
    };
    Size::new(
        side(requested.width, previous.width),
        side(requested.height, previous.height),
    )
}
