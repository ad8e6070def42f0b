// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading (PDF documents and signature images).
//!
//! This module reads picked files into memory, identifies them by their
//! magic bytes, and decodes signature images into RGBA pixels suitable
//! for display in egui.

use crate::error::SignError;
use anyhow::{Context, Result};
use infer::Infer;
use std::path::Path;

/// A picked file, read into memory and sniffed.
#[derive(Debug, Clone)]
pub struct FileSelection {
    pub name: String,
    pub bytes: Vec<u8>,
    /// MIME type detected from content, `None` if unrecognised.
    pub mime: Option<&'static str>,
}

impl FileSelection {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime = Infer::new().get(&bytes).map(|kind| kind.mime_type());
        Self {
            name: name.into(),
            bytes,
            mime,
        }
    }

    /// Read a file from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime == Some("application/pdf")
    }

    pub fn is_image(&self) -> bool {
        self.mime.is_some_and(|mime| mime.starts_with("image/"))
    }

    /// Human readable type for error messages.
    pub fn describe_type(&self) -> String {
        match self.mime {
            Some(mime) => mime.to_string(),
            None => format!("unrecognised content ({})", self.name),
        }
    }
}

/// Decoded RGBA pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode an image into RGBA for the on-screen preview.
pub fn decode_preview(bytes: &[u8]) -> Result<Raster, SignError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| SignError::DecodeFailure(e.to_string()))?
        .to_rgba8();

    Ok(Raster {
        width: decoded.width(),
        height: decoded.height(),
        pixels: decoded.into_raw(),
    })
}

/// Encoders used to build in-memory fixtures for tests across the crate.
#[cfg(test)]
pub mod fixtures {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([20, 40, 200, 128]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 10, 10]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    pub fn gif_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
            .unwrap();
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniffs_by_content_not_name() {
        let selection = FileSelection::from_bytes("notes.pdf", b"just some text\n".to_vec());
        assert!(!selection.is_pdf());
        assert!(!selection.is_image());

        let selection = FileSelection::from_bytes("scan.txt", b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n".to_vec());
        assert!(selection.is_pdf());
    }

    #[test]
    fn test_recognises_images() {
        let png = FileSelection::from_bytes("sig.png", fixtures::png_bytes(4, 2));
        assert_eq!(png.mime, Some("image/png"));
        assert!(png.is_image());

        let jpeg = FileSelection::from_bytes("sig.jpg", fixtures::jpeg_bytes(4, 2));
        assert_eq!(jpeg.mime, Some("image/jpeg"));
    }

    #[test]
    fn test_decode_preview() {
        let raster = decode_preview(&fixtures::png_bytes(6, 3)).unwrap();
        assert_eq!((raster.width, raster.height), (6, 3));
        assert_eq!(raster.pixels.len(), 6 * 3 * 4);
        assert_eq!(&raster.pixels[..4], &[20, 40, 200, 128]);
    }

    #[test]
    fn test_decode_preview_rejects_garbage() {
        let err = decode_preview(b"\x89PNG\r\n\x1a\nbroken").unwrap_err();
        assert!(matches!(err, SignError::DecodeFailure(_)));
    }
}
