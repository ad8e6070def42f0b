// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! First-page layout for the preview canvas.
//!
//! The session only needs to know how big page 1 is natively and how big it
//! is on screen. A raster is a bonus: the default renderer lays the page out
//! from its MediaBox and leaves drawing to a blank sheet, while the `pdfium`
//! feature rasterizes the real page.

use crate::error::SignError;
use crate::io::media::Raster;
use crate::util::geometry::Size;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::sync::Arc;

/// A4 in points, used when a page carries no usable MediaBox.
const FALLBACK_PAGE: Size = Size {
    width: 595.0,
    height: 842.0,
};

/// Result of laying out the first page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Page size in PDF points.
    pub native: Size,
    /// Page size in screen pixels.
    pub rendered: Size,
    pub raster: Option<Raster>,
}

pub trait PageRenderer: Send + Sync {
    fn render_first_page(&self, pdf: &[u8], scale: f64) -> Result<RenderedPage, SignError>;
}

/// Lays out page 1 from its (possibly inherited) MediaBox. Draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct MediaBoxRenderer;

impl PageRenderer for MediaBoxRenderer {
    fn render_first_page(&self, pdf: &[u8], scale: f64) -> Result<RenderedPage, SignError> {
        let doc = Document::load_mem(pdf).map_err(|e| SignError::RenderingFailure(e.to_string()))?;
        let page_id = *doc
            .get_pages()
            .get(&1)
            .ok_or_else(|| SignError::RenderingFailure("document has no pages".into()))?;

        let native = page_size(&doc, page_id)?;
        let rendered = native.scaled(scale);
        if rendered.is_degenerate() {
            return Err(SignError::RenderingFailure(format!(
                "page renders to {:.1}x{:.1}",
                rendered.width, rendered.height
            )));
        }

        Ok(RenderedPage {
            native,
            rendered,
            raster: None,
        })
    }
}

/// Native size of a page, walking up the page tree for an inherited MediaBox.
pub fn page_size(doc: &Document, page_id: ObjectId) -> Result<Size, SignError> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc
            .get_dictionary(id)
            .map_err(|e| SignError::RenderingFailure(format!("page tree: {e}")))?;
        if let Some(size) = media_box(doc, dict) {
            return Ok(size);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    log::warn!("Page has no usable MediaBox, assuming A4");
    Ok(FALLBACK_PAGE)
}

fn media_box(doc: &Document, dict: &Dictionary) -> Option<Size> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let values = resolved
        .as_array()
        .ok()?
        .iter()
        .map(number)
        .collect::<Option<Vec<f64>>>()?;
    let [llx, lly, urx, ury] = values.as_slice() else {
        return None;
    };

    let size = Size::new((*urx - *llx).abs(), (*ury - *lly).abs());
    (!size.is_degenerate()).then_some(size)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRenderer;

#[cfg(feature = "pdfium")]
mod pdfium {
    use super::{PageRenderer, RenderedPage};
    use crate::error::SignError;
    use crate::io::media::Raster;
    use crate::util::geometry::Size;
    use pdfium_render::prelude::*;

    /// Rasterizes page 1 through a dynamically bound Pdfium library.
    pub struct PdfiumRenderer {
        pdfium: Pdfium,
    }

    impl PdfiumRenderer {
        pub fn bind() -> Result<Self, SignError> {
            let bindings =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                    .or_else(|_| Pdfium::bind_to_system_library())
                    .map_err(|e| {
                        SignError::RenderingFailure(format!("Failed to bind to Pdfium library: {e}"))
                    })?;
            Ok(Self {
                pdfium: Pdfium::new(bindings),
            })
        }
    }

    impl PageRenderer for PdfiumRenderer {
        fn render_first_page(&self, pdf: &[u8], scale: f64) -> Result<RenderedPage, SignError> {
            let failure = |e: PdfiumError| SignError::RenderingFailure(e.to_string());

            let document = self.pdfium.load_pdf_from_byte_slice(pdf, None).map_err(failure)?;
            let page = document.pages().get(0).map_err(failure)?;
            let native = Size::new(page.width().value as f64, page.height().value as f64);

            let config = PdfRenderConfig::new().scale_page_by_factor(scale as f32);
            let bitmap = page.render_with_config(&config).map_err(failure)?;
            let width = bitmap.width() as u32;
            let height = bitmap.height() as u32;

            Ok(RenderedPage {
                native,
                rendered: Size::new(width as f64, height as f64),
                raster: Some(Raster {
                    width,
                    height,
                    pixels: bitmap.as_rgba_bytes().to_vec(),
                }),
            })
        }
    }
}

/// Pick the best renderer this build supports.
pub fn default_renderer() -> Arc<dyn PageRenderer> {
    #[cfg(feature = "pdfium")]
    {
        match PdfiumRenderer::bind() {
            Ok(renderer) => {
                log::info!("Using Pdfium for page previews");
                return Arc::new(renderer);
            }
            Err(e) => log::warn!("{e}; falling back to blank page previews"),
        }
    }

    Arc::new(MediaBoxRenderer)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherited_media_box() {
        let pdf = fixtures::pdf_bytes(612, 792);
        let page = MediaBoxRenderer.render_first_page(&pdf, 1.0).unwrap();
        assert_eq!(page.native, Size::new(612.0, 792.0));
        assert_eq!(page.rendered, Size::new(612.0, 792.0));
        assert!(page.raster.is_none());
    }

    #[test]
    fn test_render_scale_applies_to_screen_size_only() {
        let pdf = fixtures::pdf_bytes(600, 800);
        let page = MediaBoxRenderer.render_first_page(&pdf, 0.5).unwrap();
        assert_eq!(page.native, Size::new(600.0, 800.0));
        assert_eq!(page.rendered, Size::new(300.0, 400.0));
    }

    #[test]
    fn test_not_a_pdf() {
        let err = MediaBoxRenderer
            .render_first_page(b"hello", 1.0)
            .unwrap_err();
        assert!(matches!(err, SignError::RenderingFailure(_)));
    }

    #[test]
    fn test_zero_scale_is_a_rendering_failure() {
        let pdf = fixtures::pdf_bytes(612, 792);
        assert!(MediaBoxRenderer.render_first_page(&pdf, 0.0).is_err());
    }
}
