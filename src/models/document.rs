// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The PDF being signed.
//!
//! Only one document is held at a time. Its page dimensions arrive later
//! from the renderer, tagged with the generation they were requested for.

use crate::error::SignError;
use crate::io::media::FileSelection;
use crate::util::geometry::Size;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub generation: u64,
    /// Page 1 size in points, once laid out.
    native: Option<Size>,
    /// Page 1 size on screen, once laid out.
    rendered: Option<Size>,
}

impl LoadedDocument {
    pub fn native_size(&self) -> Option<Size> {
        self.native
    }

    pub fn rendered_size(&self) -> Option<Size> {
        self.rendered
    }

    /// The file name without its `.pdf` extension.
    pub fn base_name(&self) -> String {
        let path = Path::new(&self.name);
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DocumentSource {
    current: Option<LoadedDocument>,
    generation: u64,
}

impl DocumentSource {
    pub fn current(&self) -> Option<&LoadedDocument> {
        self.current.as_ref()
    }

    /// Rendered size of the current page, if it has finished laying out.
    pub fn rendered_size(&self) -> Option<Size> {
        self.current.as_ref().and_then(LoadedDocument::rendered_size)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|doc| doc.generation == generation)
    }

    /// Replace the current document. Non-PDF content is rejected untouched.
    pub fn load(&mut self, selection: FileSelection) -> Result<&LoadedDocument, SignError> {
        if !selection.is_pdf() {
            return Err(SignError::InvalidFileType {
                expected: "a PDF document",
                found: selection.describe_type(),
            });
        }

        self.generation += 1;
        log::info!(
            "Loaded document {} ({} bytes, generation {})",
            selection.name,
            selection.bytes.len(),
            self.generation
        );
        Ok(&*self.current.insert(LoadedDocument {
            name: selection.name,
            bytes: selection.bytes.into(),
            generation: self.generation,
            native: None,
            rendered: None,
        }))
    }

    /// Record page dimensions for `generation`. Returns `false` when the
    /// document has been replaced since the layout was requested.
    pub fn set_layout(
        &mut self,
        generation: u64,
        native: Size,
        rendered: Size,
    ) -> Result<bool, SignError> {
        let Some(doc) = self.current.as_mut().filter(|doc| doc.generation == generation) else {
            return Ok(false);
        };
        if rendered.is_degenerate() || native.is_degenerate() {
            return Err(SignError::RenderingFailure(format!(
                "page reported as {:.1}x{:.1}",
                rendered.width, rendered.height
            )));
        }

        doc.native = Some(native);
        doc.rendered = Some(rendered);
        Ok(true)
    }
}
