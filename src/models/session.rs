// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Session state for one signing workflow.
//!
//! `SigningSession` owns the document, the mark, the placement and the
//! export lifecycle. The UI mutates it only through the methods here, and
//! background work reports back through the `apply_*`/`finish_*` methods,
//! which drop results belonging to a file that has since been replaced.

use crate::error::SignError;
use crate::io::export::embed_mark;
use crate::io::media::{FileSelection, Raster};
use crate::io::render::RenderedPage;
use crate::io::save::SaveTarget;
use crate::models::document::DocumentSource;
use crate::models::mark::{MarkFormat, MarkSource};
use crate::models::placement::{Placement, PlacementTracker};
use crate::models::settings::Settings;
use crate::util::geometry::{map_to_page, PagePlacement, Point, Size};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One line of feedback for the status bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportState {
    Ready,
    InFlight {
        document_generation: u64,
        mark_generation: u64,
    },
    Complete {
        at: Instant,
    },
}

/// Everything an export needs, detached from the session so it can run on
/// a worker thread.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub document_generation: u64,
    pub mark_generation: u64,
    pub file_name: String,
    pub at: PagePlacement,
    pdf: Arc<[u8]>,
    image: Arc<[u8]>,
    format: MarkFormat,
}

impl ExportJob {
    pub fn run(self) -> ExportOutcome {
        let result = embed_mark(&self.pdf, &self.image, &self.format, self.at);
        ExportOutcome {
            document_generation: self.document_generation,
            mark_generation: self.mark_generation,
            file_name: self.file_name,
            result,
        }
    }
}

#[derive(Debug)]
pub struct ExportOutcome {
    pub document_generation: u64,
    pub mark_generation: u64,
    pub file_name: String,
    pub result: Result<Vec<u8>, SignError>,
}

pub struct SigningSession {
    documents: DocumentSource,
    marks: MarkSource,
    tracker: PlacementTracker,
    export_name: String,
    export: ExportState,
    notice: Option<Notice>,
    fallback_export_name: String,
    complete_notice: Duration,
    render_scale: f64,
}

impl SigningSession {
    pub fn new(settings: &Settings) -> Self {
        Self {
            documents: DocumentSource::default(),
            marks: MarkSource::new(settings.initial_mark_size()),
            tracker: PlacementTracker::new(settings.initial_placement()),
            export_name: String::new(),
            export: ExportState::Ready,
            notice: None,
            fallback_export_name: settings.fallback_export_name.clone(),
            complete_notice: settings.complete_notice(),
            render_scale: settings.render_scale,
        }
    }

    pub fn documents(&self) -> &DocumentSource {
        &self.documents
    }

    pub fn marks(&self) -> &MarkSource {
        &self.marks
    }

    pub fn placement(&self) -> Placement {
        self.tracker.placement()
    }

    pub fn is_dragging(&self) -> bool {
        self.tracker.is_dragging()
    }

    pub fn export_state(&self) -> ExportState {
        self.export
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn render_scale(&self) -> f64 {
        self.render_scale
    }

    pub fn viewport(&self) -> Option<Size> {
        self.documents.rendered_size()
    }

    pub fn mark_size(&self) -> Size {
        self.marks.display_size()
    }

    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    pub fn set_export_name(&mut self, name: impl Into<String>) {
        self.export_name = name.into();
    }

    /// File name for the exported document.
    pub fn export_file_name(&self) -> String {
        let name = self.export_name.trim();
        if name.is_empty() {
            format!("{}.pdf", self.fallback_export_name)
        } else {
            format!("{}.pdf", name)
        }
    }

    fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
        });
    }

    /// Select a new PDF. Returns the generation to request a layout for.
    pub fn load_document(&mut self, selection: FileSelection) -> Result<u64, SignError> {
        let doc = match self.documents.load(selection) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("Rejected document: {}", e);
                self.notify(NoticeLevel::Warning, format!("Rejected document: {e}"));
                return Err(e);
            }
        };

        let generation = doc.generation;
        let text = format!("Loaded {}", doc.name);
        self.export_name = doc.base_name();
        self.clear_completion();
        self.notify(NoticeLevel::Info, text);
        Ok(generation)
    }

    /// Apply a finished page layout. Returns the page raster, if the layout
    /// is current and the renderer produced one.
    pub fn apply_render(
        &mut self,
        generation: u64,
        result: Result<RenderedPage, SignError>,
    ) -> Option<Raster> {
        if !self.documents.is_current(generation) {
            log::warn!("Discarding layout for replaced document (generation {})", generation);
            return None;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::error!("{}", e);
                self.notify(NoticeLevel::Error, format!("{e}. Export is disabled for this document."));
                return None;
            }
        };

        match self.documents.set_layout(generation, page.native, page.rendered) {
            Ok(true) => {
                log::info!(
                    "Page laid out at {:.0}x{:.0} px ({:.0}x{:.0} pt)",
                    page.rendered.width,
                    page.rendered.height,
                    page.native.width,
                    page.native.height
                );
                self.reclamp();
                page.raster
            }
            Ok(false) => None,
            Err(e) => {
                log::error!("{}", e);
                self.notify(NoticeLevel::Error, format!("{e}. Export is disabled for this document."));
                None
            }
        }
    }

    /// Select a new signature image. Returns the generation to decode a
    /// preview for.
    pub fn load_mark(&mut self, selection: FileSelection) -> Result<u64, SignError> {
        let mark = match self.marks.load(selection) {
            Ok(mark) => mark,
            Err(e) => {
                log::warn!("Rejected signature: {}", e);
                self.notify(NoticeLevel::Warning, format!("Rejected signature: {e}"));
                return Err(e);
            }
        };

        let generation = mark.generation;
        let text = match &mark.format {
            MarkFormat::Unsupported(mime) => {
                format!("{} is {mime}; only PNG and JPEG can be embedded", mark.name)
            }
            _ => format!("Loaded {}", mark.name),
        };
        let level = if mark.format.is_embeddable() {
            NoticeLevel::Info
        } else {
            NoticeLevel::Warning
        };
        self.clear_completion();
        self.notify(level, text);
        Ok(generation)
    }

    /// Apply a decoded preview. Returns the raster for display when current.
    pub fn apply_preview(
        &mut self,
        generation: u64,
        result: Result<Raster, SignError>,
    ) -> Option<Raster> {
        if !self.marks.is_current(generation) {
            log::warn!("Discarding preview for replaced signature (generation {})", generation);
            return None;
        }

        match result {
            Ok(raster) => {
                self.marks.set_preview(generation, raster.width, raster.height);
                self.reclamp();
                Some(raster)
            }
            Err(e) => {
                log::error!("Could not decode signature: {}", e);
                self.marks.discard(generation);
                self.notify(
                    NoticeLevel::Error,
                    format!("{e}. Choose another signature image."),
                );
                None
            }
        }
    }

    pub fn set_display_size(&mut self, width: f64, height: f64) {
        self.marks.set_display_size(width, height);
        self.reclamp();
    }

    fn reclamp(&mut self) {
        if let Some(viewport) = self.viewport() {
            self.tracker.reclamp(viewport, self.marks.display_size());
        }
    }

    /// The mark can be dragged once the page is laid out and the image is
    /// decoded.
    pub fn has_drag_target(&self) -> bool {
        self.viewport().is_some() && self.marks.current().is_some_and(|m| m.has_preview())
    }

    pub fn pointer_down(&mut self, pointer: Point) -> bool {
        self.has_drag_target() && self.tracker.pointer_down(pointer, self.marks.display_size())
    }

    pub fn pointer_move(&mut self, pointer: Point) -> bool {
        match self.viewport() {
            Some(viewport) => self
                .tracker
                .pointer_move(pointer, viewport, self.marks.display_size()),
            None => false,
        }
    }

    pub fn pointer_up(&mut self) -> bool {
        self.tracker.pointer_up()
    }

    pub fn pointer_leave(&mut self) -> bool {
        self.tracker.pointer_leave()
    }

    /// Why export is unavailable right now, if it is.
    pub fn export_blocker(&self) -> Option<&'static str> {
        if matches!(self.export, ExportState::InFlight { .. }) {
            return Some("an export is already running");
        }
        let Some(doc) = self.documents.current() else {
            return Some("no PDF selected");
        };
        if doc.rendered_size().is_none() {
            return Some("the page has not been laid out");
        }
        match self.marks.current() {
            None => Some("no signature selected"),
            Some(mark) if !mark.has_preview() => Some("the signature is still decoding"),
            Some(_) => None,
        }
    }

    pub fn can_export(&self) -> bool {
        self.export_blocker().is_none()
    }

    /// Snapshot everything needed for an export and mark one as running.
    pub fn begin_export(&mut self) -> Result<ExportJob, SignError> {
        if matches!(self.export, ExportState::InFlight { .. }) {
            log::warn!("Ignoring export request while another is running");
            return Err(SignError::ExportInFlight);
        }
        if let Some(reason) = self.export_blocker() {
            return Err(SignError::NotReady(reason));
        }

        let (Some(doc), Some(mark)) = (self.documents.current(), self.marks.current()) else {
            return Err(SignError::NotReady("no PDF or signature selected"));
        };
        let (Some(rendered), Some(native)) = (doc.rendered_size(), doc.native_size()) else {
            return Err(SignError::NotReady("the page has not been laid out"));
        };
        let at = map_to_page(rendered, native, self.tracker.placement(), self.marks.display_size())
            .ok_or(SignError::NotReady("the page has not been laid out"))?;

        let job = ExportJob {
            document_generation: doc.generation,
            mark_generation: mark.generation,
            file_name: self.export_file_name(),
            at,
            pdf: Arc::clone(&doc.bytes),
            image: Arc::clone(&mark.bytes),
            format: mark.format.clone(),
        };

        log::info!(
            "Exporting {} with signature at ({:.1}, {:.1}) pt",
            job.file_name,
            at.x,
            at.y
        );
        self.export = ExportState::InFlight {
            document_generation: job.document_generation,
            mark_generation: job.mark_generation,
        };
        self.notify(NoticeLevel::Info, "Embedding signature...");
        Ok(job)
    }

    /// Take a finished export and save it, unless the files it was built
    /// from have been replaced in the meantime.
    pub fn finish_export(
        &mut self,
        outcome: ExportOutcome,
        target: &dyn SaveTarget,
    ) -> Result<Option<PathBuf>, SignError> {
        self.export = ExportState::Ready;

        if !self.documents.is_current(outcome.document_generation)
            || !self.marks.is_current(outcome.mark_generation)
        {
            log::warn!("Discarding export of {}: files changed while it ran", outcome.file_name);
            self.notify(
                NoticeLevel::Warning,
                "Files changed during export; nothing was saved. Export again.",
            );
            return Ok(None);
        }

        let saved = outcome
            .result
            .and_then(|bytes| target.save(&outcome.file_name, &bytes));

        match &saved {
            Ok(Some(path)) => {
                log::info!("Saved signed document to {}", path.display());
                self.export = ExportState::Complete { at: Instant::now() };
                self.notify(NoticeLevel::Success, format!("Saved {}", path.display()));
            }
            Ok(None) => {
                log::info!("Save cancelled");
                self.notify(NoticeLevel::Info, "Save cancelled");
            }
            Err(e) => {
                log::error!("Error signing PDF: {}", e);
                self.notify(NoticeLevel::Error, e.to_string());
            }
        }
        saved
    }

    /// Give up on the running export when its worker stopped without
    /// reporting back. Returns `false` if no export was running.
    pub fn abort_export(&mut self, reason: SignError) -> bool {
        if !matches!(self.export, ExportState::InFlight { .. }) {
            return false;
        }
        log::error!("Export aborted: {}", reason);
        self.export = ExportState::Ready;
        self.notify(NoticeLevel::Error, reason.to_string());
        true
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.export, ExportState::Complete { .. })
    }

    /// Drop the "saved" state once it has been shown long enough.
    pub fn expire_completion(&mut self, now: Instant) {
        if let ExportState::Complete { at } = self.export {
            if now.saturating_duration_since(at) >= self.complete_notice {
                self.export = ExportState::Ready;
            }
        }
    }

    fn clear_completion(&mut self) {
        if self.is_complete() {
            self.export = ExportState::Ready;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::media::decode_preview;
    use crate::io::media::fixtures::{gif_bytes, png_bytes};
    use crate::io::render::fixtures::pdf_bytes;
    use crate::io::render::{MediaBoxRenderer, PageRenderer};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingTarget {
        saved: RefCell<Vec<(String, usize)>>,
    }

    impl SaveTarget for RecordingTarget {
        fn save(&self, file_name: &str, bytes: &[u8]) -> Result<Option<PathBuf>, SignError> {
            self.saved.borrow_mut().push((file_name.to_string(), bytes.len()));
            Ok(Some(PathBuf::from(file_name)))
        }
    }

    struct FailingTarget;

    impl SaveTarget for FailingTarget {
        fn save(&self, _file_name: &str, _bytes: &[u8]) -> Result<Option<PathBuf>, SignError> {
            Err(SignError::SaveFailure("disk full".into()))
        }
    }

    fn load_pdf(session: &mut SigningSession, name: &str) -> u64 {
        let pdf = pdf_bytes(612, 792);
        let generation = session
            .load_document(FileSelection::from_bytes(name, pdf.clone()))
            .unwrap();
        let page = MediaBoxRenderer.render_first_page(&pdf, session.render_scale());
        session.apply_render(generation, page);
        generation
    }

    fn load_signature(session: &mut SigningSession, bytes: Vec<u8>) -> u64 {
        let generation = session
            .load_mark(FileSelection::from_bytes("signature.png", bytes.clone()))
            .unwrap();
        session.apply_preview(generation, decode_preview(&bytes));
        generation
    }

    fn ready_session() -> SigningSession {
        let mut session = SigningSession::new(&Settings::default());
        load_pdf(&mut session, "contract.pdf");
        load_signature(&mut session, png_bytes(20, 10));
        session
    }

    #[test]
    fn test_rejected_document_changes_nothing() {
        let mut session = ready_session();
        let before_name = session.export_name().to_string();
        let before_generation = session.documents().current().unwrap().generation;

        let err = session
            .load_document(FileSelection::from_bytes("notes.txt", b"meeting notes".to_vec()))
            .unwrap_err();

        assert!(matches!(err, SignError::InvalidFileType { .. }));
        assert_eq!(session.export_name(), before_name);
        assert_eq!(session.documents().current().unwrap().generation, before_generation);
        assert!(session.can_export());
        assert_eq!(session.notice().unwrap().level, NoticeLevel::Warning);
    }

    #[test]
    fn test_export_name_defaults() {
        let mut session = SigningSession::new(&Settings::default());
        assert_eq!(session.export_file_name(), "signed-document.pdf");

        load_pdf(&mut session, "lease.pdf");
        assert_eq!(session.export_name(), "lease");
        assert_eq!(session.export_file_name(), "lease.pdf");

        session.set_export_name("");
        assert_eq!(session.export_file_name(), "signed-document.pdf");
        session.set_export_name("   ");
        assert_eq!(session.export_file_name(), "signed-document.pdf");
        session.set_export_name("lease-signed");
        assert_eq!(session.export_file_name(), "lease-signed.pdf");
    }

    #[test]
    fn test_export_waits_for_layout_and_preview() {
        let mut session = SigningSession::new(&Settings::default());
        assert_eq!(session.export_blocker(), Some("no PDF selected"));

        let pdf = pdf_bytes(612, 792);
        let generation = session
            .load_document(FileSelection::from_bytes("a.pdf", pdf.clone()))
            .unwrap();
        assert_eq!(session.export_blocker(), Some("the page has not been laid out"));
        assert!(matches!(session.begin_export(), Err(SignError::NotReady(_))));

        session.apply_render(generation, MediaBoxRenderer.render_first_page(&pdf, 1.0));
        assert_eq!(session.export_blocker(), Some("no signature selected"));

        let png = png_bytes(4, 4);
        let mark = session
            .load_mark(FileSelection::from_bytes("s.png", png.clone()))
            .unwrap();
        assert_eq!(session.export_blocker(), Some("the signature is still decoding"));
        assert!(!session.pointer_down(Point::new(60.0, 60.0)));

        session.apply_preview(mark, decode_preview(&png));
        assert!(session.can_export());
    }

    #[test]
    fn test_rendering_failure_keeps_export_disabled() {
        let mut session = SigningSession::new(&Settings::default());
        let generation = session
            .load_document(FileSelection::from_bytes("a.pdf", pdf_bytes(612, 792)))
            .unwrap();
        session.apply_render(
            generation,
            Err(SignError::RenderingFailure("broken xref".into())),
        );

        assert_eq!(session.notice().unwrap().level, NoticeLevel::Error);
        assert!(!session.can_export());
    }

    #[test]
    fn test_stale_render_is_discarded() {
        let mut session = SigningSession::new(&Settings::default());
        let pdf = pdf_bytes(612, 792);
        let old = session
            .load_document(FileSelection::from_bytes("a.pdf", pdf.clone()))
            .unwrap();
        session
            .load_document(FileSelection::from_bytes("b.pdf", pdf.clone()))
            .unwrap();

        session.apply_render(old, MediaBoxRenderer.render_first_page(&pdf, 1.0));
        assert!(session.viewport().is_none());
    }

    #[test]
    fn test_drag_then_export_uses_mapped_position() {
        let settings = Settings {
            render_scale: 0.5,
            ..Settings::default()
        };
        let mut session = SigningSession::new(&settings);
        load_pdf(&mut session, "contract.pdf");
        load_signature(&mut session, png_bytes(20, 10));
        assert_eq!(session.viewport(), Some(Size::new(306.0, 396.0)));

        assert!(session.pointer_down(Point::new(60.0, 60.0)));
        assert!(session.pointer_move(Point::new(150.0, 100.0)));
        assert!(session.pointer_up());
        assert_eq!(session.placement(), Placement::new(100.0, 75.0));

        let job = session.begin_export().unwrap();
        assert!((job.at.x - 200.0).abs() < 0.0001);
        assert!((job.at.y - (792.0 - 150.0 - 50.0)).abs() < 0.0001);
        assert_eq!((job.at.width, job.at.height), (100.0, 50.0));
    }

    #[test]
    fn test_double_trigger_saves_once() {
        let mut session = ready_session();
        let target = RecordingTarget::default();

        let job = session.begin_export().unwrap();
        assert!(matches!(session.begin_export(), Err(SignError::ExportInFlight)));
        assert!(!session.can_export());

        let saved = session.finish_export(job.run(), &target).unwrap();
        assert_eq!(saved, Some(PathBuf::from("contract.pdf")));
        assert_eq!(target.saved.borrow().len(), 1);
        assert!(session.is_complete());

        // Ready again for a deliberate second export
        assert!(session.begin_export().is_ok());
    }

    #[test]
    fn test_export_discarded_when_document_replaced() {
        let mut session = ready_session();
        let target = RecordingTarget::default();

        let job = session.begin_export().unwrap();
        load_pdf(&mut session, "other.pdf");
        // Still locked until the running job reports back
        assert!(!session.can_export());

        let saved = session.finish_export(job.run(), &target).unwrap();
        assert_eq!(saved, None);
        assert!(target.saved.borrow().is_empty());
        assert_eq!(session.export_state(), ExportState::Ready);
        assert!(session.can_export());
    }

    #[test]
    fn test_unsupported_image_fails_at_embed() {
        let mut session = SigningSession::new(&Settings::default());
        load_pdf(&mut session, "contract.pdf");
        load_signature(&mut session, gif_bytes(8, 8));
        assert_eq!(session.notice().unwrap().level, NoticeLevel::Warning);

        let job = session.begin_export().unwrap();
        let err = session
            .finish_export(job.run(), &RecordingTarget::default())
            .unwrap_err();
        assert!(matches!(err, SignError::EmbedFailure(_)));
        assert_eq!(session.export_state(), ExportState::Ready);
        assert!(session.can_export());
    }

    #[test]
    fn test_undecodable_signature_is_dropped() {
        let mut session = ready_session();
        let mut broken = png_bytes(20, 10);
        broken.truncate(40);

        let generation = session
            .load_mark(FileSelection::from_bytes("broken.png", broken.clone()))
            .unwrap();
        assert!(session.apply_preview(generation, decode_preview(&broken)).is_none());

        assert!(session.marks().current().is_none());
        assert!(!session.has_drag_target());
        assert_eq!(session.export_blocker(), Some("no signature selected"));
        let notice = session.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.text.starts_with("could not decode image"));

        load_signature(&mut session, png_bytes(8, 8));
        assert!(session.can_export());
    }

    #[test]
    fn test_aborted_export_returns_to_ready() {
        let mut session = ready_session();
        assert!(!session.abort_export(SignError::EmbedFailure("worker stopped".into())));

        let _job = session.begin_export().unwrap();
        assert!(!session.can_export());
        assert!(session.abort_export(SignError::EmbedFailure("worker stopped".into())));

        assert_eq!(session.export_state(), ExportState::Ready);
        assert_eq!(session.notice().unwrap().level, NoticeLevel::Error);
        assert!(session.can_export());
    }

    #[test]
    fn test_save_failure_returns_to_ready() {
        let mut session = ready_session();
        let job = session.begin_export().unwrap();
        let err = session.finish_export(job.run(), &FailingTarget).unwrap_err();

        assert!(matches!(err, SignError::SaveFailure(_)));
        assert_eq!(session.export_state(), ExportState::Ready);
        assert_eq!(session.notice().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn test_completion_expires_and_resets_on_load() {
        let mut session = ready_session();
        let job = session.begin_export().unwrap();
        session.finish_export(job.run(), &RecordingTarget::default()).unwrap();
        assert!(session.is_complete());

        session.expire_completion(Instant::now());
        assert!(session.is_complete());
        session.expire_completion(Instant::now() + Duration::from_secs(4));
        assert!(!session.is_complete());

        let job = session.begin_export().unwrap();
        session.finish_export(job.run(), &RecordingTarget::default()).unwrap();
        load_signature(&mut session, png_bytes(5, 5));
        assert!(!session.is_complete());
    }

    #[test]
    fn test_new_layout_reclamps_placement() {
        let mut session = ready_session();
        assert!(session.pointer_down(Point::new(60.0, 60.0)));
        session.pointer_move(Point::new(600.0, 780.0));
        session.pointer_leave();
        assert_eq!(session.placement(), Placement::new(512.0, 742.0));

        let pdf = pdf_bytes(200, 300);
        let generation = session
            .load_document(FileSelection::from_bytes("small.pdf", pdf.clone()))
            .unwrap();
        session.apply_render(generation, MediaBoxRenderer.render_first_page(&pdf, 1.0));
        assert_eq!(session.placement(), Placement::new(100.0, 250.0));
    }

    #[test]
    fn test_resizing_mark_reclamps() {
        let mut session = ready_session();
        assert!(session.pointer_down(Point::new(60.0, 60.0)));
        session.pointer_move(Point::new(600.0, 780.0));
        session.pointer_up();

        session.set_display_size(200.0, 100.0);
        assert_eq!(session.mark_size(), Size::new(200.0, 100.0));
        assert_eq!(session.placement(), Placement::new(412.0, 692.0));
    }
}
