// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error kinds surfaced by the signing session.

use thiserror::Error;

/// Everything that can go wrong between picking files and saving the result.
///
/// None of these are fatal: the session always returns to a state where the
/// user can pick files again or retry the export.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignError {
    #[error("expected {expected}, got {found}")]
    InvalidFileType {
        expected: &'static str,
        found: String,
    },
    #[error("could not lay out page: {0}")]
    RenderingFailure(String),
    #[error("could not decode image: {0}")]
    DecodeFailure(String),
    #[error("could not embed signature: {0}")]
    EmbedFailure(String),
    #[error("could not save document: {0}")]
    SaveFailure(String),
    #[error("an export is already running")]
    ExportInFlight,
    #[error("not ready to export: {0}")]
    NotReady(&'static str),
}

impl From<lopdf::Error> for SignError {
    fn from(err: lopdf::Error) -> Self {
        SignError::EmbedFailure(err.to_string())
    }
}

impl From<image::ImageError> for SignError {
    fn from(err: image::ImageError) -> Self {
        SignError::EmbedFailure(err.to_string())
    }
}

impl From<std::io::Error> for SignError {
    fn from(err: std::io::Error) -> Self {
        SignError::EmbedFailure(err.to_string())
    }
}
