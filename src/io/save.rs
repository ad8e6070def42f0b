// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Handing the signed document to the user.

use crate::error::SignError;
use std::path::PathBuf;

/// Where finished exports go.
pub trait SaveTarget {
    /// Store `bytes` under a name based on `file_name`. `Ok(None)` means the
    /// user backed out, which is not an error.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<Option<PathBuf>, SignError>;
}

/// Native save dialog followed by a plain file write.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialogSaveTarget;

impl SaveTarget for DialogSaveTarget {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<Option<PathBuf>, SignError> {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PDF", &["pdf"])
            .set_file_name(file_name)
            .save_file()
        else {
            return Ok(None);
        };

        std::fs::write(&path, bytes)
            .map_err(|e| SignError::SaveFailure(format!("{}: {}", path.display(), e)))?;
        Ok(Some(path))
    }
}
