// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations: picked files, page layout, PDF stamping, saving and settings.

pub mod export;
pub mod media;
pub mod render;
pub mod save;
pub mod serialization;
