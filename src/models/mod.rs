// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Session data model.

pub mod document;
pub mod mark;
pub mod placement;
pub mod session;
pub mod settings;
