// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the SIGPLACE application.

pub mod canvas;
pub mod controls;
