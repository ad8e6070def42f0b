// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drag tracking for the signature mark.
//!
//! The tracker owns the mark's top-left position inside the page viewport
//! and a two-state drag machine. All pointer positions are relative to the
//! viewport origin.

use crate::util::geometry::{clamp_axis, Point, Size};

/// Top-left corner of the mark, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
}

impl Placement {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
}

#[derive(Debug, Clone)]
pub struct PlacementTracker {
    placement: Placement,
    state: DragState,
}

impl PlacementTracker {
    pub fn new(initial: Placement) -> Self {
        Self {
            placement: initial,
            state: DragState::Idle,
        }
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn is_dragging(&self) -> bool {
        self.state == DragState::Dragging
    }

    /// Start a drag if the pointer is over the mark. Returns whether it did.
    pub fn pointer_down(&mut self, pointer: Point, mark: Size) -> bool {
        let inside = pointer.x >= self.placement.x
            && pointer.x <= self.placement.x + mark.width
            && pointer.y >= self.placement.y
            && pointer.y <= self.placement.y + mark.height;

        if inside {
            self.state = DragState::Dragging;
            log::debug!("Drag started at ({:.1}, {:.1})", pointer.x, pointer.y);
        }
        inside
    }

    /// Centre the mark under the pointer, clamped into the viewport.
    ///
    /// Ignored while idle. Returns whether the placement was recomputed.
    pub fn pointer_move(&mut self, pointer: Point, viewport: Size, mark: Size) -> bool {
        if self.state != DragState::Dragging {
            return false;
        }

        let x = pointer.x - mark.width / 2.0;
        let y = pointer.y - mark.height / 2.0;
        self.placement = Placement {
            x: clamp_axis(x, viewport.width, mark.width),
            y: clamp_axis(y, viewport.height, mark.height),
        };
        true
    }

    /// Release anywhere ends the drag and keeps the last position.
    pub fn pointer_up(&mut self) -> bool {
        self.release("released")
    }

    /// Leaving the viewport counts as a release, not a cancel.
    pub fn pointer_leave(&mut self) -> bool {
        self.release("left viewport")
    }

    fn release(&mut self, reason: &str) -> bool {
        if self.state == DragState::Dragging {
            self.state = DragState::Idle;
            log::debug!(
                "Drag ended ({}) at ({:.1}, {:.1})",
                reason,
                self.placement.x,
                self.placement.y
            );
            true
        } else {
            false
        }
    }

    /// Pull the placement back inside a (possibly new) viewport.
    pub fn reclamp(&mut self, viewport: Size, mark: Size) {
        self.placement = Placement {
            x: clamp_axis(self.placement.x, viewport.width, mark.width),
            y: clamp_axis(self.placement.y, viewport.height, mark.height),
        };
    }
}
