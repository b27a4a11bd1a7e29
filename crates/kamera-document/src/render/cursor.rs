// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vertical layout cursor with page-break handling.

use tracing::trace;

use crate::render::canvas::Canvas;
use crate::render::metrics::{Face, line_height};

/// Tracks the vertical offset on the current page.
///
/// The offset only grows until a page break resets it to the continuation
/// top of the next page. Breaking a page always draws the page decoration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    y: f32,
}

impl LayoutCursor {
    pub fn new(y: f32) -> Self {
        Self { y }
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// Move to an offset returned by a block renderer.
    pub fn set(&mut self, y: f32) {
        self.y = y;
    }

    pub fn advance(&mut self, amount: f32) {
        self.y += amount;
    }

    /// Advance by `lines` line heights of the given face and size.
    pub fn move_down(&mut self, lines: f32, face: Face, size: f32) {
        self.advance(lines * line_height(face, size));
    }

    /// Break to a new page when the cursor is past `threshold`, or when
    /// `required_height` more would cross the bottom margin. A cursor already
    /// at the top of a page never breaks again. Returns whether it broke.
    pub fn ensure_room(&mut self, canvas: &mut Canvas, required_height: f32, threshold: f32) -> bool {
        let geometry = *canvas.geometry();
        if self.y <= geometry.continuation_top {
            return false;
        }
        let past_threshold = self.y > threshold;
        let overflows = required_height > 0.0 && self.y + required_height > geometry.max_y();
        if past_threshold || overflows {
            self.page_break(canvas);
            return true;
        }
        false
    }

    /// Unconditionally start a new page.
    pub fn page_break(&mut self, canvas: &mut Canvas) {
        trace!(from_y = self.y, page = canvas.page_count() + 1, "page break");
        canvas.new_page();
        self.y = canvas.geometry().continuation_top;
    }
}
