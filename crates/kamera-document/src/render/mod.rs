// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report renderer: font metrics, drawing surface, layout cursor, content
// blocks and the package report composer.

pub mod blocks;
pub mod canvas;
pub mod composer;
pub mod cursor;
pub mod metrics;
pub mod style;

pub use canvas::{Canvas, PageDecor, TextStyle};
pub use composer::{ComposedLayout, ComposedReport, ReportAssets, ReportComposer, ReportSection};
pub use cursor::LayoutCursor;
