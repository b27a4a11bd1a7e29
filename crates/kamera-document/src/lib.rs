// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kamera-document: Document processing for inspection reports.
//
// Provides PDF operations (page counting, single-page extraction, appending
// foreign pages), remark image decoding, and the report renderer: a layout
// cursor, content block renderers and the package report composer.

pub mod image;
pub mod merge;
pub mod pdf;
pub mod render;

pub use image::loader::LoadedImage;
pub use merge::{DrawingSource, MergeOutcome, merge_drawings};
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use render::composer::{ComposedReport, ReportAssets, ReportComposer, ReportSection};
