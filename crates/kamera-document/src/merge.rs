// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drawing merge: append each section's ISO drawing behind a rendered report.

use kamera_core::error::Result;
use tracing::{info, instrument, warn};

use crate::pdf::reader::PdfReader;

/// One drawing to append, already read from the blob store.
#[derive(Debug, Clone, Copy)]
pub struct DrawingSource<'a> {
    /// Section name, for diagnostics.
    pub line_name: &'a str,
    pub bytes: &'a [u8],
}

/// Result of merging drawings into a report.
#[derive(Debug)]
pub struct MergeOutcome {
    pub bytes: Vec<u8>,
    /// Drawings whose pages were appended.
    pub merged: usize,
    /// Pages appended across all drawings.
    pub appended_pages: usize,
    /// Names of sections whose drawing could not be read or had no pages.
    pub skipped: Vec<String>,
}

/// Append every page of each drawing, in the given order, after the report's
/// own pages.
///
/// A drawing that fails to load is skipped with a warning and the rest are
/// still merged. Failing to load or save the report itself is an error.
#[instrument(skip_all, fields(drawings = drawings.len()))]
pub fn merge_drawings(report: &[u8], drawings: &[DrawingSource<'_>]) -> Result<MergeOutcome> {
    let mut base = PdfReader::from_bytes(report)?;
    let report_pages = base.page_count();

    let mut merged = 0;
    let mut appended_pages = 0;
    let mut skipped = Vec::new();

    for drawing in drawings {
        let appended = PdfReader::from_bytes(drawing.bytes)
            .and_then(|source| base.append_document(&source));
        match appended {
            Ok(0) => {
                warn!(line = drawing.line_name, "drawing has no pages");
                skipped.push(drawing.line_name.to_owned());
            }
            Ok(pages) => {
                merged += 1;
                appended_pages += pages;
            }
            Err(err) => {
                warn!(line = drawing.line_name, %err, "drawing skipped");
                skipped.push(drawing.line_name.to_owned());
            }
        }
    }

    let bytes = base.to_bytes()?;
    info!(report_pages, merged, appended_pages, skipped = skipped.len(), "drawings merged");
    Ok(MergeOutcome {
        bytes,
        merged,
        appended_pages,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::tests::{labelled_pdf, page_text};

    #[test]
    fn appends_drawings_in_order() {
        let report = labelled_pdf(&["body-1", "body-2"]);
        let first = labelled_pdf(&["A-12"]);
        let second = labelled_pdf(&["B-3 p1", "B-3 p2"]);

        let outcome = merge_drawings(
            &report,
            &[
                DrawingSource { line_name: "A-12", bytes: &first },
                DrawingSource { line_name: "B-3", bytes: &second },
            ],
        )
        .expect("merge");

        assert_eq!(outcome.merged, 2);
        assert_eq!(outcome.appended_pages, 3);
        assert!(outcome.skipped.is_empty());
        let reader = PdfReader::from_bytes(&outcome.bytes).expect("reload");
        assert_eq!(reader.page_count(), 5);
        assert!(page_text(&outcome.bytes, 3).contains("A-12"));
        assert!(page_text(&outcome.bytes, 5).contains("B-3 p2"));
    }

    #[test]
    fn corrupt_drawing_is_skipped() {
        let report = labelled_pdf(&["body"]);
        let good = labelled_pdf(&["good"]);

        let outcome = merge_drawings(
            &report,
            &[
                DrawingSource { line_name: "broken", bytes: b"not a pdf at all" },
                DrawingSource { line_name: "fine", bytes: &good },
            ],
        )
        .expect("merge");

        assert_eq!(outcome.skipped, vec!["broken"]);
        assert_eq!(outcome.merged, 1);
        assert_eq!(PdfReader::from_bytes(&outcome.bytes).expect("reload").page_count(), 2);
    }

    #[test]
    fn unreadable_report_is_an_error() {
        let drawing = labelled_pdf(&["x"]);
        let result = merge_drawings(b"nope", &[DrawingSource { line_name: "x", bytes: &drawing }]);
        assert!(result.is_err());
    }

    #[test]
    fn no_drawings_keeps_the_report() {
        let report = labelled_pdf(&["body"]);
        let outcome = merge_drawings(&report, &[]).expect("merge");
        assert_eq!(outcome.merged, 0);
        assert_eq!(PdfReader::from_bytes(&outcome.bytes).expect("reload").page_count(), 1);
    }
}
