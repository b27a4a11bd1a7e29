// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: assemble new PDF documents from drawing operations using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. The writer keeps one operation list per page and only
// turns them into `PdfPage`s when the document is finished, so callers (and
// tests) can inspect what has been drawn so far.

use kamera_core::error::Result;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, RawImage, TextItem, XObjectId,
};
use tracing::{debug, instrument, warn};

use crate::pdf::encoding::encode_win_ansi_text;

/// A4 in millimetres.
const A4_MM: (f32, f32) = (210.0, 297.0);

/// Collects page operation lists and embedded images for a new PDF.
pub struct PdfWriter {
    document: PdfDocument,
    page_width: Mm,
    page_height: Mm,
    pages: Vec<Vec<Op>>,
}

impl PdfWriter {
    /// Create a writer with one empty page of the given size.
    pub fn new(title: &str, page_width: Mm, page_height: Mm) -> Self {
        Self {
            document: PdfDocument::new(title),
            page_width,
            page_height,
            pages: vec![Vec::new()],
        }
    }

    /// Create a writer defaulting to A4.
    pub fn a4(title: &str) -> Self {
        Self::new(title, Mm(A4_MM.0), Mm(A4_MM.1))
    }

    /// Page width in points.
    pub fn page_width_pt(&self) -> f32 {
        self.page_width.into_pt().0
    }

    /// Page height in points.
    pub fn page_height_pt(&self) -> f32 {
        self.page_height.into_pt().0
    }

    /// Register an image for use with `Op::UseXobject`.
    pub fn add_image(&mut self, image: &RawImage) -> XObjectId {
        self.document.add_image(image)
    }

    /// Append an operation to the current page.
    pub fn push(&mut self, op: Op) {
        if let Some(page) = self.pages.last_mut() {
            page.push(op);
        }
    }

    /// Append several operations to the current page.
    pub fn extend(&mut self, ops: impl IntoIterator<Item = Op>) {
        if let Some(page) = self.pages.last_mut() {
            page.extend(ops);
        }
    }

    /// Start a new, empty page. Subsequent operations land on it.
    pub fn new_page(&mut self) {
        self.pages.push(Vec::new());
        debug!(page = self.pages.len(), "page added");
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Operation lists drawn so far, one per page.
    pub fn pages(&self) -> &[Vec<Op>] {
        &self.pages
    }

    /// Every text run written on `page` (0-indexed), in drawing order.
    pub fn texts_on_page(&self, page: usize) -> Vec<String> {
        self.pages
            .get(page)
            .map(|ops| ops.iter().flat_map(op_texts).collect())
            .unwrap_or_default()
    }

    /// Every text run in the document, in drawing order.
    pub fn texts(&self) -> Vec<String> {
        self.pages.iter().flatten().flat_map(op_texts).collect()
    }

    /// Serialise the document, with every text run encoded as WinAnsi.
    #[instrument(skip(self), fields(pages = self.pages.len()))]
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let pages = std::mem::take(&mut self.pages)
            .into_iter()
            .map(|ops| PdfPage::new(self.page_width, self.page_height, ops))
            .collect();
        self.document.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = self.document.save(&PdfSaveOptions::default(), &mut warnings);
        for warning in &warnings {
            warn!(?warning, "printpdf warning");
        }

        let output = encode_win_ansi_text(output)?;
        debug!(output_bytes = output.len(), "PDF serialised");
        Ok(output)
    }
}

fn op_texts(op: &Op) -> Vec<String> {
    match op {
        Op::WriteTextBuiltinFont { items, .. } => items
            .iter()
            .filter_map(|item| match item {
                TextItem::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printpdf::{BuiltinFont, Point, Pt};

    fn write_text(writer: &mut PdfWriter, text: &str) {
        writer.extend([
            Op::StartTextSection,
            Op::SetTextCursor {
                pos: Point {
                    x: Pt(72.0),
                    y: Pt(700.0),
                },
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(12.0),
                font: BuiltinFont::Helvetica,
            },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(text.to_owned())],
                font: BuiltinFont::Helvetica,
            },
            Op::EndTextSection,
        ]);
    }

    #[test]
    fn a4_dimensions_in_points() {
        let writer = PdfWriter::a4("t");
        assert!((writer.page_width_pt() - 595.28).abs() < 0.1);
        assert!((writer.page_height_pt() - 841.89).abs() < 0.1);
    }

    #[test]
    fn texts_are_tracked_per_page() {
        let mut writer = PdfWriter::a4("t");
        write_text(&mut writer, "first");
        writer.new_page();
        write_text(&mut writer, "second");

        assert_eq!(writer.page_count(), 2);
        assert_eq!(writer.texts_on_page(0), vec!["first"]);
        assert_eq!(writer.texts_on_page(1), vec!["second"]);
        assert_eq!(writer.texts(), vec!["first", "second"]);
        assert!(writer.texts_on_page(5).is_empty());
    }

    #[test]
    fn finish_produces_a_pdf_with_every_page() {
        let mut writer = PdfWriter::a4("Pages");
        write_text(&mut writer, "one");
        writer.new_page();
        writer.new_page();

        let bytes = writer.finish().expect("serialise");
        assert!(bytes.starts_with(b"%PDF"));
        let reader = crate::pdf::PdfReader::from_bytes(&bytes).expect("reload");
        assert_eq!(reader.page_count(), 3);
    }

    #[test]
    fn norwegian_text_survives_serialisation() {
        let mut writer = PdfWriter::a4("Tegn");
        write_text(&mut writer, "Totalt antall rørseksjoner: 1");
        writer.new_page();
        write_text(&mut writer, "ÆØÅ æøå");

        let bytes = writer.finish().expect("serialise");
        let document = lopdf::Document::load_mem(&bytes).expect("reload");
        let first = document.extract_text(&[1]).expect("page 1 text");
        let first = first.trim_end();
        assert!(first.contains("Totalt antall rørseksjoner: 1"), "got {first:?}");
        assert!(!first.contains('Ã'));
        let second = document.extract_text(&[2]).expect("page 2 text");
        assert_eq!(second.trim_end(), "ÆØÅ æøå");
    }
}
