// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Package report composer.
//
// Walks a hydrated package through the report sections in a fixed order
// (header, summary, section table, detailed remarks) and produces the report
// body as PDF bytes. Attachments are passed in already read, so composing is
// synchronous and touches no files.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use kamera_core::error::Result;
use kamera_core::format::norwegian_date;
use kamera_core::{FullLine, FullPackage, RecordId, Remark};
use tracing::{debug, info, instrument, warn};

use crate::image::loader::{LOGO_MAX_EDGE, LoadedImage, REMARK_MAX_EDGE};
use crate::render::blocks::{self, REPORT_TITLE, TABLE_ROW_HEIGHT};
use crate::render::canvas::{Canvas, PageDecor};
use crate::render::cursor::LayoutCursor;
use crate::render::metrics::Face;

/// Break before the remarks banner, and after each section's remarks, when
/// the cursor is below this offset.
const REMARKS_BREAK: f32 = 600.0;
/// Break before a section header below this offset.
const SECTION_BREAK: f32 = 650.0;
/// Break before a remark block below this offset.
const REMARK_BREAK: f32 = 400.0;
/// Room kept under a comment box for the remark outline.
const REMARK_BORDER_GAP: f32 = 10.0;

/// Report sections, in the order they are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSection {
    Header,
    Summary,
    SectionTable,
    DetailedRemarks,
}

/// Attachment bytes the report needs, read ahead of composing.
///
/// A remark without an entry renders the missing-image note.
#[derive(Debug, Default, Clone)]
pub struct ReportAssets {
    pub logo: Option<Vec<u8>>,
    pub images: HashMap<RecordId, Vec<u8>>,
}

impl ReportAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logo(mut self, logo: Vec<u8>) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn insert_image(&mut self, remark_id: RecordId, bytes: Vec<u8>) {
        self.images.insert(remark_id, bytes);
    }
}

/// Output of one composition.
#[derive(Debug)]
pub struct ComposedReport {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Sections actually rendered, in order.
    pub sections: Vec<ReportSection>,
    /// Remarks whose photo was absent or could not be decoded.
    pub missing_images: usize,
}

/// Lays out the report body for one package.
pub struct ReportComposer<'a> {
    package: &'a FullPackage,
    assets: &'a ReportAssets,
    generated_at: DateTime<Local>,
}

impl<'a> ReportComposer<'a> {
    pub fn new(package: &'a FullPackage, assets: &'a ReportAssets) -> Self {
        Self {
            package,
            assets,
            generated_at: Local::now(),
        }
    }

    /// Override the generation date printed in the footer.
    pub fn generated_at(mut self, at: DateTime<Local>) -> Self {
        self.generated_at = at;
        self
    }

    /// Footer text: project and customer when known, then the date.
    pub fn footer_text(&self) -> String {
        let generated = format!("Generert: {}", norwegian_date(&self.generated_at));
        match &self.package.project {
            Some(project) => format!(
                "{} - {} | {}",
                project.project_number, project.customer_name, generated
            ),
            None => generated,
        }
    }

    /// Lay the report out and return the canvas before serialisation.
    #[instrument(skip(self), fields(package = %self.package.package.name))]
    pub fn layout(&self) -> ComposedLayout {
        let mut state = Composition {
            canvas: Canvas::a4(REPORT_TITLE),
            cursor: LayoutCursor::new(0.0),
            sections: Vec::new(),
            missing_images: 0,
        };

        let logo = self.assets.logo.as_deref().and_then(|bytes| {
            LoadedImage::decode(bytes, LOGO_MAX_EDGE)
                .map_err(|err| warn!(%err, "logo skipped"))
                .ok()
        });
        let logo = logo.map(|image| state.canvas.add_image(&image));
        state.canvas.set_decor(PageDecor {
            logo,
            footer: self.footer_text(),
        });

        self.render_header(&mut state);
        self.render_summary(&mut state);
        if !self.package.lines.is_empty() {
            self.render_section_table(&mut state);
        }
        if self.package.has_remarks() {
            self.render_detailed_remarks(&mut state);
        }

        debug!(
            pages = state.canvas.page_count(),
            sections = ?state.sections,
            "report laid out"
        );
        ComposedLayout {
            canvas: state.canvas,
            sections: state.sections,
            missing_images: state.missing_images,
        }
    }

    /// Lay out and serialise the report body.
    pub fn compose(&self) -> Result<ComposedReport> {
        let layout = self.layout();
        let page_count = layout.canvas.page_count();
        let bytes = layout.canvas.finish()?;
        info!(
            page_count,
            bytes = bytes.len(),
            missing_images = layout.missing_images,
            "report body composed"
        );
        Ok(ComposedReport {
            bytes,
            page_count,
            sections: layout.sections,
            missing_images: layout.missing_images,
        })
    }

    // -- Sections ---------------------------------------------------------------

    fn render_header(&self, state: &mut Composition) {
        state.sections.push(ReportSection::Header);
        let top = state.canvas.geometry().margin_top;
        state.cursor.set(top);
        state.cursor.move_down(3.0, Face::Regular, 12.0);

        let end = blocks::header(
            &mut state.canvas,
            state.cursor.y(),
            self.package.project.as_ref(),
            &self.package.package.name,
        );
        state.cursor.set(end);
        state.cursor.move_down(2.0, Face::Regular, 8.0);
    }

    fn render_summary(&self, state: &mut Composition) {
        state.sections.push(ReportSection::Summary);
        let end = blocks::banner(&mut state.canvas, state.cursor.y(), "SAMMENDRAG");
        state.cursor.set(end);
        state.cursor.move_down(0.8, Face::Bold, 14.0);

        let end = blocks::summary_box(&mut state.canvas, state.cursor.y(), self.package);
        state.cursor.set(end);
        state.cursor.move_down(1.0, Face::Regular, 10.0);
    }

    fn render_section_table(&self, state: &mut Composition) {
        state.sections.push(ReportSection::SectionTable);
        let end = blocks::banner(&mut state.canvas, state.cursor.y(), "OVERSIKT OVER RØRSEKSJONER");
        state.cursor.set(end);
        state.cursor.move_down(1.5, Face::Bold, 14.0);

        let end = blocks::table_header(&mut state.canvas, state.cursor.y());
        state.cursor.set(end);

        for (index, line) in self.package.lines.iter().enumerate() {
            if state.cursor.ensure_room(&mut state.canvas, TABLE_ROW_HEIGHT, f32::INFINITY) {
                let end = blocks::table_header(&mut state.canvas, state.cursor.y());
                state.cursor.set(end);
            }
            let end = blocks::table_row(&mut state.canvas, state.cursor.y(), index, line);
            state.cursor.set(end);
        }

        blocks::table_bottom(&mut state.canvas, state.cursor.y());
    }

    fn render_detailed_remarks(&self, state: &mut Composition) {
        state.sections.push(ReportSection::DetailedRemarks);
        state.cursor.ensure_room(&mut state.canvas, 0.0, REMARKS_BREAK);
        state.cursor.move_down(2.0, Face::Regular, 10.0);

        let end = blocks::banner(&mut state.canvas, state.cursor.y(), "DETALJERTE MERKNADER");
        state.cursor.set(end);
        state.cursor.move_down(1.5, Face::Bold, 14.0);

        for line in self.package.lines.iter().filter(|l| !l.remarks.is_empty()) {
            self.render_line_remarks(state, line);
            state.cursor.ensure_room(&mut state.canvas, 0.0, REMARKS_BREAK);
        }
    }

    fn render_line_remarks(&self, state: &mut Composition, line: &FullLine) {
        state.cursor.ensure_room(&mut state.canvas, 0.0, SECTION_BREAK);
        let end = blocks::section_header(&mut state.canvas, state.cursor.y(), line);
        state.cursor.set(end);

        for (index, remark) in line.remarks.iter().enumerate() {
            state.cursor.ensure_room(&mut state.canvas, 0.0, REMARK_BREAK);
            self.render_remark(state, index + 1, remark);
        }
    }

    /// One remark: badge, photo (or the missing-image note), optional comment
    /// box, all inside an outline. A comment too long for the page continues
    /// on the next one, each part getting its own outline.
    fn render_remark(&self, state: &mut Composition, number: usize, remark: &Remark) {
        let mut frame_top = state.cursor.y();
        let end = blocks::remark_badge(&mut state.canvas, frame_top, number);
        state.cursor.set(end);

        let image = self.assets.images.get(&remark.id).and_then(|bytes| {
            LoadedImage::decode(bytes, REMARK_MAX_EDGE)
                .map_err(|err| warn!(remark = remark.id, %err, "remark image unreadable"))
                .ok()
        });
        let end = match image {
            Some(image) => {
                let placed = state.canvas.add_image(&image);
                blocks::image_frame(&mut state.canvas, state.cursor.y(), &placed)
            }
            None => {
                state.missing_images += 1;
                blocks::image_placeholder(&mut state.canvas, state.cursor.y())
            }
        };
        state.cursor.set(end);

        if !remark.comment.is_empty() {
            let lines = blocks::comment_lines(&state.canvas, &remark.comment);
            let mut remaining: &[String] = &lines;
            let mut labelled = true;

            while !remaining.is_empty() {
                let fitting = self.lines_fitting(state, labelled).min(remaining.len());
                if fitting == 0 {
                    if state.cursor.y() <= state.canvas.geometry().continuation_top {
                        // Not even one line fits an empty page; draw it anyway.
                        let end = blocks::comment_box(&mut state.canvas, state.cursor.y(), &remaining[..1], labelled);
                        state.cursor.set(end);
                        remaining = &remaining[1..];
                        labelled = false;
                        continue;
                    }
                    blocks::remark_border(&mut state.canvas, frame_top, state.cursor.y() + REMARK_BORDER_GAP);
                    state.cursor.page_break(&mut state.canvas);
                    frame_top = state.cursor.y();
                    continue;
                }

                let (part, rest) = remaining.split_at(fitting);
                let end = blocks::comment_box(&mut state.canvas, state.cursor.y(), part, labelled);
                state.cursor.set(end);
                remaining = rest;
                labelled = false;

                if !remaining.is_empty() {
                    blocks::remark_border(&mut state.canvas, frame_top, state.cursor.y() + REMARK_BORDER_GAP);
                    state.cursor.page_break(&mut state.canvas);
                    frame_top = state.cursor.y();
                }
            }
        }

        let bottom = state.cursor.y() + REMARK_BORDER_GAP;
        blocks::remark_border(&mut state.canvas, frame_top, bottom);
        state.cursor.set(bottom + 5.0);
    }

    /// How many comment lines fit between the cursor and the bottom margin.
    fn lines_fitting(&self, state: &Composition, labelled: bool) -> usize {
        let available = state.canvas.geometry().max_y() - state.cursor.y() - REMARK_BORDER_GAP;
        let chrome = blocks::comment_box_height(0, labelled);
        let room = available - chrome;
        if room <= 0.0 {
            0
        } else {
            (room / blocks::comment_line_height()).floor() as usize
        }
    }
}

/// Mutable state threaded through the section renderers.
struct Composition {
    canvas: Canvas,
    cursor: LayoutCursor,
    sections: Vec<ReportSection>,
    missing_images: usize,
}

/// A finished layout, still inspectable before serialisation.
pub struct ComposedLayout {
    pub canvas: Canvas,
    pub sections: Vec<ReportSection>,
    pub missing_images: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::loader::tests::png_bytes;
    use crate::pdf::PdfReader;
    use chrono::{TimeZone, Utc};
    use kamera_core::{PdfLine, Project, TestPackage};

    fn remark(id: RecordId, comment: &str) -> Remark {
        Remark {
            id,
            pdf_line_id: 1,
            image_path: format!("/uploads/remarks/{id}.png"),
            comment: comment.into(),
            created_at: Utc::now(),
        }
    }

    fn full_line(id: RecordId, name: &str, remarks: Vec<Remark>) -> FullLine {
        FullLine {
            line: PdfLine {
                id,
                test_package_id: 1,
                name: name.into(),
                pdf_path: None,
                line_number: id,
                created_at: Utc::now(),
            },
            remarks,
        }
    }

    fn package(lines: Vec<FullLine>) -> FullPackage {
        FullPackage {
            package: TestPackage {
                id: 1,
                project_id: 1,
                name: "TP-01".into(),
                comment: String::new(),
                pipe_type: None,
                lining: None,
                created_at: Utc::now(),
            },
            project: Some(Project {
                id: 1,
                project_number: "P-100".into(),
                customer_name: "Bygg AS".into(),
                created_at: Utc::now(),
            }),
            lines,
        }
    }

    #[test]
    fn empty_package_renders_header_and_summary_only() {
        let package = package(Vec::new());
        let assets = ReportAssets::new();
        let report = ReportComposer::new(&package, &assets).compose().expect("compose");

        assert_eq!(report.sections, vec![ReportSection::Header, ReportSection::Summary]);
        assert_eq!(report.page_count, 1);
        assert_eq!(PdfReader::from_bytes(&report.bytes).expect("valid pdf").page_count(), 1);
    }

    #[test]
    fn composed_report_keeps_norwegian_letters() {
        let package = package(vec![full_line(1, "Kum ved bekk", Vec::new())]);
        let assets = ReportAssets::new();
        let report = ReportComposer::new(&package, &assets).compose().expect("compose");

        let document = lopdf::Document::load_mem(&report.bytes).expect("valid pdf");
        let text = document.extract_text(&[1]).expect("page text");
        // Every run is its own text object, extracted on its own line.
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(text.contains("Totalt antall rørseksjoner: 1"), "got {text:?}");
        assert!(text.contains("OVERSIKT OVER RØRSEKSJONER"), "got {text:?}");
        assert!(!text.contains('Ã'));
    }

    #[test]
    fn summary_counts_zero_sections() {
        let package = package(Vec::new());
        let assets = ReportAssets::new();
        let layout = ReportComposer::new(&package, &assets).layout();
        let texts = layout.canvas.writer().texts();
        let label = texts
            .iter()
            .position(|t| t == "Totalt antall rørseksjoner: ")
            .expect("label present");
        assert_eq!(texts[label + 1], "0");
    }

    #[test]
    fn lines_without_remarks_skip_the_remarks_section() {
        let package = package(vec![full_line(1, "Line A-12", Vec::new())]);
        let assets = ReportAssets::new();
        let report = ReportComposer::new(&package, &assets).compose().expect("compose");
        assert_eq!(
            report.sections,
            vec![ReportSection::Header, ReportSection::Summary, ReportSection::SectionTable]
        );
    }

    #[test]
    fn remarks_are_numbered_from_one_per_section() {
        let package = package(vec![
            full_line(1, "Line A-12", vec![remark(1, "Sprekk"), remark(2, "")]),
            full_line(2, "Line B-3", vec![remark(3, "Rust")]),
        ]);
        let mut assets = ReportAssets::new();
        for id in 1..=3 {
            assets.insert_image(id, png_bytes(64, 48));
        }
        let layout = ReportComposer::new(&package, &assets).layout();
        assert_eq!(layout.sections.last(), Some(&ReportSection::DetailedRemarks));
        assert_eq!(layout.missing_images, 0);

        let texts = layout.canvas.writer().texts();
        let badges: Vec<&String> = texts.iter().filter(|t| t.starts_with('#')).collect();
        assert_eq!(badges, vec!["#1", "#2", "#1"]);
        assert_eq!(texts.iter().filter(|t| *t == "KOMMENTAR:").count(), 2);
        assert!(texts.contains(&"Seksjon 2".to_owned()));
    }

    #[test]
    fn only_an_empty_comment_omits_the_comment_box() {
        let package = package(vec![full_line(
            1,
            "Line A-12",
            vec![remark(1, ""), remark(2, " "), remark(3, "Sprekk")],
        )]);
        let mut assets = ReportAssets::new();
        for id in 1..=3 {
            assets.insert_image(id, png_bytes(16, 16));
        }
        let texts = ReportComposer::new(&package, &assets).layout().canvas.writer().texts();
        assert_eq!(texts.iter().filter(|t| *t == "KOMMENTAR:").count(), 2);
    }

    #[test]
    fn missing_and_broken_images_degrade_to_a_note() {
        let package = package(vec![full_line(1, "Line A-12", vec![remark(1, ""), remark(2, "")])]);
        let mut assets = ReportAssets::new();
        assets.insert_image(2, b"not an image".to_vec());
        let layout = ReportComposer::new(&package, &assets).layout();

        assert_eq!(layout.missing_images, 2);
        let notes = layout
            .canvas
            .writer()
            .texts()
            .into_iter()
            .filter(|t| t == "[Kunne ikke laste bilde]")
            .count();
        assert_eq!(notes, 2);
    }

    #[test]
    fn remark_blocks_break_pages() {
        let remarks = (1..=6).map(|id| remark(id, "Avvik")).collect();
        let package = package(vec![full_line(1, "Line A-12", remarks)]);
        let mut assets = ReportAssets::new();
        for id in 1..=6 {
            assets.insert_image(id, png_bytes(32, 32));
        }
        let layout = ReportComposer::new(&package, &assets).layout();
        assert!(layout.canvas.page_count() >= 3);

        let footer = ReportComposer::new(&package, &assets).footer_text();
        for page in 0..layout.canvas.page_count() {
            assert!(layout.canvas.writer().texts_on_page(page).contains(&footer));
        }
    }

    #[test]
    fn long_comment_continues_on_next_page() {
        let comment = "Sprekk i rørvegg ved skjøt. ".repeat(300);
        let package = package(vec![full_line(1, "Line A-12", vec![remark(1, &comment)])]);
        let mut assets = ReportAssets::new();
        assets.insert_image(1, png_bytes(32, 32));
        let layout = ReportComposer::new(&package, &assets).layout();

        assert!(layout.canvas.page_count() >= 3);
        let labels = layout
            .canvas
            .writer()
            .texts()
            .into_iter()
            .filter(|t| t == "KOMMENTAR:")
            .count();
        assert_eq!(labels, 1);
    }

    #[test]
    fn many_rows_repeat_the_table_header() {
        let lines = (1..=30).map(|id| full_line(id, &format!("Line {id}"), Vec::new())).collect();
        let package = package(lines);
        let assets = ReportAssets::new();
        let layout = ReportComposer::new(&package, &assets).layout();

        assert_eq!(layout.canvas.page_count(), 2);
        assert!(layout.canvas.writer().texts_on_page(1).contains(&"Seksjonsnavn".to_owned()));
    }

    #[test]
    fn footer_names_project_and_date() {
        let package = package(Vec::new());
        let assets = ReportAssets::new();
        let at = Local.with_ymd_and_hms(2026, 2, 3, 10, 0, 0).single().expect("date");
        let composer = ReportComposer::new(&package, &assets).generated_at(at);
        assert_eq!(composer.footer_text(), "P-100 - Bygg AS | Generert: 03.02.2026");

        let mut anonymous = package.clone();
        anonymous.project = None;
        let composer = ReportComposer::new(&anonymous, &assets).generated_at(at);
        assert_eq!(composer.footer_text(), "Generert: 03.02.2026");
    }

    #[test]
    fn logo_is_drawn_on_every_page() {
        let lines = (1..=40).map(|id| full_line(id, "L", Vec::new())).collect();
        let package = package(lines);
        let assets = ReportAssets::new().with_logo(png_bytes(160, 40));
        let layout = ReportComposer::new(&package, &assets).layout();

        for page in layout.canvas.writer().pages() {
            assert!(page.iter().any(|op| matches!(op, printpdf::Op::UseXobject { .. })));
        }
    }
}
