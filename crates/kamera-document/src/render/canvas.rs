// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drawing surface for the report renderer.
//
// Callers work in points with the origin at the top-left corner, matching how
// the layout cursor moves down the page. The canvas flips every coordinate
// into PDF space (origin bottom-left) before emitting printpdf operations.

use kamera_core::error::Result;
use printpdf::graphics::{LinePoint, PaintMode, Point, Polygon, PolygonRing, WindingOrder};
use printpdf::{Op, Pt, TextItem, XObjectId, XObjectTransform};

use crate::image::loader::LoadedImage;
use crate::pdf::writer::PdfWriter;
use crate::render::metrics::{Face, line_height, text_width, wrap_hanging, wrap_text};
use crate::render::style::{FOOTER, Hex, PageGeometry};

/// Bezier handle length for a quarter circle of radius 1.
const KAPPA: f32 = 0.552_284_8;

/// Face, size and colour of a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub face: Face,
    pub size: f32,
    pub color: Hex,
}

impl TextStyle {
    pub const fn new(face: Face, size: f32, color: Hex) -> Self {
        Self { face, size, color }
    }

    pub fn line_height(&self) -> f32 {
        line_height(self.face, self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// An image registered with the document, with its pixel size.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub id: XObjectId,
    pub width_px: u32,
    pub height_px: u32,
}

/// Logo and footer repeated on every page.
#[derive(Debug, Clone)]
pub struct PageDecor {
    pub logo: Option<PlacedImage>,
    pub footer: String,
}

/// Logo position and width.
const LOGO_X: f32 = 50.0;
const LOGO_Y: f32 = 30.0;
const LOGO_WIDTH: f32 = 80.0;
const FOOTER_SIZE: f32 = 8.0;

pub struct Canvas {
    writer: PdfWriter,
    geometry: PageGeometry,
    decor: Option<PageDecor>,
}

impl Canvas {
    /// A4 canvas with one empty page.
    pub fn a4(title: &str) -> Self {
        let writer = PdfWriter::a4(title);
        let geometry = PageGeometry::new(writer.page_width_pt(), writer.page_height_pt());
        Self {
            writer,
            geometry,
            decor: None,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn writer(&self) -> &PdfWriter {
        &self.writer
    }

    pub fn page_count(&self) -> usize {
        self.writer.page_count()
    }

    /// Install the per-page decoration and draw it on the current page.
    pub fn set_decor(&mut self, decor: PageDecor) {
        self.draw_decor(&decor);
        self.decor = Some(decor);
    }

    /// Start a new page and draw the page decoration on it.
    pub fn new_page(&mut self) {
        self.writer.new_page();
        if let Some(decor) = self.decor.take() {
            self.draw_decor(&decor);
            self.decor = Some(decor);
        }
    }

    fn draw_decor(&mut self, decor: &PageDecor) {
        if let Some(logo) = &decor.logo {
            let height = LOGO_WIDTH * logo.height_px as f32 / logo.width_px.max(1) as f32;
            self.image(logo, LOGO_X, LOGO_Y, LOGO_WIDTH, height);
        }
        let style = TextStyle::new(Face::Regular, FOOTER_SIZE, FOOTER);
        let y = self.geometry.max_y();
        let (x, width) = (self.geometry.margin_left, self.geometry.content_width());
        self.text_line(x, y, width, Align::Center, &style, &decor.footer);
    }

    pub fn add_image(&mut self, image: &LoadedImage) -> PlacedImage {
        PlacedImage {
            id: self.writer.add_image(&image.raw),
            width_px: image.width,
            height_px: image.height,
        }
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        self.writer.finish()
    }

    // -- Shapes ---------------------------------------------------------------

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Hex) {
        let ring = self.rect_ring(x, y, width, height);
        self.writer.push(Op::SetFillColor { col: color.color() });
        self.draw(ring, PaintMode::Fill);
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Hex, thickness: f32) {
        let ring = self.rect_ring(x, y, width, height);
        self.set_stroke(color, thickness);
        self.draw(ring, PaintMode::Stroke);
    }

    pub fn fill_rounded_rect(&mut self, x: f32, y: f32, width: f32, height: f32, radius: f32, color: Hex) {
        let ring = self.rounded_ring(x, y, width, height, radius);
        self.writer.push(Op::SetFillColor { col: color.color() });
        self.draw(ring, PaintMode::Fill);
    }

    pub fn stroke_rounded_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        color: Hex,
        thickness: f32,
    ) {
        let ring = self.rounded_ring(x, y, width, height, radius);
        self.set_stroke(color, thickness);
        self.draw(ring, PaintMode::Stroke);
    }

    /// Straight line between two points.
    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Hex, thickness: f32) {
        let ring = PolygonRing {
            points: vec![self.point(from.0, from.1, false), self.point(to.0, to.1, false)],
        };
        self.set_stroke(color, thickness);
        self.draw(ring, PaintMode::Stroke);
    }

    fn set_stroke(&mut self, color: Hex, thickness: f32) {
        self.writer.push(Op::SetOutlineColor { col: color.color() });
        self.writer.push(Op::SetOutlineThickness { pt: Pt(thickness) });
    }

    fn draw(&mut self, ring: PolygonRing, mode: PaintMode) {
        self.writer.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![ring],
                mode,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    fn point(&self, x: f32, y: f32, bezier: bool) -> LinePoint {
        LinePoint {
            p: Point {
                x: Pt(x),
                y: Pt(self.geometry.height - y),
            },
            bezier,
        }
    }

    fn rect_ring(&self, x: f32, y: f32, width: f32, height: f32) -> PolygonRing {
        PolygonRing {
            points: vec![
                self.point(x, y, false),
                self.point(x + width, y, false),
                self.point(x + width, y + height, false),
                self.point(x, y + height, false),
            ],
        }
    }

    /// Rectangle with quarter-circle corners. Control points are flagged as
    /// bezier; each curve ends on a plain point.
    fn rounded_ring(&self, x: f32, y: f32, width: f32, height: f32, radius: f32) -> PolygonRing {
        let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
        if r == 0.0 {
            return self.rect_ring(x, y, width, height);
        }
        let k = r * KAPPA;
        let (right, bottom) = (x + width, y + height);

        PolygonRing {
            points: vec![
                self.point(x + r, y, false),
                self.point(right - r, y, false),
                self.point(right - r + k, y, true),
                self.point(right, y + r - k, true),
                self.point(right, y + r, false),
                self.point(right, bottom - r, false),
                self.point(right, bottom - r + k, true),
                self.point(right - r + k, bottom, true),
                self.point(right - r, bottom, false),
                self.point(x + r, bottom, false),
                self.point(x + r - k, bottom, true),
                self.point(x, bottom - r + k, true),
                self.point(x, bottom - r, false),
                self.point(x, y + r, false),
                self.point(x, y + r - k, true),
                self.point(x + r - k, y, true),
                self.point(x + r, y, false),
            ],
        }
    }

    // -- Text -----------------------------------------------------------------

    /// Write one run with its top edge at `y`, starting at `x`.
    pub fn text(&mut self, x: f32, y: f32, style: &TextStyle, text: &str) {
        if text.is_empty() {
            return;
        }
        let baseline = y + style.face.ascent() * style.size;
        let font = style.face.builtin();
        self.writer.push(Op::SetFillColor {
            col: style.color.color(),
        });
        self.writer.extend([
            Op::StartTextSection,
            Op::SetTextCursor {
                pos: Point {
                    x: Pt(x),
                    y: Pt(self.geometry.height - baseline),
                },
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(style.size),
                font,
            },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(text.to_owned())],
                font,
            },
            Op::EndTextSection,
        ]);
    }

    /// Write one line aligned within `[x, x + width]`.
    pub fn text_line(&mut self, x: f32, y: f32, width: f32, align: Align, style: &TextStyle, text: &str) {
        let x = match align {
            Align::Left => x,
            Align::Center => x + (width - text_width(text, style.face, style.size)) / 2.0,
        };
        self.text(x, y, style, text);
    }

    /// Write pre-wrapped lines and return the offset below the last one.
    pub fn lines(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        align: Align,
        style: &TextStyle,
        lines: &[String],
    ) -> f32 {
        let step = style.line_height();
        let mut line_y = y;
        for line in lines {
            self.text_line(x, line_y, width, align, style, line);
            line_y += step;
        }
        line_y
    }

    /// Wrap `text` to `width`, write it and return the offset below it.
    pub fn paragraph(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        align: Align,
        style: &TextStyle,
        text: &str,
    ) -> f32 {
        let wrapped = wrap_text(text, style.face, style.size, width);
        self.lines(x, y, width, align, style, &wrapped)
    }

    /// `label` immediately followed by `value` in a second style, wrapping the
    /// value onto further lines at `x` when it does not fit. Returns the offset
    /// below the last line.
    pub fn labelled(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        label_style: &TextStyle,
        label: &str,
        value_style: &TextStyle,
        value: &str,
    ) -> f32 {
        self.text(x, y, label_style, label);
        let label_width = text_width(label, label_style.face, label_style.size);
        let step = value_style.line_height().max(label_style.line_height());

        let first_width = (width - label_width).max(0.0);
        let wrapped = wrap_hanging(value, value_style.face, value_style.size, first_width, width);
        let Some((head, rest)) = wrapped.split_first() else {
            return y + step;
        };
        self.text(x + label_width, y, value_style, head);
        self.lines(x, y + step, width, Align::Left, value_style, rest)
    }

    // -- Images ---------------------------------------------------------------

    /// Draw `image` stretched to the given box.
    pub fn image(&mut self, image: &PlacedImage, x: f32, y: f32, width: f32, height: f32) {
        self.writer.push(Op::UseXobject {
            id: image.id.clone(),
            transform: XObjectTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(self.geometry.height - y - height)),
                scale_x: Some(width / image.width_px.max(1) as f32),
                scale_y: Some(height / image.height_px.max(1) as f32),
                rotate: None,
                dpi: Some(72.0),
            },
        });
    }

    /// Scale `image` to fit inside the box, keeping its aspect ratio, and
    /// centre it both ways.
    pub fn image_fit(&mut self, image: &PlacedImage, x: f32, y: f32, box_width: f32, box_height: f32) {
        let (w, h) = (image.width_px.max(1) as f32, image.height_px.max(1) as f32);
        let scale = (box_width / w).min(box_height / h);
        let (drawn_w, drawn_h) = (w * scale, h * scale);
        self.image(
            image,
            x + (box_width - drawn_w) / 2.0,
            y + (box_height - drawn_h) / 2.0,
            drawn_w,
            drawn_h,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::style::{ACCENT, BADGE};

    fn fills(canvas: &Canvas, color: Hex) -> usize {
        let wanted = color.color();
        canvas
            .writer()
            .pages()
            .iter()
            .flatten()
            .filter(|op| matches!(op, Op::SetFillColor { col } if *col == wanted))
            .count()
    }

    #[test]
    fn text_is_flipped_into_pdf_space() {
        let mut canvas = Canvas::a4("t");
        canvas.text(50.0, 100.0, &TextStyle::new(Face::Regular, 10.0, ACCENT), "Hei");

        let cursor = canvas.writer().pages()[0].iter().find_map(|op| match op {
            Op::SetTextCursor { pos } => Some(pos.y.0),
            _ => None,
        });
        let expected = canvas.geometry().height - (100.0 + 7.18);
        assert!((cursor.expect("cursor set") - expected).abs() < 0.01);
        assert_eq!(canvas.writer().texts(), vec!["Hei"]);
    }

    #[test]
    fn empty_text_draws_nothing() {
        let mut canvas = Canvas::a4("t");
        canvas.text(0.0, 0.0, &TextStyle::new(Face::Bold, 9.0, ACCENT), "");
        assert!(canvas.writer().pages()[0].is_empty());
    }

    #[test]
    fn rounded_rect_marks_control_points() {
        let mut canvas = Canvas::a4("t");
        canvas.fill_rounded_rect(10.0, 10.0, 100.0, 20.0, 3.0, BADGE);
        let ring = canvas.writer().pages()[0].iter().find_map(|op| match op {
            Op::DrawPolygon { polygon } => Some(polygon.rings[0].points.clone()),
            _ => None,
        });
        let points = ring.expect("polygon drawn");
        assert_eq!(points.len(), 17);
        assert_eq!(points.iter().filter(|p| p.bezier).count(), 8);
        assert_eq!(fills(&canvas, BADGE), 1);
    }

    #[test]
    fn decor_is_redrawn_on_new_pages() {
        let mut canvas = Canvas::a4("t");
        canvas.set_decor(PageDecor {
            logo: None,
            footer: "P-1 - Kunde | Generert: 01.01.2026".into(),
        });
        canvas.new_page();
        assert_eq!(canvas.page_count(), 2);
        for page in 0..2 {
            assert_eq!(
                canvas.writer().texts_on_page(page),
                vec!["P-1 - Kunde | Generert: 01.01.2026"]
            );
        }
    }

    #[test]
    fn labelled_wraps_long_values() {
        let mut canvas = Canvas::a4("t");
        let label = TextStyle::new(Face::Bold, 10.0, ACCENT);
        let value = TextStyle::new(Face::Regular, 10.0, ACCENT);
        let short = canvas.labelled(60.0, 100.0, 485.0, &label, "Kunde: ", &value, "Bygg AS");
        assert!((short - (100.0 + label.line_height())).abs() < 0.01);

        let long_value = "skjøt ".repeat(60);
        let end = canvas.labelled(60.0, 200.0, 485.0, &label, "Pakkekommentar: ", &value, &long_value);
        assert!(end > 200.0 + 2.0 * value.line_height());
    }
}
