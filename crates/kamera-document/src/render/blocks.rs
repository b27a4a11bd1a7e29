// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content block renderers.
//
// Each block draws at a given vertical offset and returns the offset just
// below what it drew. Blocks never break pages themselves; the composer checks
// room with the layout cursor before calling them.

use kamera_core::format::norwegian_date;
use kamera_core::{FullLine, FullPackage, Project};

use crate::render::canvas::{Align, Canvas, PlacedImage, TextStyle};
use crate::render::metrics::{Face, truncate_to_width, wrap_text};
use crate::render::style::{
    ACCENT, ACCENT_LIGHT, BADGE, BLACK, BORDER, IMAGE_BORDER, MUTED, NO, PANEL, SECTION_PANEL,
    TEXT, TEXT_SECONDARY, WHITE, YES,
};

pub const REPORT_TITLE: &str = "Kamerainspeksjonsrapport";

const HEADER_HEIGHT: f32 = 80.0;
const BANNER_HEIGHT: f32 = 20.0;
const SUMMARY_INDENT: f32 = 10.0;

/// Section table column widths: number, name, drawing, remark count.
pub const TABLE_COLUMNS: [f32; 4] = [70.0, 190.0, 100.0, 100.0];
pub const TABLE_HEADER_HEIGHT: f32 = 28.0;
pub const TABLE_ROW_HEIGHT: f32 = 26.0;
const TABLE_HEADINGS: [&str; 4] = ["Seksjon #", "Seksjonsnavn", "ISO-tegning", "Merknader"];
const CELL_PADDING: f32 = 8.0;

pub const SECTION_HEADER_HEIGHT: f32 = 30.0;
const REMARK_INSET: f32 = 65.0;
pub const IMAGE_FRAME_HEIGHT: f32 = 220.0;
const COMMENT_SIZE: f32 = 9.0;
const COMMENT_TEXT_OFFSET: f32 = 20.0;
const COMMENT_CONTINUED_OFFSET: f32 = 8.0;
const COMMENT_PADDING: f32 = 10.0;

fn table_width() -> f32 {
    TABLE_COLUMNS.iter().sum()
}

fn style(face: Face, size: f32, color: crate::render::style::Hex) -> TextStyle {
    TextStyle::new(face, size, color)
}

/// Title box with the report title, project line and package name.
pub fn header(canvas: &mut Canvas, y: f32, project: Option<&Project>, package_name: &str) -> f32 {
    let geometry = *canvas.geometry();
    let (x, width) = (geometry.margin_left, geometry.content_width());
    canvas.fill_rect(x, y, width, HEADER_HEIGHT, PANEL);

    let title = style(Face::Bold, 26.0, ACCENT);
    let mut line_y = canvas.paragraph(x, y + 15.0, width, Align::Center, &title, REPORT_TITLE);
    line_y += 0.8 * title.line_height();

    if let Some(project) = project {
        let project_style = style(Face::Bold, 14.0, ACCENT_LIGHT);
        let customer_style = style(Face::Regular, 12.0, TEXT_SECONDARY);
        let project_line = format!("Prosjekt: {}", project.project_number);
        let customer_line = format!("Kunde: {}", project.customer_name);
        line_y = canvas.paragraph(x, line_y, width, Align::Center, &project_style, &project_line);
        line_y = canvas.paragraph(x, line_y, width, Align::Center, &customer_style, &customer_line);
        line_y += 0.5 * customer_style.line_height();
    }

    let package_style = style(Face::Bold, 18.0, ACCENT_LIGHT);
    canvas.paragraph(x, line_y, width, Align::Center, &package_style, package_name)
}

/// Full-width rounded banner with a centred white label.
pub fn banner(canvas: &mut Canvas, y: f32, label: &str) -> f32 {
    let geometry = *canvas.geometry();
    let (x, width) = (geometry.margin_left, geometry.content_width());
    canvas.fill_rounded_rect(x, y, width, BANNER_HEIGHT, 3.0, ACCENT);
    let label_style = style(Face::Bold, 14.0, WHITE);
    canvas.paragraph(x, y + 5.0, width, Align::Center, &label_style, label)
}

/// Outlined box of labelled package facts. Returns the box's bottom edge.
pub fn summary_box(canvas: &mut Canvas, y: f32, package: &FullPackage) -> f32 {
    let geometry = *canvas.geometry();
    let x = geometry.margin_left + SUMMARY_INDENT;
    let width = geometry.width - x - geometry.margin_right;
    let label = style(Face::Bold, 10.0, ACCENT);
    let value = style(Face::Regular, 10.0, TEXT);

    let mut facts: Vec<(&str, String)> = Vec::new();
    if let Some(project) = &package.project {
        facts.push(("Prosjektnummer: ", project.project_number.clone()));
        facts.push(("Kunde: ", project.customer_name.clone()));
    }
    facts.push(("Pakkenavn: ", package.package.name.clone()));
    facts.push(("Dato: ", norwegian_date(&package.package.created_at)));
    if let Some(pipe_type) = package.package.pipe_type() {
        facts.push(("Type rør: ", pipe_type.to_owned()));
    }
    if let Some(lining) = package.package.lining() {
        facts.push(("Lining: ", lining.to_owned()));
    }

    let mut line_y = y + SUMMARY_INDENT;
    for (fact, text) in &facts {
        line_y = canvas.labelled(x, line_y, width, &label, fact, &value, text);
    }

    line_y += 0.3 * value.line_height();
    let totals = [
        ("Totalt antall rørseksjoner: ", package.lines.len()),
        ("Totalt antall merknader: ", package.total_remarks()),
    ];
    for (fact, count) in totals {
        line_y = canvas.labelled(x, line_y, width, &label, fact, &value, &count.to_string());
    }

    if !package.package.comment.is_empty() {
        line_y += 0.5 * value.line_height();
        line_y = canvas.labelled(
            x,
            line_y,
            width,
            &label,
            "Pakkekommentar: ",
            &value,
            &package.package.comment,
        );
    }

    let bottom = line_y + SUMMARY_INDENT;
    canvas.stroke_rounded_rect(
        geometry.margin_left,
        y,
        geometry.content_width(),
        bottom - y,
        5.0,
        BORDER,
        1.0,
    );
    bottom
}

/// Coloured heading row of the section table.
pub fn table_header(canvas: &mut Canvas, y: f32) -> f32 {
    let x = canvas.geometry().margin_left;
    canvas.fill_rect(x, y, table_width(), TABLE_HEADER_HEIGHT, ACCENT);

    let heading = style(Face::Bold, 10.0, WHITE);
    let mut column_x = x;
    for (title, column_width) in TABLE_HEADINGS.iter().zip(TABLE_COLUMNS) {
        canvas.text(column_x + CELL_PADDING, y + 10.0, &heading, title);
        column_x += column_width;
    }
    y + TABLE_HEADER_HEIGHT
}

/// One zebra-striped row: section number, name, drawing yes/no and a remark
/// count badge. `index` is the row's position in the table.
pub fn table_row(canvas: &mut Canvas, y: f32, index: usize, line: &FullLine) -> f32 {
    let x = canvas.geometry().margin_left;
    let background = if index % 2 == 0 { WHITE } else { PANEL };
    canvas.fill_rect(x, y, table_width(), TABLE_ROW_HEIGHT, background);
    canvas.stroke_rect(x, y, table_width(), TABLE_ROW_HEIGHT, BORDER, 0.5);

    let text_y = y + CELL_PADDING;
    let columns: Vec<f32> = TABLE_COLUMNS
        .iter()
        .scan(x, |left, width| {
            let start = *left;
            *left += width;
            Some(start)
        })
        .collect();

    let number = style(Face::Bold, 10.0, TEXT);
    canvas.text(columns[0] + CELL_PADDING, text_y, &number, &line.line.line_number.to_string());

    let name = style(Face::Regular, 10.0, TEXT);
    let name_width = TABLE_COLUMNS[1] - 2.0 * CELL_PADDING;
    let fitted = truncate_to_width(&line.line.name, name.face, name.size, name_width);
    canvas.text(columns[1] + CELL_PADDING, text_y, &name, &fitted);

    let (answer, color) = if line.line.drawing().is_some() {
        ("Ja", YES)
    } else {
        ("Nei", NO)
    };
    canvas.text(columns[2] + CELL_PADDING, text_y, &style(Face::Bold, 10.0, color), answer);

    let count = line.remark_count();
    let badge_x = columns[3] + CELL_PADDING;
    if count > 0 {
        canvas.fill_rounded_rect(badge_x, y + 7.0, 28.0, 14.0, 3.0, BADGE);
        let count_style = style(Face::Bold, 10.0, BLACK);
        canvas.text_line(badge_x, text_y, 28.0, Align::Center, &count_style, &count.to_string());
    } else {
        canvas.text(badge_x, text_y, &style(Face::Regular, 10.0, MUTED), "0");
    }

    y + TABLE_ROW_HEIGHT
}

/// Heavy accent rule closing the section table.
pub fn table_bottom(canvas: &mut Canvas, y: f32) {
    let x = canvas.geometry().margin_left;
    canvas.line((x, y), (x + table_width(), y), ACCENT, 2.0);
}

/// Grey panel naming a pipe section ahead of its remarks.
pub fn section_header(canvas: &mut Canvas, y: f32, line: &FullLine) -> f32 {
    let geometry = *canvas.geometry();
    let x = geometry.margin_left;
    canvas.fill_rounded_rect(x, y, geometry.content_width(), SECTION_HEADER_HEIGHT, 5.0, SECTION_PANEL);

    let name_width = geometry.width - 140.0;
    let name = style(Face::Bold, 13.0, ACCENT);
    let fitted = truncate_to_width(&line.line.name, name.face, name.size, name_width);
    canvas.text(x + 10.0, y + 8.0, &name, &fitted);

    let number = style(Face::Regular, 10.0, MUTED);
    canvas.text(x + 10.0, y + 20.0, &number, &format!("Seksjon {}", line.line.line_number));

    y + SECTION_HEADER_HEIGHT + 5.0
}

/// Small numbered badge opening a remark block.
pub fn remark_badge(canvas: &mut Canvas, y: f32, number: usize) -> f32 {
    canvas.fill_rounded_rect(REMARK_INSET, y + 10.0, 35.0, 18.0, 3.0, BADGE);
    let label = style(Face::Bold, 11.0, BLACK);
    canvas.text_line(REMARK_INSET, y + 13.0, 35.0, Align::Center, &label, &format!("#{number}"));
    y + 35.0
}

/// Bordered frame holding a remark photo scaled to fit.
pub fn image_frame(canvas: &mut Canvas, y: f32, image: &PlacedImage) -> f32 {
    let width = canvas.geometry().width - 2.0 * REMARK_INSET;
    canvas.stroke_rounded_rect(REMARK_INSET, y, width, IMAGE_FRAME_HEIGHT, 3.0, IMAGE_BORDER, 1.0);
    canvas.image_fit(image, REMARK_INSET + 5.0, y + 5.0, width - 10.0, IMAGE_FRAME_HEIGHT - 10.0);
    y + IMAGE_FRAME_HEIGHT + 10.0
}

/// Inline note shown where a remark photo could not be loaded.
pub fn image_placeholder(canvas: &mut Canvas, y: f32) -> f32 {
    let note = style(Face::Regular, 10.0, NO);
    canvas.text(REMARK_INSET, y, &note, "[Kunne ikke laste bilde]");
    y + 1.5 * note.line_height()
}

/// Wrap a remark comment for the comment box.
pub fn comment_lines(canvas: &Canvas, comment: &str) -> Vec<String> {
    let width = canvas.geometry().width - 2.0 * REMARK_INSET - 2.0 * COMMENT_PADDING;
    wrap_text(comment, Face::Regular, COMMENT_SIZE, width)
}

/// Height of a comment box holding `lines` lines.
pub fn comment_box_height(lines: usize, labelled: bool) -> f32 {
    let offset = if labelled {
        COMMENT_TEXT_OFFSET
    } else {
        COMMENT_CONTINUED_OFFSET
    };
    offset + lines as f32 * comment_line_height() + COMMENT_PADDING
}

pub fn comment_line_height() -> f32 {
    TextStyle::new(Face::Regular, COMMENT_SIZE, TEXT).line_height()
}

/// Shaded box with the "KOMMENTAR:" label and the comment text. A
/// continuation box (`labelled == false`) carries only text. The fill is drawn
/// first so the text sits on top. Returns the box's bottom edge.
pub fn comment_box(canvas: &mut Canvas, y: f32, lines: &[String], labelled: bool) -> f32 {
    let width = canvas.geometry().width - 2.0 * REMARK_INSET;
    let bottom = y + comment_box_height(lines.len(), labelled);
    canvas.fill_rounded_rect(REMARK_INSET, y, width, bottom - y, 3.0, PANEL);

    let text_x = REMARK_INSET + COMMENT_PADDING;
    let text_width = width - 2.0 * COMMENT_PADDING;
    let offset = if labelled {
        let label = style(Face::Bold, COMMENT_SIZE, MUTED);
        canvas.text(text_x, y + 8.0, &label, "KOMMENTAR:");
        COMMENT_TEXT_OFFSET
    } else {
        COMMENT_CONTINUED_OFFSET
    };
    let body = style(Face::Regular, COMMENT_SIZE, TEXT);
    canvas.lines(text_x, y + offset, text_width, Align::Left, &body, lines);
    bottom
}

/// Outline around one remark block, from `top` to `bottom`.
pub fn remark_border(canvas: &mut Canvas, top: f32, bottom: f32) {
    let geometry = *canvas.geometry();
    let x = geometry.margin_left + 5.0;
    let width = geometry.width - 2.0 * x;
    canvas.stroke_rounded_rect(x, top, width, bottom - top, 5.0, BORDER, 1.0);
}
