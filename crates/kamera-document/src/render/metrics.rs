// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font metrics for the two built-in faces used by the report: Helvetica and
// Helvetica-Bold. Widths are the standard AFM advance widths in 1/1000 em.

use printpdf::BuiltinFont;

/// Which face a run of text uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

impl Face {
    pub fn builtin(self) -> BuiltinFont {
        match self {
            Self::Regular => BuiltinFont::Helvetica,
            Self::Bold => BuiltinFont::HelveticaBold,
        }
    }

    /// Distance from the top of a line to its baseline, per unit font size.
    pub fn ascent(self) -> f32 {
        0.718
    }

    /// Line advance per unit font size (ascender, descender and line gap).
    pub fn line_height_factor(self) -> f32 {
        match self {
            Self::Regular => 1.156,
            Self::Bold => 1.19,
        }
    }
}

// Advance widths for U+0020..=U+007E.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // space../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a..m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n..z
    389, 280, 389, 584, // {..~
];

fn latin1_width(c: char, face: Face) -> Option<u16> {
    let width = match (c, face) {
        ('æ', _) => 889,
        ('ø', Face::Regular) => 611,
        ('ø', Face::Bold) => 611,
        ('å', Face::Regular) => 556,
        ('å', Face::Bold) => 556,
        ('Æ', _) => 1000,
        ('Ø', _) => 778,
        ('Å', Face::Regular) => 667,
        ('Å', Face::Bold) => 722,
        ('é' | 'è' | 'ê' | 'ë' | 'ä' | 'ö' | 'ü', Face::Regular) => 556,
        ('é' | 'è' | 'ê' | 'ë' | 'ä', Face::Bold) => 556,
        ('ö' | 'ü', Face::Bold) => 611,
        ('Ä' | 'Ö' | 'Ü' | 'É', Face::Regular) => 700,
        ('Ä' | 'Ö' | 'Ü' | 'É', Face::Bold) => 740,
        ('°', _) => 400,
        ('§', _) => 556,
        ('–', _) => 556,
        ('…', _) => 1000,
        _ => return None,
    };
    Some(width)
}

/// Advance width of one character in 1/1000 em. Unknown glyphs count as
/// an average lowercase letter.
pub fn char_width(c: char, face: Face) -> u16 {
    let code = c as u32;
    if (0x20..=0x7E).contains(&code) {
        let table = match face {
            Face::Regular => &HELVETICA,
            Face::Bold => &HELVETICA_BOLD,
        };
        return table[(code - 0x20) as usize];
    }
    latin1_width(c, face).unwrap_or(556)
}

/// Width of `text` in points at `size`.
pub fn text_width(text: &str, face: Face, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c, face))).sum();
    units as f32 * size / 1000.0
}

/// Line advance in points for `face` at `size`.
pub fn line_height(face: Face, size: f32) -> f32 {
    face.line_height_factor() * size
}

/// Wrap `text` into lines no wider than `max_width` points.
///
/// Existing newlines are kept as paragraph breaks, blank paragraphs become
/// empty lines, and words wider than the line are broken by character.
pub fn wrap_text(text: &str, face: Face, size: f32, max_width: f32) -> Vec<String> {
    wrap_hanging(text, face, size, max_width, max_width)
}

/// Like [`wrap_text`], but the first line is limited to `first_width`, for
/// text that continues after a label on the same line. When not even the first
/// word fits there, the first line is left empty.
pub fn wrap_hanging(text: &str, face: Face, size: f32, first_width: f32, max_width: f32) -> Vec<String> {
    let mut result = Vec::new();
    let space = text_width(" ", face, size);
    let limit = |produced: usize| if produced == 0 { first_width } else { max_width };

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0.0;

        for word in words {
            let word_width = text_width(word, face, size);

            if current.is_empty() && result.is_empty() && word_width > first_width && word_width <= max_width {
                result.push(String::new());
            }
            let width = limit(result.len());

            if word_width > width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let (full_lines, rest) = break_word(word, face, size, limit(result.len()));
                result.extend(full_lines);
                current_width = text_width(&rest, face, size);
                current = rest;
            } else if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
            } else if current_width + space + word_width <= width {
                current.push(' ');
                current.push_str(word);
                current_width += space + word_width;
            } else {
                result.push(std::mem::replace(&mut current, word.to_owned()));
                current_width = word_width;
            }
        }

        if !current.is_empty() {
            result.push(current);
        }
    }

    result
}

/// Break an over-long word into full-width chunks plus a trailing remainder.
fn break_word(word: &str, face: Face, size: f32, max_width: f32) -> (Vec<String>, String) {
    let mut lines = Vec::new();
    let mut chunk = String::new();
    let mut width = 0.0;

    for c in word.chars() {
        let w = f32::from(char_width(c, face)) * size / 1000.0;
        if width + w > max_width && !chunk.is_empty() {
            lines.push(std::mem::take(&mut chunk));
            width = 0.0;
        }
        chunk.push(c);
        width += w;
    }

    (lines, chunk)
}

/// Shorten `text` with a trailing "..." so it fits `max_width`.
pub fn truncate_to_width(text: &str, face: Face, size: f32, max_width: f32) -> String {
    if text_width(text, face, size) <= max_width {
        return text.to_owned();
    }

    let ellipsis = "...";
    let budget = max_width - text_width(ellipsis, face, size);
    let mut out = String::new();
    let mut width = 0.0;
    for c in text.chars() {
        let w = f32::from(char_width(c, face)) * size / 1000.0;
        if width + w > budget {
            break;
        }
        out.push(c);
        width += w;
    }
    out.truncate(out.trim_end().len());
    out.push_str(ellipsis);
    out
}
