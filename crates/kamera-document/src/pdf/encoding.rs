// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// WinAnsi text encoding for the standard Helvetica faces.
//
// printpdf declares builtin fonts with /WinAnsiEncoding but writes the UTF-8
// bytes of each string, so "ø" would show as two glyphs. After serialisation
// every shown string is rewritten to one WinAnsi byte per character.

use kamera_core::error::{KameraError, Result};
use lopdf::content::Operation;
use lopdf::{Document, Object};
use tracing::debug;

/// Code points WinAnsi places in 0x80..=0x9F.
const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Text-showing operators whose operands carry strings.
const SHOW_TEXT: [&str; 4] = ["Tj", "TJ", "'", "\""];

/// WinAnsi code of `c`, if the encoding has one.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    match code {
        0x20..=0x7E | 0xA0..=0xFF => u8::try_from(code).ok(),
        _ => WIN_ANSI_HIGH.iter().find(|(ch, _)| *ch == c).map(|(_, byte)| *byte),
    }
}

/// Encode `text` as WinAnsi. Characters outside the encoding become `?`.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| win_ansi_byte(c).unwrap_or(b'?')).collect()
}

/// Rewrite the UTF-8 strings shown on every page of `pdf` as WinAnsi.
/// Documents with ASCII-only text are returned untouched.
pub fn encode_win_ansi_text(pdf: Vec<u8>) -> Result<Vec<u8>> {
    let mut document = Document::load_mem(&pdf).map_err(pdf_error)?;

    let mut rewritten = 0usize;
    for page_id in document.get_pages().into_values() {
        let mut content = document.get_and_decode_page_content(page_id).map_err(pdf_error)?;
        if !reencode_operations(&mut content.operations) {
            continue;
        }
        let encoded = content.encode().map_err(pdf_error)?;
        document.change_page_content(page_id, encoded).map_err(pdf_error)?;
        rewritten += 1;
    }

    if rewritten == 0 {
        return Ok(pdf);
    }
    let mut output = Vec::with_capacity(pdf.len());
    document.save_to(&mut output).map_err(|err| pdf_error(err.into()))?;
    debug!(pages = rewritten, "text re-encoded as WinAnsi");
    Ok(output)
}

fn reencode_operations(operations: &mut [Operation]) -> bool {
    let mut changed = false;
    for operation in operations
        .iter_mut()
        .filter(|op| SHOW_TEXT.contains(&op.operator.as_str()))
    {
        for operand in &mut operation.operands {
            changed |= reencode_object(operand);
        }
    }
    changed
}

fn reencode_object(object: &mut Object) -> bool {
    match object {
        Object::String(bytes, _) => {
            if bytes.is_ascii() {
                return false;
            }
            let encoded = match std::str::from_utf8(bytes) {
                Ok(text) => to_win_ansi(text),
                Err(_) => return false,
            };
            *bytes = encoded;
            true
        }
        Object::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| reencode_object(item) | changed),
        _ => false,
    }
}

fn pdf_error(err: lopdf::Error) -> KameraError {
    KameraError::PdfError(format!("text encoding failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norwegian_letters_are_single_bytes() {
        assert_eq!(to_win_ansi("rør"), vec![b'r', 0xF8, b'r']);
        assert_eq!(to_win_ansi("ÆØÅ æøå"), vec![0xC6, 0xD8, 0xC5, b' ', 0xE6, 0xF8, 0xE5]);
    }

    #[test]
    fn punctuation_uses_the_high_block() {
        assert_eq!(win_ansi_byte('–'), Some(0x96));
        assert_eq!(win_ansi_byte('…'), Some(0x85));
        assert_eq!(win_ansi_byte('€'), Some(0x80));
    }

    #[test]
    fn unmapped_characters_become_question_marks() {
        assert_eq!(to_win_ansi("a✓b"), b"a?b".to_vec());
        assert_eq!(win_ansi_byte('\u{0081}'), None);
    }

    #[test]
    fn strings_inside_arrays_are_rewritten() {
        let mut operations = vec![
            Operation::new(
                "TJ",
                vec![Object::Array(vec![Object::string_literal("Kum ø"), Object::Integer(12)])],
            ),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
        ];
        assert!(reencode_operations(&mut operations));
        let Object::Array(items) = &operations[0].operands[0] else {
            panic!("array operand");
        };
        assert_eq!(items[0].as_str().expect("string"), b"Kum \xF8");
    }

    #[test]
    fn ascii_only_content_is_left_alone() {
        let mut operations = vec![Operation::new("Tj", vec![Object::string_literal("Kum 1")])];
        assert!(!reencode_operations(&mut operations));
    }
}
