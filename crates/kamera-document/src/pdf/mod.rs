// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading, splitting and appending existing PDFs, and assembling
// new ones from drawing operations.

pub mod encoding;
pub mod reader;
pub mod writer;

pub use reader::PdfReader;
pub use writer::PdfWriter;
