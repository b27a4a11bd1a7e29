// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kamera-store: persistence collaborators for the report pipeline.
//
// A SQLite record store (projects → packages → lines → remarks with cascading
// deletes) and an uploads blob store that maps stored `/uploads/...`
// references onto a root directory.

pub mod blobs;
pub mod integrity;
pub mod records;

pub use blobs::{UploadKind, UploadStore};
pub use records::{RecordCounts, RecordStore};
