// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Kamerainspeksjon.

use thiserror::Error;

use crate::types::RecordId;

/// Top-level error type for all Kamerainspeksjon operations.
#[derive(Debug, Error)]
pub enum KameraError {
    // -- Records --
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: RecordId },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(String),

    // -- Documents --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("report rendering failed: {0}")]
    Render(String),

    // -- Archives --
    #[error("archive error: {0}")]
    Archive(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // -- Storage --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KameraError {
    /// Shorthand for a missing record.
    pub fn not_found(entity: &'static str, id: RecordId) -> Self {
        Self::NotFound { entity, id }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KameraError>;
