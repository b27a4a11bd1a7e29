// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kamerainspeksjon: core records, error definitions and configuration shared
// across all crates.

pub mod config;
pub mod error;
pub mod format;
pub mod human_errors;
pub mod types;

pub use config::AppConfig;
pub use error::KameraError;
pub use types::*;
