// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kamera-report: async services on top of the record store, the uploads
// store and the document renderer.
//
// - `service`  : shared context (record store behind a mutex, uploads, paths)
// - `pipeline` : render stage then merge stage for one package
// - `ingest`   : drawing and remark uploads, multi-page drawing split
// - `aggregate`: one report per package bundled into a zip archive
// - `archive`  : project export/import archives, package JSON transfer
// - `cleanup`  : delayed best-effort removal of served files

pub mod aggregate;
pub mod archive;
pub mod cleanup;
pub mod ingest;
pub mod pipeline;
pub mod service;

pub use aggregate::ProjectReportArchive;
pub use archive::{ImportSummary, PackageExport, ProjectExport};
pub use cleanup::schedule_cleanup;
pub use pipeline::GeneratedReport;
pub use service::ReportService;
