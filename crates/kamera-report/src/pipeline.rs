// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Package report pipeline.
//
// Two stages run strictly in sequence for one package:
//
// 1. Render: read the attachments, compose the body and write it to a unique
//    file under the reports directory. Any write failure ends the report.
// 2. Merge: once the body is on disk, read it back, append every page of
//    each section's drawing and replace the file in place. A drawing that
//    cannot be read is skipped; if the container itself cannot be merged the
//    unmerged body is kept.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use kamera_core::error::{KameraError, Result};
use kamera_core::format::{file_date, slug};
use kamera_core::{FullPackage, RecordId};
use kamera_document::{DrawingSource, ReportAssets, ReportComposer, ReportSection, merge_drawings};
use kamera_store::blobs::unique_name;
use tracing::{debug, error, info, instrument, warn};

use crate::service::ReportService;

/// A finished package report on disk.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    /// Working file under the reports directory.
    pub path: PathBuf,
    /// Name to present the file under: `<package>_<YYYY-MM-DD>.pdf`.
    pub file_name: String,
    /// Body pages plus appended drawing pages.
    pub page_count: usize,
    pub sections: Vec<ReportSection>,
    pub missing_images: usize,
    pub merged_drawings: usize,
    /// Sections whose drawing was missing or unreadable.
    pub skipped_drawings: Vec<String>,
}

#[derive(Debug, Default)]
struct MergeSummary {
    merged: usize,
    appended_pages: usize,
    skipped: Vec<String>,
}

/// `<slug(name)>_<YYYY-MM-DD>.pdf`.
pub fn report_file_name(package_name: &str, at: &DateTime<Local>) -> String {
    format!("{}_{}.pdf", slug(package_name), file_date(at))
}

impl ReportService {
    /// Render and merge the report for one package.
    #[instrument(skip(self))]
    pub async fn generate_package_report(&self, package_id: RecordId) -> Result<GeneratedReport> {
        let package = self.load_package(package_id).await?;
        self.generate_report_for(package, Local::now()).await
    }

    /// Run both stages over an already hydrated package.
    pub(crate) async fn generate_report_for(
        &self,
        package: FullPackage,
        now: DateTime<Local>,
    ) -> Result<GeneratedReport> {
        let package_id = package.package.id;
        let file_name = report_file_name(&package.package.name, &now);

        // -- Render stage --
        let assets = self.read_assets(&package).await;
        let (package, composed) = tokio::task::spawn_blocking(move || {
            let composed = ReportComposer::new(&package, &assets).generated_at(now).compose();
            (package, composed)
        })
        .await
        .map_err(|e| KameraError::Render(format!("composer task failed: {e}")))?;
        let composed =
            composed.map_err(|e| KameraError::Render(format!("report body not serialised: {e}")))?;

        tokio::fs::create_dir_all(self.reports_dir())
            .await
            .map_err(|e| write_error(self.reports_dir(), e))?;
        let path = self
            .reports_dir()
            .join(unique_name(Some(&format!("package{package_id}")), "pdf"));
        tokio::fs::write(&path, &composed.bytes)
            .await
            .map_err(|e| write_error(&path, e))?;
        debug!(path = %path.display(), bytes = composed.bytes.len(), "report body written");

        // -- Merge stage --
        let merge = self.merge_stage(&path, &package).await;

        let report = GeneratedReport {
            path,
            file_name,
            page_count: composed.page_count + merge.appended_pages,
            sections: composed.sections,
            missing_images: composed.missing_images,
            merged_drawings: merge.merged,
            skipped_drawings: merge.skipped,
        };
        info!(
            package_id,
            file = %report.file_name,
            pages = report.page_count,
            drawings = report.merged_drawings,
            "package report generated"
        );
        Ok(report)
    }

    /// Read the logo and every remark photo. Anything unreadable is left out
    /// and rendered as a placeholder.
    async fn read_assets(&self, package: &FullPackage) -> ReportAssets {
        let mut assets = ReportAssets::new();

        if let Some(logo) = self.logo_path() {
            match tokio::fs::read(logo).await {
                Ok(bytes) => assets = assets.with_logo(bytes),
                Err(e) => warn!(path = %logo.display(), error = %e, "logo unreadable"),
            }
        }

        for remark in package.lines.iter().flat_map(|line| &line.remarks) {
            if remark.image_path.trim().is_empty() {
                continue;
            }
            match self.uploads().read(&remark.image_path).await {
                Ok(bytes) => assets.insert_image(remark.id, bytes),
                Err(e) => warn!(remark = remark.id, image = %remark.image_path, %e, "remark image missing"),
            }
        }

        assets
    }

    async fn merge_stage(&self, path: &Path, package: &FullPackage) -> MergeSummary {
        let mut summary = MergeSummary::default();
        if !package.has_drawings() {
            return summary;
        }

        let mut drawings: Vec<(String, Vec<u8>)> = Vec::new();
        for line in &package.lines {
            let Some(stored) = line.line.drawing() else {
                continue;
            };
            match self.uploads().read(stored).await {
                Ok(bytes) => drawings.push((line.line.name.clone(), bytes)),
                Err(e) => {
                    warn!(line = %line.line.name, drawing = stored, %e, "drawing missing");
                    summary.skipped.push(line.line.name.clone());
                }
            }
        }
        if drawings.is_empty() {
            return summary;
        }

        let body = match tokio::fs::read(path).await {
            Ok(body) => body,
            Err(e) => {
                error!(path = %path.display(), error = %e, "report body unreadable, keeping it unmerged");
                return summary;
            }
        };

        let merged = tokio::task::spawn_blocking(move || {
            let sources: Vec<DrawingSource<'_>> = drawings
                .iter()
                .map(|(line_name, bytes)| DrawingSource { line_name, bytes })
                .collect();
            merge_drawings(&body, &sources)
        })
        .await;

        let outcome = match merged {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(error = %e, "drawing merge failed, keeping the unmerged report");
                return summary;
            }
            Err(e) => {
                error!(error = %e, "merge task failed, keeping the unmerged report");
                return summary;
            }
        };

        if let Err(e) = replace_file(path, &outcome.bytes).await {
            error!(path = %path.display(), error = %e, "merged report not written, keeping the unmerged report");
            return summary;
        }

        summary.merged = outcome.merged;
        summary.appended_pages = outcome.appended_pages;
        summary.skipped.extend(outcome.skipped);
        summary
    }
}

/// Write to a sibling file and rename it over `path`, so a failed write
/// leaves the previous contents intact.
async fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let staging = path.with_extension("pdf.part");
    if let Err(e) = tokio::fs::write(&staging, bytes).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e);
    }
    tokio::fs::rename(&staging, path).await
}

fn write_error(path: &Path, e: std::io::Error) -> KameraError {
    KameraError::Render(format!("could not write report to {}: {e}", path.display()))
}
