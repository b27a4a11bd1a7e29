// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Project report aggregator: one package report per package, bundled into a
// single zip archive.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use kamera_core::error::{KameraError, Result};
use kamera_core::format::{file_date, slug};
use kamera_core::{Project, RecordId};
use kamera_store::blobs::unique_name;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::archive::build_zip;
use crate::cleanup::schedule_cleanup;
use crate::pipeline::GeneratedReport;
use crate::service::ReportService;

/// A project's report archive and the package reports inside it.
#[derive(Debug, Clone)]
pub struct ProjectReportArchive {
    pub path: PathBuf,
    /// `<project number>_<YYYY-MM-DD>.zip`.
    pub file_name: String,
    pub reports: Vec<GeneratedReport>,
    /// Entry name of each report inside the archive, in package order.
    pub entries: Vec<String>,
}

impl ProjectReportArchive {
    /// The archive and every intermediate report file.
    pub fn files(&self) -> Vec<PathBuf> {
        self.reports
            .iter()
            .map(|r| r.path.clone())
            .chain(std::iter::once(self.path.clone()))
            .collect()
    }
}

impl ReportService {
    /// Generate every package report of a project and zip them.
    ///
    /// A project without packages is rejected. Any failing package report or
    /// archive write aborts the whole run and removes what was written.
    #[instrument(skip(self))]
    pub async fn generate_project_reports(&self, project_id: RecordId) -> Result<ProjectReportArchive> {
        let (project, package_ids) = self
            .with_records(move |store| {
                let project = store
                    .get_project(project_id)?
                    .ok_or_else(|| KameraError::not_found("project", project_id))?;
                let ids: Vec<RecordId> = store.packages_by_project(project_id)?.iter().map(|p| p.id).collect();
                Ok((project, ids))
            })
            .await?;
        if package_ids.is_empty() {
            return Err(KameraError::Validation("no packages found in project".into()));
        }

        let now = Local::now();
        let mut reports = Vec::with_capacity(package_ids.len());
        for package_id in package_ids {
            let generated = match self.load_package(package_id).await {
                Ok(package) => self.generate_report_for(package, now).await,
                Err(e) => Err(e),
            };
            match generated {
                Ok(report) => reports.push(report),
                Err(e) => {
                    self.discard(&reports).await;
                    return Err(e);
                }
            }
        }

        match self.bundle(&project, &reports, now).await {
            Ok((path, entries)) => {
                let archive = ProjectReportArchive {
                    path,
                    file_name: archive_file_name(&project, &now),
                    reports,
                    entries,
                };
                info!(project_id, reports = archive.reports.len(), file = %archive.file_name, "project reports archived");
                Ok(archive)
            }
            Err(e) => {
                self.discard(&reports).await;
                Err(e)
            }
        }
    }

    /// Remove the archive and its reports after the configured delay.
    pub fn schedule_archive_cleanup(&self, archive: &ProjectReportArchive) -> JoinHandle<()> {
        schedule_cleanup(archive.files(), self.cleanup_delay())
    }

    async fn bundle(
        &self,
        project: &Project,
        reports: &[GeneratedReport],
        now: DateTime<Local>,
    ) -> Result<(PathBuf, Vec<String>)> {
        let names = entry_names(reports.iter().map(|r| r.file_name.as_str()));
        let mut entries = Vec::with_capacity(reports.len());
        for (report, name) in reports.iter().zip(&names) {
            let bytes = tokio::fs::read(&report.path)
                .await
                .map_err(|e| KameraError::Archive(format!("report {} unreadable: {e}", report.path.display())))?;
            entries.push((name.clone(), bytes));
        }

        let archive = tokio::task::spawn_blocking(move || build_zip(&entries))
            .await
            .map_err(|e| KameraError::Archive(format!("archive task failed: {e}")))??;

        let path = self
            .reports_dir()
            .join(unique_name(Some(&format!("{}-{}", slug(&project.project_number), file_date(&now))), "zip"));
        tokio::fs::write(&path, &archive)
            .await
            .map_err(|e| KameraError::Archive(format!("could not write {}: {e}", path.display())))?;
        Ok((path, names))
    }

    async fn discard(&self, reports: &[GeneratedReport]) {
        for report in reports {
            if let Err(e) = tokio::fs::remove_file(&report.path).await {
                warn!(path = %report.path.display(), error = %e, "report not removed");
            }
        }
    }
}

/// `<slug(project number)>_<YYYY-MM-DD>.zip`.
pub fn archive_file_name(project: &Project, at: &DateTime<Local>) -> String {
    format!("{}_{}.zip", slug(&project.project_number), file_date(at))
}

/// Archive entry names, suffixing `_2`, `_3`, ... when packages share a name.
fn entry_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .map(|name| {
            let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
            let mut candidate = name.to_owned();
            let mut n = 2;
            while !seen.insert(candidate.clone()) {
                candidate = if ext.is_empty() { format!("{stem}_{n}") } else { format!("{stem}_{n}.{ext}") };
                n += 1;
            }
            candidate
        })
        .collect()
}
