// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Project export/import archives and single-package JSON transfer.
//
// An export archive holds `data.json` (format version, export time, the
// project and its hydrated packages, a SHA-256 per attachment) plus a mirror
// of every existing attachment under `files/uploads/...`. Import rebuilds the
// whole tree under a new project numbered "<original> (Importert)" and stores
// each attachment under a fresh upload name.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use kamera_core::error::{KameraError, Result};
use kamera_core::format::slug;
use kamera_core::{FullPackage, PackageFields, Project, RecordId, TestPackage};
use kamera_store::UploadKind;
use kamera_store::blobs::unique_name;
use kamera_store::integrity::{hash_bytes, verify_hash};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::service::ReportService;

/// Manifest entry name inside an export archive.
pub const MANIFEST_NAME: &str = "data.json";
/// Archive format version written by this crate.
pub const FORMAT_VERSION: &str = "1.0";
/// Suffix appended to the names of imported projects and packages.
pub const IMPORTED_SUFFIX: &str = " (Importert)";

/// A project export written to the scratch directory.
#[derive(Debug, Clone)]
pub struct ProjectExport {
    pub path: PathBuf,
    /// `<project number>_export.zip`.
    pub file_name: String,
    /// Attachments mirrored into the archive.
    pub files: usize,
}

/// A single package serialised as JSON.
#[derive(Debug, Clone)]
pub struct PackageExport {
    /// `<package name>_export.json`.
    pub file_name: String,
    pub json: String,
}

/// What an archive import created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub project_id: RecordId,
    pub packages: usize,
    pub lines: usize,
    pub remarks: usize,
    pub files: usize,
}

// -- Wire formats -------------------------------------------------------------

#[derive(Serialize)]
struct ProjectManifest<'a> {
    version: &'static str,
    #[serde(rename = "exportDate")]
    export_date: String,
    project: &'a Project,
    packages: &'a [FullPackage],
    checksums: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct PackageManifest<'a> {
    version: &'static str,
    #[serde(rename = "exportDate")]
    export_date: String,
    package: &'a FullPackage,
}

// Import types accept older exports: timestamps and ids are ignored and most
// fields may be missing.

#[derive(Debug, Deserialize)]
struct ImportedManifest {
    project: Option<ImportedProject>,
    packages: Option<Vec<ImportedPackage>>,
    #[serde(default)]
    checksums: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ImportedPackageManifest {
    package: Option<ImportedPackage>,
}

#[derive(Debug, Deserialize)]
struct ImportedProject {
    project_number: String,
    #[serde(default)]
    customer_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ImportedPackage {
    name: String,
    comment: Option<String>,
    pipe_type: Option<String>,
    lining: Option<String>,
    #[serde(rename = "pdfLines", default)]
    lines: Vec<ImportedLine>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImportedLine {
    name: String,
    pdf_path: Option<String>,
    line_number: Option<i64>,
    #[serde(default)]
    remarks: Vec<ImportedRemark>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImportedRemark {
    image_path: Option<String>,
    comment: Option<String>,
}

impl ImportedPackage {
    fn fields(&self, name: String) -> PackageFields {
        PackageFields {
            name,
            comment: self.comment.clone().unwrap_or_default(),
            pipe_type: self.pipe_type.clone(),
            lining: self.lining.clone(),
        }
    }
}

impl ReportService {
    /// Write a zip of the project's records and attachments to the scratch
    /// directory.
    #[instrument(skip(self))]
    pub async fn export_project(&self, project_id: RecordId) -> Result<ProjectExport> {
        let (project, packages) = self
            .with_records(move |store| {
                let project = store
                    .get_project(project_id)?
                    .ok_or_else(|| KameraError::not_found("project", project_id))?;
                let mut packages = Vec::new();
                for package in store.packages_by_project(project_id)? {
                    if let Some(full) = store.full_package(package.id)? {
                        packages.push(full);
                    }
                }
                Ok((project, packages))
            })
            .await?;

        let mut entries = Vec::new();
        let mut checksums = BTreeMap::new();
        for stored in attachment_refs(&packages) {
            if !self.uploads().exists(&stored).await {
                warn!(stored, "attachment missing, not exported");
                continue;
            }
            let bytes = self.uploads().read(&stored).await?;
            checksums.insert(stored.clone(), hash_bytes(&bytes));
            entries.push((file_entry_name(&stored), bytes));
        }
        let files = entries.len();

        let manifest = ProjectManifest {
            version: FORMAT_VERSION,
            export_date: iso_now(),
            project: &project,
            packages: &packages,
            checksums,
        };
        entries.insert(0, (MANIFEST_NAME.to_owned(), serde_json::to_vec_pretty(&manifest)?));

        let archive = tokio::task::spawn_blocking(move || build_zip(&entries))
            .await
            .map_err(|e| KameraError::Archive(format!("archive task failed: {e}")))??;

        tokio::fs::create_dir_all(self.temp_dir()).await?;
        let path = self
            .temp_dir()
            .join(unique_name(Some(&format!("project{project_id}-export")), "zip"));
        tokio::fs::write(&path, &archive).await?;

        let export = ProjectExport {
            path,
            file_name: format!("{}_export.zip", slug(&project.project_number)),
            files,
        };
        info!(project_id, packages = packages.len(), files, file = %export.file_name, "project exported");
        Ok(export)
    }

    /// Rebuild a project from an export archive.
    ///
    /// The archive is read and every recorded checksum verified before
    /// anything is written.
    #[instrument(skip(self, archive), fields(archive_len = archive.len()))]
    pub async fn import_project_archive(&self, archive: Vec<u8>) -> Result<ImportSummary> {
        let (manifest, mut attachments) = tokio::task::spawn_blocking(move || read_export(&archive))
            .await
            .map_err(|e| KameraError::Archive(format!("archive task failed: {e}")))??;

        let mut renamed: HashMap<String, String> = HashMap::new();
        let mut saved = Vec::new();
        for (stored, bytes) in attachments.drain() {
            let kind = if is_drawing(&stored) { UploadKind::Drawing } else { UploadKind::RemarkImage };
            match self.uploads().save(kind, &bytes, &extension_of(&stored)).await {
                Ok(new_ref) => {
                    saved.push(new_ref.clone());
                    renamed.insert(stored, new_ref);
                }
                Err(e) => {
                    self.discard_uploads(&saved).await;
                    return Err(e);
                }
            }
        }
        let files = saved.len();

        // One transaction: on error the records go with the discarded uploads.
        let created = self
            .with_records(move |store| {
                store.transaction(move |store| {
                    let ImportedManifest { project, packages, .. } = manifest;
                    let (Some(project), Some(packages)) = (project, packages) else {
                        return Err(KameraError::Validation("invalid import format".into()));
                    };
                    let new_project = store.create_project(
                        &format!("{}{IMPORTED_SUFFIX}", project.project_number),
                        &project.customer_name,
                    )?;

                    let mut summary = ImportSummary {
                        project_id: new_project.id,
                        packages: 0,
                        lines: 0,
                        remarks: 0,
                        files: 0,
                    };
                    for package in &packages {
                        let created = store.create_package(new_project.id, &package.fields(package.name.clone()))?;
                        summary.packages += 1;
                        for line in &package.lines {
                            let drawing = line.pdf_path.as_ref().and_then(|p| renamed.get(p));
                            let new_line = store.create_line(
                                created.id,
                                &line.name,
                                drawing.map(String::as_str),
                                line.line_number.unwrap_or(0),
                            )?;
                            summary.lines += 1;
                            for remark in &line.remarks {
                                let image = remark
                                    .image_path
                                    .as_ref()
                                    .and_then(|p| renamed.get(p))
                                    .map(String::as_str)
                                    .unwrap_or("");
                                store.create_remark(new_line.id, image, remark.comment.as_deref().unwrap_or(""))?;
                                summary.remarks += 1;
                            }
                        }
                    }
                    Ok(summary)
                })
            })
            .await;

        match created {
            Ok(mut summary) => {
                summary.files = files;
                info!(
                    project_id = summary.project_id,
                    packages = summary.packages,
                    lines = summary.lines,
                    remarks = summary.remarks,
                    files,
                    "project imported"
                );
                Ok(summary)
            }
            Err(e) => {
                self.discard_uploads(&saved).await;
                Err(e)
            }
        }
    }

    /// Serialise one hydrated package as JSON.
    #[instrument(skip(self))]
    pub async fn export_package_json(&self, package_id: RecordId) -> Result<PackageExport> {
        let package = self.load_package(package_id).await?;
        let manifest = PackageManifest {
            version: FORMAT_VERSION,
            export_date: iso_now(),
            package: &package,
        };
        Ok(PackageExport {
            file_name: format!("{}_export.json", slug(&package.package.name)),
            json: serde_json::to_string_pretty(&manifest)?,
        })
    }

    /// Recreate a package from its JSON export inside an existing project.
    /// Attachments are not carried: drawings are dropped and image references
    /// left empty.
    #[instrument(skip(self, json))]
    pub async fn import_package_json(&self, project_id: RecordId, json: &str) -> Result<TestPackage> {
        let manifest: ImportedPackageManifest = serde_json::from_str(json)?;
        let package = manifest
            .package
            .ok_or_else(|| KameraError::Validation("invalid import format".into()))?;

        let created = self
            .with_records(move |store| {
                if store.get_project(project_id)?.is_none() {
                    return Err(KameraError::not_found("project", project_id));
                }
                let created = store.create_package(
                    project_id,
                    &package.fields(format!("{}{IMPORTED_SUFFIX}", package.name)),
                )?;
                for line in &package.lines {
                    let new_line = store.create_line(created.id, &line.name, None, line.line_number.unwrap_or(0))?;
                    for remark in &line.remarks {
                        store.create_remark(new_line.id, "", remark.comment.as_deref().unwrap_or(""))?;
                    }
                }
                Ok(created)
            })
            .await?;
        info!(package_id = created.id, project_id, "package imported without files");
        Ok(created)
    }

    async fn discard_uploads(&self, stored: &[String]) {
        for path in stored {
            if let Err(e) = self.uploads().remove(path).await {
                warn!(path, %e, "imported attachment not removed");
            }
        }
    }
}

// -- Zip helpers --------------------------------------------------------------

/// Deflate (level 9) every `(name, bytes)` entry into an in-memory zip.
pub(crate) fn build_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), options).map_err(zip_error)?;
        writer.write_all(bytes)?;
    }
    let cursor = writer.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

/// Open an export archive: the parsed manifest plus the bytes of every
/// attachment it references that the archive carries, checksum-verified.
fn read_export(archive: &[u8]) -> Result<(ImportedManifest, HashMap<String, Vec<u8>>)> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(zip_error)?;

    let manifest_bytes = read_entry(&mut zip, MANIFEST_NAME)?
        .ok_or_else(|| KameraError::Validation("invalid export file: missing data.json".into()))?;
    let manifest: ImportedManifest = serde_json::from_slice(&manifest_bytes)?;
    let Some(packages) = manifest.packages.as_ref().filter(|_| manifest.project.is_some()) else {
        return Err(KameraError::Validation("invalid import format".into()));
    };

    let mut refs = BTreeSet::new();
    for package in packages {
        for line in &package.lines {
            refs.extend(line.pdf_path.iter().filter(|p| !p.trim().is_empty()).cloned());
            for remark in &line.remarks {
                refs.extend(remark.image_path.iter().filter(|p| !p.trim().is_empty()).cloned());
            }
        }
    }

    let mut attachments = HashMap::new();
    for stored in refs {
        let Some(bytes) = read_entry(&mut zip, &file_entry_name(&stored))? else {
            debug!(stored, "attachment not in archive");
            continue;
        };
        if let Some(expected) = manifest.checksums.get(&stored) {
            verify_hash(&bytes, expected)?;
        }
        attachments.insert(stored, bytes);
    }

    Ok((manifest, attachments))
}

fn read_entry<R: Read + std::io::Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match zip.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(zip_error(e)),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

fn zip_error(e: zip::result::ZipError) -> KameraError {
    KameraError::Archive(e.to_string())
}

// -- Naming -------------------------------------------------------------------

/// Every distinct non-blank attachment reference in the packages.
fn attachment_refs(packages: &[FullPackage]) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    for line in packages.iter().flat_map(|p| &p.lines) {
        if let Some(drawing) = line.line.drawing() {
            refs.insert(drawing.to_owned());
        }
        for remark in &line.remarks {
            if !remark.image_path.trim().is_empty() {
                refs.insert(remark.image_path.clone());
            }
        }
    }
    refs
}

/// `/uploads/pdfs/a.pdf` → `files/uploads/pdfs/a.pdf`.
fn file_entry_name(stored: &str) -> String {
    format!("files/{}", stored.trim_start_matches('/'))
}

fn is_drawing(stored: &str) -> bool {
    let trimmed = stored.trim_start_matches('/');
    trimmed.starts_with("uploads/pdfs/") || trimmed.starts_with("pdfs/")
}

fn extension_of(stored: &str) -> String {
    Path::new(stored)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_owned)
        .unwrap_or_else(|| "bin".into())
}

/// Current UTC time as `2025-03-07T09:30:00.000Z`.
fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
