// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload ingestion: pipe sections with an optional drawing, and remarks with
// their photo.
//
// A multi-page drawing is split so every resulting section references a
// single page. The sections are named "<name> - Side <N>" and numbered from
// the requested line number upwards; existing numbers are not checked.

use kamera_core::error::{KameraError, Result};
use kamera_core::{PdfLine, RecordId, Remark};
use kamera_document::PdfReader;
use kamera_store::UploadKind;
use tracing::{info, instrument, warn};

use crate::service::ReportService;

/// Sections created from one upload.
#[derive(Debug, Clone)]
pub struct IngestedLines {
    pub lines: Vec<PdfLine>,
    /// Whether a multi-page drawing was split into several sections.
    pub split: bool,
}

impl ReportService {
    /// Create a pipe section, storing its drawing when one is given.
    #[instrument(skip(self, drawing), fields(drawing_len = drawing.as_ref().map(Vec::len)))]
    pub async fn create_line(
        &self,
        package_id: RecordId,
        name: &str,
        line_number: i64,
        drawing: Option<Vec<u8>>,
    ) -> Result<IngestedLines> {
        let name = name.trim().to_owned();
        if name.is_empty() {
            return Err(KameraError::Validation("line name is required".into()));
        }
        self.with_records(move |store| {
            store
                .get_package(package_id)?
                .map(|_| ())
                .ok_or_else(|| KameraError::not_found("package", package_id))
        })
        .await?;

        let Some(drawing) = drawing else {
            let line = self
                .with_records(move |store| store.create_line(package_id, &name, None, line_number))
                .await?;
            return Ok(IngestedLines { lines: vec![line], split: false });
        };

        let original = self.uploads().save(UploadKind::Drawing, &drawing, "pdf").await?;
        let pages = match split_drawing(drawing).await {
            Ok(pages) => pages,
            Err(e) => {
                self.uploads().remove(&original).await?;
                return Err(e);
            }
        };

        if pages.len() == 1 {
            let line = self
                .with_records(move |store| store.create_line(package_id, &name, Some(original.as_str()), line_number))
                .await?;
            return Ok(IngestedLines { lines: vec![line], split: false });
        }

        let mut stored = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            stored.push(self.uploads().save_page(page, index + 1).await?);
        }

        // All sections or none: the error path below removes every page file.
        let page_refs = stored.clone();
        let created = self
            .with_records(move |store| {
                store.transaction(|store| {
                    page_refs
                        .iter()
                        .enumerate()
                        .map(|(index, path)| {
                            let line_name = format!("{name} - Side {}", index + 1);
                            store.create_line(package_id, &line_name, Some(path.as_str()), line_number + index as i64)
                        })
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await;

        let lines = match created {
            Ok(lines) => lines,
            Err(e) => {
                for path in &stored {
                    if let Err(cleanup) = self.uploads().remove(path).await {
                        warn!(path, %cleanup, "split page not removed");
                    }
                }
                self.uploads().remove(&original).await?;
                return Err(e);
            }
        };

        self.uploads().remove(&original).await?;
        info!(package_id, pages = lines.len(), "multi-page drawing split into sections");
        Ok(IngestedLines { lines, split: true })
    }

    /// Store a remark photo and attach it to a section.
    #[instrument(skip(self, image, comment), fields(image_len = image.len()))]
    pub async fn add_remark(
        &self,
        line_id: RecordId,
        image: &[u8],
        extension: &str,
        comment: &str,
    ) -> Result<Remark> {
        if image.is_empty() {
            return Err(KameraError::Validation("image file is required".into()));
        }
        self.with_records(move |store| {
            store
                .get_line(line_id)?
                .map(|_| ())
                .ok_or_else(|| KameraError::not_found("line", line_id))
        })
        .await?;

        let stored = self.uploads().save(UploadKind::RemarkImage, image, extension).await?;
        let comment = comment.to_owned();
        self.with_records(move |store| store.create_remark(line_id, &stored, &comment))
            .await
    }
}

/// One single-page document per page of `drawing`.
async fn split_drawing(drawing: Vec<u8>) -> Result<Vec<Vec<u8>>> {
    tokio::task::spawn_blocking(move || {
        let reader = PdfReader::from_bytes(&drawing)?;
        match reader.page_count() {
            0 => Err(KameraError::Validation("drawing has no pages".into())),
            1 => Ok(vec![drawing]),
            _ => reader.split_pages(),
        }
    })
    .await
    .map_err(|e| KameraError::PdfError(format!("split task failed: {e}")))?
}
