// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared service context for the async report operations.
//
// The SQLite record store is `Send` but not `Sync`, so it sits behind an
// `Arc<Mutex<>>` and every query runs inside `spawn_blocking`. Attachment
// reads and output writes go through `tokio::fs`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kamera_core::error::{KameraError, Result};
use kamera_core::{AppConfig, FullPackage, RecordId};
use kamera_store::{RecordStore, UploadStore};
use tracing::{debug, info};

/// Cheaply cloneable handle to the record store, the uploads store and the
/// working directories.
#[derive(Clone)]
pub struct ReportService {
    records: Arc<Mutex<RecordStore>>,
    uploads: UploadStore,
    reports_dir: PathBuf,
    temp_dir: PathBuf,
    logo_path: Option<PathBuf>,
    cleanup_delay: Duration,
}

impl ReportService {
    pub fn new(
        records: RecordStore,
        uploads: UploadStore,
        reports_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            uploads,
            reports_dir: reports_dir.into(),
            temp_dir: temp_dir.into(),
            logo_path: None,
            cleanup_delay: Duration::from_secs(5),
        }
    }

    /// Open the database and wire every path from `config`.
    ///
    /// Call once at startup.
    pub fn open(config: &AppConfig, data_dir: &Path) -> Result<Self> {
        info!(path = %data_dir.display(), "initialising report services");
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let records = RecordStore::open(&config.database_path)?;
        let service = Self::new(
            records,
            UploadStore::new(&config.uploads_root),
            &config.reports_dir,
            &config.temp_dir,
        )
        .with_logo(config.resolve_logo(data_dir))
        .with_cleanup_delay(Duration::from_secs(config.cleanup_delay_secs));
        info!("report services initialised");
        Ok(service)
    }

    /// Logo drawn in every page header.
    pub fn with_logo(mut self, logo_path: Option<PathBuf>) -> Self {
        self.logo_path = logo_path;
        self
    }

    pub fn with_cleanup_delay(mut self, delay: Duration) -> Self {
        self.cleanup_delay = delay;
        self
    }

    /// Create the uploads, reports and scratch directories.
    pub async fn ensure_dirs(&self) -> Result<()> {
        self.uploads.ensure_dirs().await?;
        tokio::fs::create_dir_all(&self.reports_dir).await?;
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        Ok(())
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn logo_path(&self) -> Option<&Path> {
        self.logo_path.as_deref()
    }

    /// Delay before served files are removed.
    pub fn cleanup_delay(&self) -> Duration {
        self.cleanup_delay
    }

    /// Run `f` against the record store on the blocking pool.
    pub async fn with_records<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&RecordStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let records = Arc::clone(&self.records);
        tokio::task::spawn_blocking(move || {
            let guard = records
                .lock()
                .map_err(|_| KameraError::Database("record store lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| KameraError::Database(format!("record task failed: {e}")))?
    }

    /// The hydrated package tree, or `NotFound`.
    pub async fn load_package(&self, package_id: RecordId) -> Result<FullPackage> {
        let package = self
            .with_records(move |store| store.full_package(package_id))
            .await?
            .ok_or_else(|| KameraError::not_found("package", package_id))?;
        debug!(package_id, lines = package.lines.len(), "package loaded");
        Ok(package)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use kamera_core::PackageFields;
    use kamera_document::PdfWriter;
    use tempfile::TempDir;

    /// A service over an in-memory store with every directory in a tempdir.
    pub(crate) async fn fixture() -> (TempDir, ReportService) {
        let dir = tempfile::tempdir().expect("tempdir");
        let records = RecordStore::open_in_memory().expect("open store");
        let uploads = dir.path().join("uploads");
        let service = ReportService::new(
            records,
            UploadStore::new(&uploads),
            uploads.join("reports"),
            uploads.join("temp"),
        )
        .with_cleanup_delay(Duration::from_millis(10));
        service.ensure_dirs().await.expect("dirs");
        (dir, service)
    }

    /// Like [`fixture`], but the store lives in a file so tests can open a
    /// second connection to it. Returns the database path too.
    pub(crate) async fn file_fixture() -> (TempDir, ReportService, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("kamera.db");
        let records = RecordStore::open(&db).expect("open store");
        let uploads = dir.path().join("uploads");
        let service = ReportService::new(
            records,
            UploadStore::new(&uploads),
            uploads.join("reports"),
            uploads.join("temp"),
        )
        .with_cleanup_delay(Duration::from_millis(10));
        service.ensure_dirs().await.expect("dirs");
        (dir, service, db)
    }

    /// Make every insert into `table` matching `condition` abort.
    pub(crate) fn refuse_inserts(db: &Path, table: &str, condition: &str) {
        let conn = rusqlite::Connection::open(db).expect("second connection");
        conn.execute_batch(&format!(
            "CREATE TRIGGER refuse_{table} BEFORE INSERT ON {table} WHEN {condition} \
             BEGIN SELECT RAISE(ABORT, 'insert refused'); END;"
        ))
        .expect("install trigger");
    }

    /// Drop the trigger installed by [`refuse_inserts`].
    pub(crate) fn allow_inserts(db: &Path, table: &str) {
        let conn = rusqlite::Connection::open(db).expect("second connection");
        conn.execute_batch(&format!("DROP TRIGGER refuse_{table};"))
            .expect("drop trigger");
    }

    /// A PDF with `pages` blank A4 pages.
    pub(crate) fn blank_pdf(pages: usize) -> Vec<u8> {
        let mut writer = PdfWriter::a4("drawing");
        for _ in 1..pages {
            writer.new_page();
        }
        writer.finish().expect("blank pdf")
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 140, 200]));
        let mut buffer = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .expect("encode png");
        buffer
    }

    pub(crate) async fn project_with_package(service: &ReportService, name: &str) -> (RecordId, RecordId) {
        let name = name.to_owned();
        service
            .with_records(move |store| {
                let project = store.create_project("P-100", "Bergen Kommune")?;
                let package = store.create_package(
                    project.id,
                    &PackageFields {
                        name,
                        ..PackageFields::default()
                    },
                )?;
                Ok((project.id, package.id))
            })
            .await
            .expect("seed records")
    }

    #[tokio::test]
    async fn records_run_on_the_blocking_pool() {
        let (_dir, service) = fixture().await;
        let (_, package_id) = project_with_package(&service, "Line A-12").await;

        let clone = service.clone();
        let loaded = clone.load_package(package_id).await.expect("load");
        assert_eq!(loaded.package.name, "Line A-12");
        assert_eq!(loaded.project.map(|p| p.project_number), Some("P-100".into()));
    }

    #[tokio::test]
    async fn missing_package_is_not_found() {
        let (_dir, service) = fixture().await;
        let err = service.load_package(42).await.expect_err("missing");
        assert!(matches!(err, KameraError::NotFound { entity: "package", id: 42 }));
    }

    #[tokio::test]
    async fn open_reads_paths_from_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::for_data_dir(dir.path());
        config.cleanup_delay_secs = 9;
        let service = ReportService::open(&config, dir.path()).expect("open");
        service.ensure_dirs().await.expect("dirs");

        assert!(config.reports_dir.is_dir());
        assert!(config.uploads_root.join("pdfs").is_dir());
        assert_eq!(service.cleanup_delay(), Duration::from_secs(9));
        assert!(service.logo_path().is_none());
    }
}
