// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Uploads blob store.
//
// Records reference attachments by stored paths such as
// `/uploads/pdfs/1718000000000-123456789.pdf`. This module owns the mapping of
// those references onto a configurable root directory and the generation of
// unique file names for new uploads.

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use kamera_core::error::Result;
use tracing::{debug, instrument, warn};

/// Prefix every stored reference carries.
pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Which upload area a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// ISO drawings attached to pipe sections.
    Drawing,
    /// Remark photographs.
    RemarkImage,
}

impl UploadKind {
    /// Subdirectory under the uploads root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Drawing => "pdfs",
            Self::RemarkImage => "remarks",
        }
    }
}

/// File-blob store rooted at the uploads directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root and the per-kind subdirectories.
    pub async fn ensure_dirs(&self) -> Result<()> {
        for kind in [UploadKind::Drawing, UploadKind::RemarkImage] {
            tokio::fs::create_dir_all(self.root.join(kind.dir_name())).await?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a stored reference onto the filesystem.
    ///
    /// Accepts `/uploads/x`, `uploads/x` and bare relative paths. Only normal
    /// path components are kept, so a reference can never escape the root.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let relative = stored
            .strip_prefix(UPLOADS_PREFIX)
            .or_else(|| stored.strip_prefix("uploads/"))
            .unwrap_or(stored);

        let mut path = self.root.clone();
        for component in Path::new(relative).components() {
            if let Component::Normal(part) = component {
                path.push(part);
            }
        }
        path
    }

    /// Whether the referenced file exists. Errors count as absent.
    pub async fn exists(&self, stored: &str) -> bool {
        if stored.trim().is_empty() {
            return false;
        }
        tokio::fs::try_exists(self.resolve(stored)).await.unwrap_or(false)
    }

    /// Read the referenced file.
    pub async fn read(&self, stored: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.resolve(stored)).await?)
    }

    /// Store a new upload under a unique generated name and return its
    /// stored reference.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub async fn save(&self, kind: UploadKind, bytes: &[u8], extension: &str) -> Result<String> {
        let name = unique_name(None, extension);
        self.save_named(kind, &name, bytes).await
    }

    /// Store one page of a split drawing, named `...-page<N>.pdf`.
    pub async fn save_page(&self, bytes: &[u8], page_number: usize) -> Result<String> {
        let name = unique_name(Some(&format!("page{page_number}")), "pdf");
        self.save_named(UploadKind::Drawing, &name, bytes).await
    }

    async fn save_named(&self, kind: UploadKind, name: &str, bytes: &[u8]) -> Result<String> {
        let stored = format!("{UPLOADS_PREFIX}{}/{name}", kind.dir_name());
        self.write(&stored, bytes).await?;
        debug!(stored, "upload stored");
        Ok(stored)
    }

    /// Write bytes at an existing stored reference, creating parent
    /// directories. Used when restoring imported attachments.
    pub async fn write(&self, stored: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(stored);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    /// Remove the referenced file. Missing files are not an error.
    pub async fn remove(&self, stored: &str) -> Result<()> {
        match tokio::fs::remove_file(self.resolve(stored)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(stored, "upload already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// `<millis>-<random>[-<suffix>].<ext>`, unique per call.
pub fn unique_name(suffix: Option<&str>, extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let random = uuid::Uuid::new_v4().as_u128() % 1_000_000_000;
    let extension = extension.trim_start_matches('.');
    match suffix {
        Some(suffix) => format!("{millis}-{random}-{suffix}.{extension}"),
        None => format!("{millis}-{random}.{extension}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_strips_the_uploads_prefix() {
        let store = UploadStore::new("/data/uploads");
        assert_eq!(
            store.resolve("/uploads/pdfs/a.pdf"),
            PathBuf::from("/data/uploads/pdfs/a.pdf")
        );
        assert_eq!(
            store.resolve("uploads/remarks/b.jpg"),
            PathBuf::from("/data/uploads/remarks/b.jpg")
        );
    }

    #[test]
    fn resolve_never_escapes_the_root() {
        let store = UploadStore::new("/data/uploads");
        assert_eq!(
            store.resolve("/uploads/../../etc/passwd"),
            PathBuf::from("/data/uploads/etc/passwd")
        );
    }

    #[test]
    fn unique_names_differ_and_keep_suffix() {
        let a = unique_name(Some("page2"), ".pdf");
        let b = unique_name(Some("page2"), "pdf");
        assert_ne!(a, b);
        assert!(a.ends_with("-page2.pdf"));
    }

    #[tokio::test]
    async fn save_read_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path());
        store.ensure_dirs().await.expect("dirs");

        let stored = store
            .save(UploadKind::RemarkImage, b"jpeg bytes", "jpg")
            .await
            .expect("save");
        assert!(stored.starts_with("/uploads/remarks/"));
        assert!(store.exists(&stored).await);
        assert_eq!(store.read(&stored).await.expect("read"), b"jpeg bytes");

        store.remove(&stored).await.expect("remove");
        assert!(!store.exists(&stored).await);
        store.remove(&stored).await.expect("second remove is fine");
    }

    #[tokio::test]
    async fn blank_reference_never_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path());
        assert!(!store.exists("").await);
    }
}
