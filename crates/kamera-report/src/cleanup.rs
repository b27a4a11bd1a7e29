// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Delayed best-effort removal of served reports and archives.

use std::path::PathBuf;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Remove `paths` after `delay` on a detached task.
///
/// Failures are logged and ignored. Callers may drop the handle; a
/// short-lived process awaits it so the files are gone before exit.
pub fn schedule_cleanup(paths: Vec<PathBuf>, delay: Duration) -> JoinHandle<()> {
    debug!(files = paths.len(), delay_ms = delay.as_millis() as u64, "cleanup scheduled");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        for path in paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "temporary file removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "cleanup failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_files_after_the_delay() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = dir.path().join("a.pdf");
        let archive = dir.path().join("a.zip");
        tokio::fs::write(&report, b"pdf").await.expect("write");
        tokio::fs::write(&archive, b"zip").await.expect("write");

        let handle = schedule_cleanup(vec![report.clone(), archive.clone()], Duration::from_millis(20));
        assert!(report.exists());
        handle.await.expect("cleanup task");

        assert!(!report.exists());
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn already_missing_files_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let handle = schedule_cleanup(vec![dir.path().join("gone.pdf")], Duration::ZERO);
        handle.await.expect("cleanup task does not panic");
    }
}
