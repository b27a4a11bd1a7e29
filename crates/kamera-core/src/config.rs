// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// File name of the persisted configuration inside the data directory.
pub const CONFIG_FILE: &str = "kamera.json";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root that stored `/uploads/...` references resolve against.
    pub uploads_root: PathBuf,
    /// SQLite database holding projects, packages, lines and remarks.
    pub database_path: PathBuf,
    /// Working directory for generated package reports and report archives.
    pub reports_dir: PathBuf,
    /// Scratch directory for export and import archives.
    pub temp_dir: PathBuf,
    /// Logo drawn in the page header. Falls back to `assets/logo.png`, then
    /// `assets/logo.jpg` under the data directory.
    pub logo_path: Option<PathBuf>,
    /// Seconds to wait before deleting a served report or archive.
    pub cleanup_delay_secs: u64,
}

impl AppConfig {
    /// Default layout rooted at `data_dir`.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        let uploads_root = data_dir.join("uploads");
        Self {
            database_path: data_dir.join("kamera_reports.db"),
            reports_dir: uploads_root.join("reports"),
            temp_dir: uploads_root.join("temp"),
            uploads_root,
            logo_path: None,
            cleanup_delay_secs: 5,
        }
    }

    /// Load `kamera.json` from `data_dir`, or the defaults for that directory
    /// if the file does not exist.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::for_data_dir(data_dir));
        }
        let text = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&text)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Write the configuration to `kamera.json` in `data_dir`.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(CONFIG_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Resolve the logo: explicit override first, then the conventional
    /// asset names under `data_dir`.
    pub fn resolve_logo(&self, data_dir: &Path) -> Option<PathBuf> {
        if let Some(path) = &self.logo_path {
            return path.exists().then(|| path.clone());
        }
        ["logo.png", "logo.jpg"]
            .iter()
            .map(|name| data_dir.join("assets").join(name))
            .find(|candidate| candidate.exists())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_data_dir(Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_live_under_the_data_dir() {
        let config = AppConfig::for_data_dir(Path::new("/srv/kamera"));
        assert_eq!(config.uploads_root, Path::new("/srv/kamera/uploads"));
        assert_eq!(config.reports_dir, Path::new("/srv/kamera/uploads/reports"));
        assert_eq!(config.cleanup_delay_secs, 5);
    }

    #[test]
    fn missing_file_yields_defaults_and_save_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = AppConfig::load(dir.path()).expect("load defaults");
        assert_eq!(loaded, AppConfig::for_data_dir(dir.path()));

        let mut changed = loaded.clone();
        changed.cleanup_delay_secs = 30;
        changed.save(dir.path()).expect("save");
        assert_eq!(AppConfig::load(dir.path()).expect("reload"), changed);
    }

    #[test]
    fn logo_prefers_png_over_jpg() {
        let dir = tempfile::tempdir().expect("tempdir");
        let assets = dir.path().join("assets");
        std::fs::create_dir_all(&assets).expect("mkdir");
        std::fs::write(assets.join("logo.jpg"), b"jpg").expect("write jpg");
        let config = AppConfig::for_data_dir(dir.path());
        assert_eq!(config.resolve_logo(dir.path()), Some(assets.join("logo.jpg")));

        std::fs::write(assets.join("logo.png"), b"png").expect("write png");
        assert_eq!(config.resolve_logo(dir.path()), Some(assets.join("logo.png")));
    }
}
