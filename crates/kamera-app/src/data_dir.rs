// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "KAMERA_DATA_DIR";

/// Return the application data directory, creating it if needed.
///
/// Order: explicit flag, `KAMERA_DATA_DIR`, `$XDG_DATA_HOME/kamera`,
/// `~/.local/share/kamera`, `/tmp/kamera`.
pub fn data_dir(explicit: Option<&Path>) -> PathBuf {
    let dir = resolve(explicit, |key| std::env::var(key).ok());
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn resolve(explicit: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = env(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    base_dir(&env).join("kamera")
}

fn base_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(xdg) = env("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Some(home) = env("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from("/tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v).to_owned())
    }

    #[test]
    fn flag_wins_over_environment() {
        let env = env_of(&[(DATA_DIR_ENV, "/srv/env")]);
        assert_eq!(resolve(Some(Path::new("/srv/flag")), env), PathBuf::from("/srv/flag"));
    }

    #[test]
    fn env_override_then_xdg_then_home() {
        assert_eq!(
            resolve(None, env_of(&[(DATA_DIR_ENV, "/srv/env"), ("XDG_DATA_HOME", "/xdg")])),
            PathBuf::from("/srv/env")
        );
        assert_eq!(
            resolve(None, env_of(&[("XDG_DATA_HOME", "/xdg"), ("HOME", "/home/u")])),
            PathBuf::from("/xdg/kamera")
        );
        assert_eq!(
            resolve(None, env_of(&[("HOME", "/home/u")])),
            PathBuf::from("/home/u/.local/share/kamera")
        );
        assert_eq!(resolve(None, env_of(&[])), PathBuf::from("/tmp/kamera"));
    }
}
