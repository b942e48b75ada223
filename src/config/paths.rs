//! Canonical paths under the arrcoon home directory.
//!
//! | Path | Purpose |
//! |------|---------|
//! | `<home>/config.yml` | default config file |
//! | `<home>/logs/arrcoon.log` | appended log output |
//! | `<home>/.index/` | per-item hash index |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::index::INDEX_DIR;

pub const CONFIG_FILE: &str = "config.yml";
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "arrcoon.log";

/// Resolve the home directory: an explicit path wins, otherwise the
/// directory holding the executable
pub fn home_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(home) = explicit {
        return Ok(home);
    }

    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("Executable path has no parent directory")
}

/// Config file path, defaulting to `<home>/config.yml`
pub fn config_path(home: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| home.join(CONFIG_FILE))
}

pub fn log_file(home: &Path) -> PathBuf {
    home.join(LOG_DIR).join(LOG_FILE)
}

pub fn index_dir(home: &Path) -> PathBuf {
    home.join(INDEX_DIR)
}
