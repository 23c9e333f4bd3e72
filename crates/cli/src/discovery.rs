//! Host config discovery logic.

use std::path::{Path, PathBuf};

use hookhost_core::config::CONFIG_FILE_NAME;
use miette::{Result, miette};

/// Finds `hookhost.json` by searching from the current directory upwards.
pub fn find_config() -> Result<Option<PathBuf>> {
    let cwd =
        std::env::current_dir().map_err(|e| miette!("Cannot get current directory: {}", e))?;
    Ok(find_config_from(&cwd))
}

/// Finds `hookhost.json` starting from the given directory.
pub fn find_config_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
