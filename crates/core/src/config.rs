//! Host configuration file (`hookhost.json`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HostError, Result};
use crate::messages::{MapCatalog, Messages};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "hookhost.json";

/// Default descriptor file name inside each plugin directory.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "plugin.json";

/// Host-side settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
    /// Root directory whose subdirectories are plugins.
    pub plugins_dir: Option<PathBuf>,

    /// Descriptor file name looked up in each plugin directory.
    pub descriptor_file: String,

    /// Version of this host, compared against `minHostVersion`.
    pub host_version: u32,

    /// Reject plugins that require a newer host.
    pub enforce_min_host_version: bool,

    /// Optional JSON message catalog.
    pub catalog: Option<PathBuf>,

    /// Default log filter when neither `-v` nor `RUST_LOG` is given.
    pub log_level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugins_dir: None,
            descriptor_file: DEFAULT_DESCRIPTOR_FILE.to_string(),
            host_version: 1,
            enforce_min_host_version: false,
            catalog: None,
            log_level: "warn".to_string(),
        }
    }
}

impl HostConfig {
    /// Loads a config file. Relative paths inside it are resolved against the
    /// file's own directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| HostError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content).map_err(|source| HostError::DecodeConfig {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve_relative_to(base))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    fn resolve_relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.plugins_dir = self.plugins_dir.map(resolve);
        self.catalog = self.catalog.map(resolve);
        self
    }

    /// The configured plugins directory, or `<data dir>/hookhost/plugins`.
    pub fn plugins_dir(&self) -> PathBuf {
        self.plugins_dir.clone().unwrap_or_else(default_plugins_dir)
    }

    /// Builds the message renderer, loading the catalog when one is set.
    pub fn messages(&self) -> Result<Messages> {
        match &self.catalog {
            Some(path) => Ok(Messages::new(MapCatalog::from_file(path)?)),
            None => Ok(Messages::english()),
        }
    }
}

fn default_plugins_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hookhost")
        .join("plugins")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::messages::MessageKey;

    #[test]
    fn test_defaults() {
        let config = HostConfig::from_json("{}").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.descriptor_file, "plugin.json");
        assert!(!config.enforce_min_host_version);
        assert!(config.plugins_dir().ends_with("hookhost/plugins"));
    }

    #[test]
    fn test_camel_case_fields() {
        let config = HostConfig::from_json(
            r#"{ "hostVersion": 3, "enforceMinHostVersion": true, "descriptorFile": "meta.json" }"#,
        )
        .unwrap();
        assert_eq!(config.host_version, 3);
        assert!(config.enforce_min_host_version);
        assert_eq!(config.descriptor_file, "meta.json");
    }

    #[test]
    fn test_relative_paths_follow_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "pluginsDir": "plugins", "catalog": "/abs/zh.json" }"#).unwrap();

        let config = HostConfig::from_file(&path).unwrap();
        assert_eq!(config.plugins_dir(), dir.path().join("plugins"));
        assert_eq!(config.catalog, Some(PathBuf::from("/abs/zh.json")));
    }

    #[test]
    fn test_bad_json_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        let err = HostConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, HostError::DecodeConfig { .. }));
    }

    #[test]
    fn test_messages_load_catalog() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("zh.json"),
            r#"{ "plugin.not-found": "找不到插件 {plugin}" }"#,
        )
        .unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "catalog": "zh.json" }"#).unwrap();

        let messages = HostConfig::from_file(&path).unwrap().messages().unwrap();
        let err = HostError::PluginNotFound("echo".to_string());
        assert_eq!(messages.render(&err), "找不到插件 echo");

        // sanity: the key used above is the one the catalog file names
        assert_eq!(MessageKey::PluginNotFound.id(), "plugin.not-found");
    }
}
