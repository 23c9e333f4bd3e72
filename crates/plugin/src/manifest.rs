//! Plugin descriptor files and their validation.

use std::io::Read;
use std::path::{Path, PathBuf};

use hookhost_core::{HostError, Result, ValidationError};
use serde::{Deserialize, Serialize};

/// Placeholder in a command element that is replaced by the plugin directory.
pub const DIR_PLACEHOLDER: &str = "${dir}";

/// A descriptor file as decoded, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Optional explicit identifier; the name is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// How to launch the plugin. Elements may contain `${dir}`.
    #[serde(default, alias = "cmd")]
    pub command: Vec<String>,

    /// Lowest host version the plugin supports.
    #[serde(default)]
    pub min_host_version: u32,
}

/// Validated metadata for one plugin.
///
/// Only [`PluginManifest::validate`] builds one, so every descriptor has a
/// non-empty name and id and a non-empty, fully resolved command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    id: String,
    name: String,
    command: Vec<String>,
    directory: PathBuf,
    min_host_version: u32,
}

impl PluginManifest {
    /// Creates a manifest with just a name and a command.
    pub fn new<I, S>(name: impl Into<String>, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            name: name.into(),
            command: command.into_iter().map(Into::into).collect(),
            min_host_version: 0,
        }
    }

    /// Sets an explicit identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the minimal host version.
    pub fn with_min_host_version(mut self, version: u32) -> Self {
        self.min_host_version = version;
        self
    }

    /// Reads and decodes a descriptor file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file = std::fs::File::open(path).map_err(|source| HostError::OpenDescriptor {
            path: path.to_path_buf(),
            source,
        })?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|source| HostError::ReadDescriptor {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&content).map_err(|source| HostError::DecodeDescriptor {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses a descriptor from a JSON string.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Converts the manifest to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Checks the manifest and resolves `${dir}` in the command.
    ///
    /// The name is trimmed first; an empty name fails regardless of the
    /// command. The command is only rewritten once every check has passed.
    pub fn validate(
        self,
        directory: impl Into<PathBuf>,
    ) -> std::result::Result<PluginDescriptor, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let id = match self.id {
            Some(id) => {
                let id = id.trim().to_string();
                if id.is_empty() {
                    return Err(ValidationError::EmptyId);
                }
                id
            }
            None => name.clone(),
        };

        if self.command.is_empty() {
            return Err(ValidationError::EmptyCommand);
        }

        let directory = directory.into();
        let dir = directory.to_string_lossy();
        let command = self
            .command
            .iter()
            .map(|arg| arg.replace(DIR_PLACEHOLDER, &dir))
            .collect();

        Ok(PluginDescriptor {
            id,
            name,
            command,
            directory,
            min_host_version: self.min_host_version,
        })
    }
}

impl PluginDescriptor {
    /// Identity used by the registry and by hook bindings.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launch command with the plugin directory substituted.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Directory the descriptor was loaded from.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn min_host_version(&self) -> u32 {
        self.min_host_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let json = r#"{
            "name": "echo",
            "command": ["${dir}/echo", "--stdio"],
            "minHostVersion": 2
        }"#;

        let manifest = PluginManifest::from_json(json).unwrap();
        assert_eq!(manifest.name, "echo");
        assert_eq!(manifest.command, vec!["${dir}/echo", "--stdio"]);
        assert_eq!(manifest.min_host_version, 2);
        assert_eq!(manifest.id, None);
    }

    #[test]
    fn test_parse_cmd_alias() {
        let manifest = PluginManifest::from_json(r#"{ "name": "x", "cmd": ["run"] }"#).unwrap();
        assert_eq!(manifest.command, vec!["run"]);
        assert_eq!(manifest.min_host_version, 0);
    }

    #[test]
    fn test_blank_name_rejected_whatever_the_command() {
        for name in ["", "   ", "\t\n"] {
            for command in [vec![], vec!["run".to_string()]] {
                let manifest = PluginManifest {
                    id: None,
                    name: name.to_string(),
                    command,
                    min_host_version: 0,
                };
                assert_eq!(manifest.validate("/p"), Err(ValidationError::EmptyName));
            }
        }
    }

    #[test]
    fn test_empty_command_rejected() {
        let manifest = PluginManifest::new("echo", Vec::<String>::new());
        assert_eq!(manifest.validate("/p"), Err(ValidationError::EmptyCommand));
    }

    #[test]
    fn test_blank_id_rejected() {
        let manifest = PluginManifest::new("echo", ["run"]).with_id("  ");
        assert_eq!(manifest.validate("/p"), Err(ValidationError::EmptyId));
    }

    #[test]
    fn test_name_is_trimmed_and_used_as_id() {
        let descriptor = PluginManifest::new("  echo \n", ["run"])
            .validate("/p")
            .unwrap();
        assert_eq!(descriptor.name(), "echo");
        assert_eq!(descriptor.id(), "echo");
    }

    #[test]
    fn test_declared_id_wins() {
        let descriptor = PluginManifest::new("Echo Plugin", ["run"])
            .with_id(" org.echo ")
            .validate("/p")
            .unwrap();
        assert_eq!(descriptor.id(), "org.echo");
        assert_eq!(descriptor.name(), "Echo Plugin");
    }

    #[test]
    fn test_dir_placeholder_resolved_everywhere() {
        let descriptor = PluginManifest::new(
            "echo",
            ["${dir}/bin/echo", "--config=${dir}/a:${dir}/b", "plain"],
        )
        .validate("/opt/plugins/echo")
        .unwrap();

        assert_eq!(
            descriptor.command(),
            &[
                "/opt/plugins/echo/bin/echo".to_string(),
                "--config=/opt/plugins/echo/a:/opt/plugins/echo/b".to_string(),
                "plain".to_string(),
            ]
        );
        assert!(descriptor.command().iter().all(|a| !a.contains(DIR_PLACEHOLDER)));
        assert_eq!(descriptor.directory(), Path::new("/opt/plugins/echo"));
    }

    #[test]
    fn test_serialize_manifest() {
        let json = PluginManifest::new("echo", ["run"]).to_json().unwrap();
        assert!(json.contains("\"name\": \"echo\""));
        assert!(json.contains("\"minHostVersion\": 0"));
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let err = PluginManifest::from_file(Path::new("/no/such/plugin.json")).unwrap_err();
        assert!(matches!(err, HostError::OpenDescriptor { .. }));
    }
}
