pub mod decode;
pub mod normalize;

pub use decode::decode;
pub use normalize::{default_execute_command, normalize, CommandSource, NormalizedConfig, Platform};

use crate::error::{ProvisionError, Result};
use crate::template::TemplateContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Settings the host driver injects into every provisioner configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    #[serde(rename = "packer_build_name")]
    pub build_name: Option<String>,

    #[serde(rename = "packer_builder_type")]
    pub builder_type: Option<String>,

    /// Host debug mode; the runner echoes the execute template when set.
    #[serde(rename = "packer_debug")]
    pub debug: bool,

    /// Accepted for compatibility with the host; has no effect here.
    #[serde(rename = "packer_force")]
    pub force: bool,

    #[serde(rename = "packer_user_variables")]
    pub user_variables: BTreeMap<String, String>,
}

impl HostConfig {
    pub const KEYS: &'static [&'static str] = &[
        "packer_build_name",
        "packer_builder_type",
        "packer_debug",
        "packer_force",
        "packer_user_variables",
    ];
}

/// Shell-local provisioner configuration, as decoded from raw blobs.
///
/// `None` and an empty value are kept apart on purpose: an absent
/// `execute_command` gets a platform default, an explicit `[]` is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub host: HostConfig,

    /// Command to execute
    #[serde(default)]
    pub command: Option<String>,

    /// Inline script lines, joined with `;` into a single command
    #[serde(default)]
    pub inline: Option<Vec<String>>,

    /// argv template used to invoke the shell; `{{.Command}}` is the command
    #[serde(default)]
    pub execute_command: Option<Vec<String>>,
}

impl Config {
    pub const KEYS: &'static [&'static str] = &["command", "inline", "execute_command"];

    /// Template context for interpolating this configuration.
    pub fn template_context(&self) -> TemplateContext {
        TemplateContext {
            data: BTreeMap::new(),
            user_variables: self.host.user_variables.clone(),
            build_name: self.host.build_name.clone(),
            builder_type: self.host.builder_type.clone(),
        }
    }

    pub fn is_known_key(key: &str) -> bool {
        Self::KEYS.contains(&key) || HostConfig::KEYS.contains(&key)
    }
}

/// Read one raw configuration blob from disk.
///
/// `.json` files are parsed as JSON, everything else as TOML.
pub fn load_raw(path: &Path) -> Result<serde_json::Value> {
    let content = fs::read_to_string(path).map_err(|source| ProvisionError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        return serde_json::from_str(&content).map_err(|source| ProvisionError::JsonFile {
            path: path.to_path_buf(),
            source,
        });
    }

    let table: toml::Value = toml::from_str(&content).map_err(|source| ProvisionError::TomlFile {
        path: path.to_path_buf(),
        source,
    })?;

    // toml::Value always serializes into a JSON-compatible tree
    serde_json::to_value(table).map_err(|source| ProvisionError::JsonFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn scratch_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("shell-local-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_config_deserialization() {
        let config: Config = serde_json::from_value(json!({
            "inline": ["cd /tmp", "ls"],
            "execute_command": ["bash", "-c", "{{.Command}}"],
            "packer_build_name": "web",
            "packer_user_variables": { "region": "eu" }
        }))
        .unwrap();

        assert_eq!(config.command, None);
        assert_eq!(config.inline, Some(vec!["cd /tmp".to_string(), "ls".to_string()]));
        assert_eq!(config.execute_command.as_ref().map(Vec::len), Some(3));
        assert_eq!(config.host.build_name.as_deref(), Some("web"));
        assert_eq!(config.host.user_variables.get("region").map(String::as_str), Some("eu"));
        assert!(!config.host.debug);
    }

    #[test]
    fn test_explicit_empty_is_not_absent() {
        let config: Config = serde_json::from_value(json!({ "execute_command": [] })).unwrap();
        assert_eq!(config.execute_command, Some(vec![]));

        let config: Config = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.execute_command, None);
    }

    #[test]
    fn test_known_keys() {
        assert!(Config::is_known_key("inline"));
        assert!(Config::is_known_key("packer_user_variables"));
        assert!(!Config::is_known_key("script"));
    }

    #[test]
    fn test_load_raw_toml() {
        let path = scratch_file(
            "base.toml",
            r#"
                inline = ["echo one", "echo two"]
                execute_command = ["/bin/bash", "-c", "{{.Command}}"]
            "#,
        );

        let raw = load_raw(&path).unwrap();
        assert_eq!(raw["inline"], json!(["echo one", "echo two"]));
        assert_eq!(raw["execute_command"][0], json!("/bin/bash"));
    }

    #[test]
    fn test_load_raw_json() {
        let path = scratch_file("base.json", r#"{ "command": "echo hi" }"#);
        let raw = load_raw(&path).unwrap();
        assert_eq!(raw, json!({ "command": "echo hi" }));
    }

    #[test]
    fn test_load_raw_reports_path() {
        let path = PathBuf::from("/nonexistent/shell-local.toml");
        let err = load_raw(&path).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/shell-local.toml"));

        let bad = scratch_file("bad.toml", "inline = [");
        assert!(matches!(load_raw(&bad), Err(ProvisionError::TomlFile { .. })));
    }
}
