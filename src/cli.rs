use crate::error::{ProvisionError, Result};
use clap::Parser;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shell-local")]
#[command(version)]
#[command(about = "Run a provisioning command on the local machine", long_about = None)]
pub struct Cli {
    /// Configuration files (JSON or TOML), merged in order
    pub configs: Vec<PathBuf>,

    /// Command to execute
    #[arg(short = 'c', long)]
    pub command: Option<String>,

    /// Inline script line (repeatable), joined with ';'
    #[arg(short = 'i', long = "inline")]
    pub inline: Vec<String>,

    /// Execute template element (repeatable); {{.Command}} is the command
    #[arg(short = 'e', long = "execute-command", allow_hyphen_values = true)]
    pub execute_command: Vec<String>,

    /// User variable available as {{user `KEY`}}
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Build name available as {{build_name}}
    #[arg(long)]
    pub build_name: Option<String>,

    /// Debug logging and execute template echo
    #[arg(short = 'd', long)]
    pub debug: bool,
}

impl Cli {
    /// Command-line options as one override blob, applied after the config files.
    pub fn override_blob(&self) -> Result<Value> {
        let mut blob = Map::new();

        if let Some(command) = &self.command {
            blob.insert("command".to_string(), json!(command));
        }
        if !self.inline.is_empty() {
            blob.insert("inline".to_string(), json!(self.inline));
        }
        if !self.execute_command.is_empty() {
            blob.insert("execute_command".to_string(), json!(self.execute_command));
        }
        if !self.vars.is_empty() {
            blob.insert("packer_user_variables".to_string(), json!(self.user_variables()?));
        }
        if let Some(name) = &self.build_name {
            blob.insert("packer_build_name".to_string(), json!(name));
        }
        if self.debug {
            blob.insert("packer_debug".to_string(), json!(true));
        }

        Ok(Value::Object(blob))
    }

    fn user_variables(&self) -> Result<BTreeMap<String, String>> {
        self.vars
            .iter()
            .map(|var| {
                var.split_once('=')
                    .filter(|(key, _)| !key.is_empty())
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .ok_or_else(|| {
                        ProvisionError::InvalidArgument(format!("--var expects KEY=VALUE, got '{}'", var))
                    })
            })
            .collect()
    }
}
