use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error returned by the provisioner and the host driver.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Config(#[from] ConfigErrors),

    #[error("{0}")]
    Execution(#[from] ExecutionError),

    #[error("provisioner is {state}, expected {expected}")]
    InvalidState {
        state: &'static str,
        expected: &'static str,
    },

    #[error("failed to read config file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in '{path}': {source}")]
    TomlFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("JSON parse error in '{path}': {source}")]
    JsonFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failures while merging and interpolating raw configuration blobs.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("configuration #{index} is not a map")]
    NotAMap { index: usize },

    #[error("unknown configuration key(s): {}", .0.join(", "))]
    UnknownKeys(Vec<String>),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("error processing {field}: {source}")]
    Interpolate {
        field: String,
        #[source]
        source: TemplateError,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("no value for '.{0}' in template data")]
    MissingData(String),

    #[error("user variable '{0}' is not defined")]
    UndefinedUserVariable(String),

    #[error("unknown template function '{0}'")]
    UnknownFunction(String),

    #[error("malformed template expression '{0}'")]
    Malformed(String),
}

/// A single structural rule violation found while normalizing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("only command or inline should be specified")]
    ConflictingSource,

    #[error("command or inline must be specified")]
    MissingSource,

    #[error("execute_command must not be empty")]
    EmptyExecuteTemplate,
}

/// Every rule violation from one normalization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigErrors {
    pub errors: Vec<ConfigError>,
}

impl ConfigErrors {
    pub fn kinds(&self) -> &[ConfigError] {
        &self.errors
    }

    pub fn contains(&self, kind: ConfigError) -> bool {
        self.errors.contains(&kind)
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} error(s) occurred:", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n* {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

/// Failures of the communicator itself, before any exit status exists.
#[derive(Error, Debug)]
pub enum CommunicatorError {
    #[error("failed to render execute_command: {0}")]
    Template(#[from] TemplateError),

    #[error("execute_command rendered to an empty program")]
    EmptyProgram,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running command: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Error executing command: {command}\n\nPlease see output above for more information.")]
    StartFailure {
        command: String,
        #[source]
        source: Option<CommunicatorError>,
    },

    #[error("Erroneous exit code {exit_status} while executing command: {command}\n\nPlease see output above for more information.")]
    NonZeroExit { command: String, exit_status: i32 },
}

impl ExecutionError {
    pub fn command(&self) -> &str {
        match self {
            ExecutionError::StartFailure { command, .. } => command,
            ExecutionError::NonZeroExit { command, .. } => command,
        }
    }

    pub fn exit_status(&self) -> Option<i32> {
        match self {
            ExecutionError::StartFailure { .. } => None,
            ExecutionError::NonZeroExit { exit_status, .. } => Some(*exit_status),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_display_lists_every_reason() {
        let errs = ConfigErrors {
            errors: vec![ConfigError::ConflictingSource, ConfigError::EmptyExecuteTemplate],
        };

        assert_eq!(
            errs.to_string(),
            "2 error(s) occurred:\n\n\
             * only command or inline should be specified\n\
             * execute_command must not be empty"
        );
    }

    #[test]
    fn test_execution_error_messages() {
        let err = ExecutionError::NonZeroExit {
            command: "false".to_string(),
            exit_status: 2,
        };
        assert!(err.to_string().starts_with("Erroneous exit code 2 while executing command: false"));
        assert!(err.to_string().contains("Please see output above"));
        assert_eq!(err.exit_status(), Some(2));

        let err = ExecutionError::StartFailure {
            command: "echo hi".to_string(),
            source: None,
        };
        assert!(err.to_string().starts_with("Error executing command: echo hi"));
        assert_eq!(err.command(), "echo hi");
        assert_eq!(err.exit_status(), None);
    }
}
