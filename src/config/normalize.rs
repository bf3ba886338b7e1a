use crate::config::Config;
use crate::error::{ConfigError, ConfigErrors};
use crate::template::TemplateContext;

/// Placeholder substituted with the final command by the communicator.
pub const COMMAND_PLACEHOLDER: &str = "{{.Command}}";

/// Operating-system family the default execute template is chosen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS tag such as `std::env::consts::OS` to a platform family.
    pub fn from_os(os: &str) -> Self {
        if os.eq_ignore_ascii_case("windows") {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Default argv template used when `execute_command` is absent.
pub fn default_execute_command(platform: Platform) -> Vec<String> {
    let argv: [&str; 3] = match platform {
        Platform::Windows => ["cmd", "/C", COMMAND_PLACEHOLDER],
        Platform::Unix => ["/bin/sh", "-c", COMMAND_PLACEHOLDER],
    };
    argv.iter().map(|s| s.to_string()).collect()
}

/// Which configuration key the command was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Command,
    Inline { lines: usize },
}

/// Fully resolved configuration, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedConfig {
    pub command: String,
    pub execute_command: Vec<String>,
    pub source: CommandSource,
    pub context: TemplateContext,
    pub debug: bool,
}

/// Resolve a decoded configuration into one executable command.
///
/// All rule violations are collected; nothing is returned until every
/// rule has been checked.
pub fn normalize(config: Config, platform: Platform) -> Result<NormalizedConfig, ConfigErrors> {
    let context = config.template_context();
    let debug = config.host.debug;

    let command = config.command.filter(|c| !c.is_empty());
    // An empty inline list behaves exactly like an absent one
    let inline = config.inline.filter(|lines| !lines.is_empty());

    let mut errors = Vec::new();

    let resolved = match (command, inline) {
        (Some(_), Some(_)) => {
            errors.push(ConfigError::ConflictingSource);
            None
        }
        (Some(command), None) => Some((command, CommandSource::Command)),
        (None, Some(lines)) => {
            let joined = lines.join(";");
            if joined.is_empty() {
                // a lone empty line leaves nothing to run
                errors.push(ConfigError::MissingSource);
                None
            } else {
                Some((joined, CommandSource::Inline { lines: lines.len() }))
            }
        }
        (None, None) => {
            errors.push(ConfigError::MissingSource);
            None
        }
    };

    let execute_command = config
        .execute_command
        .unwrap_or_else(|| default_execute_command(platform));
    if execute_command.is_empty() {
        errors.push(ConfigError::EmptyExecuteTemplate);
    }

    match resolved {
        Some((command, source)) if errors.is_empty() => {
            tracing::debug!(%command, ?source, ?execute_command, "normalized configuration");
            Ok(NormalizedConfig {
                command,
                execute_command,
                source,
                context,
                debug,
            })
        }
        _ => {
            tracing::debug!(?errors, "configuration rejected");
            Err(ConfigErrors { errors })
        }
    }
}
