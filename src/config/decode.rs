use crate::config::Config;
use crate::error::DecodeError;
use serde_json::{Map, Value};

/// Merge raw configuration blobs and decode them into a [`Config`].
///
/// Later blobs override keys from earlier ones; `packer_user_variables`
/// maps are merged per variable instead of replaced. `command` and every
/// `inline` line are interpolated with the host template context;
/// `execute_command` is left raw because it is rendered per invocation
/// once the final command is known.
pub fn decode(raws: &[Value]) -> Result<Config, DecodeError> {
    let merged = merge(raws)?;

    let mut unknown: Vec<String> = merged
        .keys()
        .filter(|key| !Config::is_known_key(key))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        unknown.sort();
        return Err(DecodeError::UnknownKeys(unknown));
    }

    let mut config: Config = serde_json::from_value(Value::Object(merged))?;
    interpolate(&mut config)?;

    tracing::debug!(
        blobs = raws.len(),
        has_command = config.command.is_some(),
        inline_lines = config.inline.as_ref().map_or(0, Vec::len),
        "decoded shell-local configuration"
    );

    Ok(config)
}

const USER_VARIABLES_KEY: &str = "packer_user_variables";

fn merge(raws: &[Value]) -> Result<Map<String, Value>, DecodeError> {
    let mut merged = Map::new();

    for (index, raw) in raws.iter().enumerate() {
        let map = raw.as_object().ok_or(DecodeError::NotAMap { index })?;
        for (key, value) in map {
            // null means "not set" and must not mask an earlier value
            if value.is_null() {
                continue;
            }
            if key == USER_VARIABLES_KEY {
                if let (Some(Value::Object(existing)), Value::Object(vars)) =
                    (merged.get_mut(key), value)
                {
                    existing.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
                    continue;
                }
            }
            merged.insert(key.clone(), value.clone());
        }
    }

    Ok(merged)
}

fn interpolate(config: &mut Config) -> Result<(), DecodeError> {
    let ctx = config.template_context();

    if let Some(command) = config.command.as_mut() {
        *command = ctx.render(command).map_err(|source| DecodeError::Interpolate {
            field: "command".to_string(),
            source,
        })?;
    }

    if let Some(lines) = config.inline.as_mut() {
        for (i, line) in lines.iter_mut().enumerate() {
            *line = ctx.render(line).map_err(|source| DecodeError::Interpolate {
                field: format!("inline[{}]", i),
                source,
            })?;
        }
    }

    Ok(())
}
