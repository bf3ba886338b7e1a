use crate::error::TemplateError;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// `{{ expr }}` placeholders. Expressions never span a closing brace pair.
static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("placeholder regex is valid"));

/// Values available to `{{ }}` expressions while rendering configuration.
///
/// `data` holds per-render bindings such as `.Command`; the remaining
/// fields come from the host driver and stay fixed for a provisioning step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    pub data: BTreeMap<String, String>,
    pub user_variables: BTreeMap<String, String>,
    pub build_name: Option<String>,
    pub builder_type: Option<String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this context with one extra data binding.
    pub fn with_data(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut ctx = self.clone();
        ctx.data.insert(key.into(), value.into());
        ctx
    }

    /// Render every placeholder in `input`. Text outside placeholders is
    /// copied verbatim; substituted values are not escaped.
    pub fn render(&self, input: &str) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(input.len());
        let mut last = 0;

        for caps in PLACEHOLDER_REGEX.captures_iter(input) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let expr = caps.get(1).map_or("", |m| m.as_str());

            output.push_str(&input[last..whole.start]);
            output.push_str(&self.evaluate(expr)?);
            last = whole.end;
        }

        output.push_str(&input[last..]);
        Ok(output)
    }

    fn evaluate(&self, expr: &str) -> Result<String, TemplateError> {
        if let Some(key) = expr.strip_prefix('.') {
            let key = key.trim();
            return self
                .data
                .get(key)
                .cloned()
                .ok_or_else(|| TemplateError::MissingData(key.to_string()));
        }

        let (func, arg) = match expr.split_once(char::is_whitespace) {
            Some((func, arg)) => (func, Some(unquote(arg.trim(), expr)?)),
            None => (expr, None),
        };

        match (func, arg) {
            ("user", Some(name)) => self
                .user_variables
                .get(name)
                .cloned()
                .ok_or_else(|| TemplateError::UndefinedUserVariable(name.to_string())),
            ("env", Some(name)) => Ok(std::env::var(name).unwrap_or_default()),
            ("build_name", None) => Ok(self.build_name.clone().unwrap_or_default()),
            ("build_type", None) => Ok(self.builder_type.clone().unwrap_or_default()),
            ("timestamp", None) => Ok(Utc::now().timestamp().to_string()),
            ("isotime", None) => Ok(Utc::now().to_rfc3339()),
            ("user", None) | ("env", None) => Err(TemplateError::Malformed(expr.to_string())),
            (func, _) => Err(TemplateError::UnknownFunction(func.to_string())),
        }
    }
}

fn unquote<'a>(arg: &'a str, expr: &str) -> Result<&'a str, TemplateError> {
    ['`', '"']
        .iter()
        .find_map(|q| arg.strip_prefix(*q).and_then(|a| a.strip_suffix(*q)))
        .ok_or_else(|| TemplateError::Malformed(expr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        let mut ctx = TemplateContext::new();
        ctx.user_variables.insert("region".to_string(), "eu-west-1".to_string());
        ctx.build_name = Some("web".to_string());
        ctx
    }

    #[test]
    fn test_render_plain_text_is_untouched() {
        assert_eq!(ctx().render("echo 'a; b' && ls").unwrap(), "echo 'a; b' && ls");
    }

    #[test]
    fn test_render_data_binding() {
        let ctx = ctx().with_data("Command", "echo \"hi\"");
        assert_eq!(ctx.render("{{.Command}}").unwrap(), "echo \"hi\"");
        assert_eq!(ctx.render("run: {{ .Command }}!").unwrap(), "run: echo \"hi\"!");
    }

    #[test]
    fn test_render_missing_data() {
        assert_eq!(
            ctx().render("{{.Command}}"),
            Err(TemplateError::MissingData("Command".to_string()))
        );
    }

    #[test]
    fn test_render_user_variables() {
        assert_eq!(ctx().render("deploy {{user `region`}}").unwrap(), "deploy eu-west-1");
        assert_eq!(ctx().render("{{ user \"region\" }}").unwrap(), "eu-west-1");
        assert_eq!(
            ctx().render("{{user `zone`}}"),
            Err(TemplateError::UndefinedUserVariable("zone".to_string()))
        );
    }

    #[test]
    fn test_render_build_values() {
        assert_eq!(ctx().render("{{build_name}}-{{build_type}}").unwrap(), "web-");
    }

    #[test]
    fn test_render_timestamp_is_numeric() {
        let rendered = ctx().render("{{timestamp}}").unwrap();
        assert!(rendered.parse::<i64>().is_ok());
    }

    #[test]
    fn test_render_unknown_function() {
        assert_eq!(
            ctx().render("{{upper `x`}}"),
            Err(TemplateError::UnknownFunction("upper".to_string()))
        );
        assert!(matches!(ctx().render("{{user region}}"), Err(TemplateError::Malformed(_))));
    }
}
