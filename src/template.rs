//! Template interpolation for YAML configs
//!
//! Handles `{{ variable }}` interpolation in configuration files so secrets
//! can stay in the environment: `password: "{{ env.REDSHIFT_PASSWORD }}"`.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .expect("template regex is valid")
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Environment variables
    pub env: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context populated from the process environment
    pub fn from_env() -> Self {
        Self {
            env: std::env::vars().collect(),
        }
    }

    /// Set a single environment entry
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Look up a variable path (e.g., "env.HOME")
    pub fn get(&self, path: &str) -> Option<String> {
        path.strip_prefix("env.")
            .and_then(|name| self.env.get(name))
            .cloned()
    }
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing = Vec::new();

    let result = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let var_path = &cap[1];
        ctx.get(var_path).unwrap_or_else(|| {
            missing.push(var_path.to_string());
            String::new()
        })
    });

    if missing.is_empty() {
        Ok(result.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_substitution() {
        let mut ctx = TemplateContext::new();
        ctx.set_env("REDSHIFT_PASSWORD", "hunter2");

        let result = render("password: {{ env.REDSHIFT_PASSWORD }}", &ctx).unwrap();
        assert_eq!(result, "password: hunter2");
    }

    #[test]
    fn test_undefined_variable() {
        let ctx = TemplateContext::new();
        let result = render("{{ env.DOES_NOT_EXIST }} {{ nope }}", &ctx);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("env.DOES_NOT_EXIST"));
        assert!(message.contains("nope"));
    }

    #[test]
    fn test_whitespace_in_template() {
        let mut ctx = TemplateContext::new();
        ctx.set_env("KEY", "value");

        assert_eq!(render("{{env.KEY}}", &ctx).unwrap(), "value");
        assert_eq!(render("{{ env.KEY }}", &ctx).unwrap(), "value");
        assert_eq!(render("{{  env.KEY  }}", &ctx).unwrap(), "value");
    }

    #[test]
    fn test_replacement_is_not_rescanned() {
        let mut ctx = TemplateContext::new();
        ctx.set_env("A", "{{ env.B }}");
        assert_eq!(render("{{ env.A }}", &ctx).unwrap(), "{{ env.B }}");
    }
}
