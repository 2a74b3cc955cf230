//! Jinja environment setup for lea
//!
//! The templating surface is deliberately narrow: `{{ env.VAR }}`,
//! `{% if %}`, `{% for %}`, and `{% set x = load_yaml("file.yaml") %}`.

use crate::error::{JinjaError, JinjaResult};
use minijinja::value::Value;
use minijinja::{context, Environment, ErrorKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// The result of rendering one template.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// The rendered SQL text.
    pub text: String,
    /// Every file `load_yaml` read during the render. The caller folds
    /// their mtimes into the script's effective modification time.
    pub loaded_paths: Vec<PathBuf>,
}

/// Jinja templating environment for lea scripts.
pub struct JinjaEnvironment<'a> {
    env: Environment<'a>,
    env_vars: HashMap<String, String>,
    loaded_paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl JinjaEnvironment<'_> {
    /// Create an environment rooted at the scripts directory, exposing the
    /// process environment as `env`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_env(base_dir, std::env::vars().collect())
    }

    /// Create an environment with an explicit `env` map (used by tests).
    pub fn with_env(base_dir: impl Into<PathBuf>, env_vars: HashMap<String, String>) -> Self {
        let base_dir = base_dir.into();
        let mut env = Environment::new();
        let loaded_paths: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));

        let capture = Arc::clone(&loaded_paths);
        env.add_function(
            "load_yaml",
            move |relative_path: &str| -> Result<Value, minijinja::Error> {
                let full_path = base_dir.join(relative_path);
                let text = std::fs::read_to_string(&full_path).map_err(|e| {
                    minijinja::Error::new(
                        ErrorKind::InvalidOperation,
                        format!("cannot read {}: {}", full_path.display(), e),
                    )
                })?;
                let yaml: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| {
                    minijinja::Error::new(
                        ErrorKind::InvalidOperation,
                        format!("cannot parse {}: {}", full_path.display(), e),
                    )
                })?;
                capture
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(full_path);
                Ok(Value::from_serialize(&yaml))
            },
        );

        Self {
            env,
            env_vars,
            loaded_paths,
        }
    }

    /// Render a template string.
    pub fn render(&self, template: &str) -> JinjaResult<RenderOutput> {
        self.loaded_paths
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();

        let text = self
            .env
            .render_str(template, context! { env => &self.env_vars })
            .map_err(JinjaError::from)?;

        let loaded_paths = self
            .loaded_paths
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        Ok(RenderOutput { text, loaded_paths })
    }
}

#[cfg(test)]
#[path = "environment_test.rs"]
mod tests;
