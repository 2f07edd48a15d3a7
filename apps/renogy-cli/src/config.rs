use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model used by `decode` when `--model` is not given.
    pub default_model: Option<String>,
    /// Directory of extra schema YAML files layered over the built-in models.
    pub schema_dir: Option<String>,
}

impl Config {
    /// Load a JSON config from an explicitly requested path.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            bail!("config file not found: {path}");
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config: {path}"))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing config: {path}"))
    }
}
