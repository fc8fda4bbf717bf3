use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SubcorrectError};

fn default_encoding() -> String {
    "utf-8".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Encoding label used to read and write subtitle files
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Replace the source file instead of writing a `.corrected.srt` next to it
    #[serde(default)]
    pub overwrite: bool,
    /// TOML catalogue overriding the built-in user-facing texts
    #[serde(default)]
    pub messages: Option<PathBuf>,
    /// Misspelt word -> replacement
    #[serde(default)]
    pub dictionary: BTreeMap<String, String>,
    /// Regex rules, tried in order
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
    /// Expansion template, may use `$1` or `${name}`
    pub replacement: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            encoding: default_encoding(),
            overwrite: false,
            messages: None,
            dictionary: BTreeMap::new(),
            patterns: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubcorrectError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubcorrectError::Config(format!("Failed to parse config file: {}", e)))
    }
}
