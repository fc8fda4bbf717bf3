//! User-facing texts, resolved by key.
//!
//! A [`Messages`] catalogue is handed to every component that talks to the
//! user. Templates use positional placeholders: `{0}`, `{1}`, ...

use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{Result, SubcorrectError};

pub mod keys {
    pub const REPLACE: &str = "prompt.replace";
    pub const CONTEXT: &str = "prompt.context";
    pub const CHANGE_REPLACEMENT: &str = "prompt.change_replacement";
    pub const REMEMBER_CHOICE: &str = "prompt.remember_choice";
    pub const INVALID_CHOICE: &str = "prompt.invalid_choice";
    pub const YES: &str = "console.yes";
    pub const YES_NO: &str = "console.yes_no";
    pub const PROMPT_MARK: &str = "console.prompt_mark";
    pub const WARNING: &str = "console.warning";
    pub const ERROR: &str = "console.error";
    pub const CHOOSE_STRATEGY: &str = "app.choose_strategy";
    pub const NO_STRATEGY: &str = "app.no_strategy";
    pub const READ_FAILED: &str = "app.read_failed";
    pub const WRITE_FAILED: &str = "app.write_failed";
    pub const INVALID_SUBTITLES: &str = "app.invalid_subtitles";
    pub const UNENCODABLE: &str = "app.unencodable";
    pub const FILE_DONE: &str = "app.file_done";
    pub const SUMMARY: &str = "app.summary";
}

const DEFAULTS: &[(&str, &str)] = &[
    (keys::REPLACE, "Replace '{0}' by '{1}'?"),
    (keys::CONTEXT, "Context:"),
    (
        keys::CHANGE_REPLACEMENT,
        "Replacement (leave empty to keep '{0}'): ",
    ),
    (
        keys::REMEMBER_CHOICE,
        "Remember this choice for the rest of the session?",
    ),
    (
        keys::INVALID_CHOICE,
        "'{0}' is not a valid choice, enter a number between 0 and {1}",
    ),
    (keys::YES, "yes"),
    (keys::YES_NO, "[yes/no] "),
    (keys::PROMPT_MARK, "(0 to cancel) > "),
    (keys::WARNING, "WARNING: {0}"),
    (keys::ERROR, "ERROR: {0}"),
    (keys::CHOOSE_STRATEGY, "Which correction strategy should be used?"),
    (keys::NO_STRATEGY, "No correction strategy selected, nothing to do."),
    (keys::READ_FAILED, "Could not read '{0}': {1}"),
    (keys::WRITE_FAILED, "Could not write '{0}': {1}"),
    (
        keys::INVALID_SUBTITLES,
        "{0} subtitle(s) in '{1}' end before they begin",
    ),
    (
        keys::UNENCODABLE,
        "{0} subtitle(s) hold characters {1} cannot represent, '{2}' will contain character references for them",
    ),
    (
        keys::FILE_DONE,
        "'{0}': {1} correction(s) applied, written to '{2}'",
    ),
    (
        keys::SUMMARY,
        "{0} candidate(s): {1} replaced, {2} kept, {3} answered from memory",
    ),
];

#[derive(Debug, Clone)]
pub struct Messages {
    templates: HashMap<String, String>,
    placeholder: Regex,
}

impl Messages {
    /// The built-in English catalogue.
    pub fn builtin() -> Self {
        let templates = DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::with_templates(templates)
    }

    /// The built-in catalogue with the entries of a TOML file laid over it.
    /// Nested tables are flattened into dotted keys.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SubcorrectError::io(format!("Failed to read messages '{}'", path.display()), e)
        })?;
        let table: toml::Table = toml::from_str(&content).map_err(|e| {
            SubcorrectError::Config(format!("Failed to parse messages '{}': {}", path.display(), e))
        })?;

        let mut messages = Self::builtin();
        flatten("", &table, &mut messages.templates)?;
        debug!("Loaded messages from '{}'", path.display());
        Ok(messages)
    }

    fn with_templates(templates: HashMap<String, String>) -> Self {
        Self {
            templates,
            // Constant pattern.
            placeholder: Regex::new(r"\{(\d+)\}").unwrap(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    /// Resolves `key` and fills its placeholders. Unknown keys resolve to
    /// the key itself; placeholders without an argument are left as is.
    pub fn get(&self, key: &str, args: &[&dyn Display]) -> String {
        let template = match self.templates.get(key) {
            Some(template) => template,
            None => return key.to_string(),
        };
        self.placeholder
            .replace_all(template, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| args.get(i))
                    .map(|arg| arg.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::builtin()
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) -> Result<()> {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(t) => flatten(&key, t, out)?,
            other => {
                return Err(SubcorrectError::Config(format!(
                    "message '{}' must be a string, found {}",
                    key,
                    other.type_str()
                )))
            }
        }
    }
    Ok(())
}
