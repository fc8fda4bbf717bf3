//! Correction strategies: what to propose for a record's text.
//!
//! Deciding what is an error belongs to the strategy; whether a proposal is
//! applied is decided by the [`processor`](crate::processor).

use std::collections::BTreeMap;
use std::ops::Range;

use regex::{Captures, Regex};
use tracing::debug;

use crate::config::PatternRule;
use crate::error::Result;

/// A piece of record text, located by byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub start: usize,
}

impl Word {
    pub fn new(text: impl Into<String>, start: usize) -> Self {
        Self {
            text: text.into(),
            start,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.start + self.text.len()
    }
}

/// A proposed correction of one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub word: Word,
    pub context: Option<String>,
    pub replacement: String,
}

pub trait Strategy {
    fn name(&self) -> &str;

    /// Proposals for `content`, in no particular order. Spans refer to
    /// `content` as given.
    fn candidates<'a>(&'a self, content: &'a str) -> Box<dyn Iterator<Item = Candidate> + 'a>;
}

/// Proposes a fixed replacement for every known misspelt word.
pub struct DictionaryStrategy {
    entries: BTreeMap<String, String>,
    word: Regex,
}

impl DictionaryStrategy {
    pub const NAME: &'static str = "dictionary";

    pub fn new(entries: BTreeMap<String, String>) -> Result<Self> {
        let entries: BTreeMap<_, _> = entries
            .into_iter()
            .filter(|(original, replacement)| original != replacement)
            .collect();
        debug!("Dictionary strategy with {} entries", entries.len());
        Ok(Self {
            entries,
            word: Regex::new(r"[\p{L}\p{N}'’]+")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Strategy for DictionaryStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn candidates<'a>(&'a self, content: &'a str) -> Box<dyn Iterator<Item = Candidate> + 'a> {
        Box::new(self.word.find_iter(content).filter_map(move |m| {
            self.entries.get(m.as_str()).map(|replacement| Candidate {
                word: Word::new(m.as_str(), m.start()),
                context: Some(content.to_string()),
                replacement: replacement.clone(),
            })
        }))
    }
}

struct CompiledRule {
    pattern: Regex,
    replacement: String,
}

/// Proposes the expansion of a regex rule for each of its matches.
/// Replacements may refer to capture groups (`$1`, `${name}`).
pub struct PatternStrategy {
    rules: Vec<CompiledRule>,
}

impl PatternStrategy {
    pub const NAME: &'static str = "patterns";

    pub fn new(rules: &[PatternRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| -> Result<CompiledRule> {
                Ok(CompiledRule {
                    pattern: Regex::new(&rule.pattern)?,
                    replacement: rule.replacement.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Pattern strategy with {} rules", rules.len());
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Strategy for PatternStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn candidates<'a>(&'a self, content: &'a str) -> Box<dyn Iterator<Item = Candidate> + 'a> {
        Box::new(self.rules.iter().flat_map(move |rule| {
            rule.pattern
                .captures_iter(content)
                .filter_map(move |caps| expand(rule, content, &caps))
        }))
    }
}

fn expand(rule: &CompiledRule, content: &str, caps: &Captures) -> Option<Candidate> {
    let matched = caps.get(0)?;
    if matched.as_str().is_empty() {
        return None;
    }
    let mut replacement = String::new();
    caps.expand(&rule.replacement, &mut replacement);
    if replacement == matched.as_str() {
        return None;
    }
    Some(Candidate {
        word: Word::new(matched.as_str(), matched.start()),
        context: Some(content.to_string()),
        replacement,
    })
}
