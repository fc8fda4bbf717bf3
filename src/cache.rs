use std::collections::HashMap;

use crate::prompt::UserDecision;

/// A remembered answer for one original word.
///
/// Keeping the word as it is gets its own variant instead of mapping the
/// word onto itself, so the cache can tell "leave it alone" apart from a
/// replacement that happens to equal the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedDecision {
    Replace(String),
    Keep,
}

impl CachedDecision {
    /// The text to splice in, or `None` when the original stays.
    pub fn replacement(&self) -> Option<&str> {
        match self {
            CachedDecision::Replace(text) => Some(text),
            CachedDecision::Keep => None,
        }
    }
}

impl From<&UserDecision> for CachedDecision {
    fn from(decision: &UserDecision) -> Self {
        if decision.cancelled {
            CachedDecision::Keep
        } else {
            CachedDecision::Replace(decision.replacement.clone())
        }
    }
}

/// Decisions remembered during one correction run, keyed by the exact
/// original text. Starts empty and is dropped with the run.
#[derive(Debug, Default, Clone)]
pub struct SessionCache {
    entries: HashMap<String, CachedDecision>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, original: &str) -> Option<&CachedDecision> {
        self.entries.get(original)
    }

    /// Stores `decision` for `original`, replacing any earlier entry.
    pub fn remember(&mut self, original: impl Into<String>, decision: CachedDecision) {
        self.entries.insert(original.into(), decision);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_is_distinct_from_self_mapping() {
        let mut cache = SessionCache::new();
        cache.remember("ther", CachedDecision::from(&UserDecision::cancel(true)));
        cache.remember("teh", CachedDecision::Replace("teh".to_string()));

        assert_eq!(cache.get("ther"), Some(&CachedDecision::Keep));
        assert_eq!(cache.get("ther").unwrap().replacement(), None);
        assert_eq!(cache.get("teh").unwrap().replacement(), Some("teh"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn lookup_is_exact() {
        let mut cache = SessionCache::new();
        cache.remember("Ther", CachedDecision::Replace("There".to_string()));
        assert!(cache.get("ther").is_none());
        assert!(cache.get("Ther ").is_none());

        cache.clear();
        assert!(cache.is_empty());
    }
}
