use crate::cache::{CachedDecision, SessionCache};
use crate::error::{Result, SubcorrectError};
use crate::prompt::{SessionParameters, UserPrompt};
use crate::srt::{Subtitle, SubtitleFile};
use crate::strategy::{Candidate, Strategy};

use std::ops::Range;

use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub candidates: usize,
    pub prompted: usize,
    pub from_cache: usize,
    pub replaced: usize,
    pub kept: usize,
}

/// One correction run over one or more files.
///
/// Holds the prompt session open for its whole lifetime and owns the
/// remember-cache. [`finish`](Self::finish) closes the session; a session
/// dropped without finishing closes it as well.
pub struct CorrectionSession<'p, P: UserPrompt + ?Sized> {
    prompt: &'p mut P,
    cache: SessionCache,
    stats: Statistics,
    open: bool,
}

impl<'p, P: UserPrompt + ?Sized> CorrectionSession<'p, P> {
    pub fn start(prompt: &'p mut P, parameters: &SessionParameters) -> Result<Self> {
        prompt.start_session(parameters)?;
        Ok(Self {
            prompt,
            cache: SessionCache::new(),
            stats: Statistics::default(),
            open: true,
        })
    }

    pub fn prompt(&mut self) -> &mut P {
        &mut *self.prompt
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    /// Decides one candidate: from the cache when the word was remembered,
    /// otherwise by asking. Returns the text to splice in, or `None` to
    /// keep the original.
    pub fn resolve(&mut self, candidate: &Candidate) -> Result<Option<String>> {
        self.stats.candidates += 1;
        let original = &candidate.word.text;

        let resolved = match self.cache.get(original) {
            Some(cached) => {
                debug!("Using remembered decision for '{}'", original);
                self.stats.from_cache += 1;
                cached.replacement().map(String::from)
            }
            None => {
                self.stats.prompted += 1;
                let decision = self.prompt.confirm(
                    candidate.context.as_deref(),
                    original,
                    &candidate.replacement,
                )?;
                if decision.remember {
                    self.cache
                        .remember(original.clone(), CachedDecision::from(&decision));
                }
                if decision.cancelled {
                    None
                } else {
                    Some(decision.replacement)
                }
            }
        };

        match resolved {
            Some(_) => self.stats.replaced += 1,
            None => self.stats.kept += 1,
        }
        Ok(resolved)
    }

    /// Runs `strategy` over the subtitle's text and applies the accepted
    /// corrections. Returns the number of replacements made.
    pub fn correct_subtitle<S: Strategy + ?Sized>(
        &mut self,
        subtitle: &mut Subtitle,
        strategy: &S,
    ) -> Result<usize> {
        let content = match subtitle.content.as_deref() {
            Some(content) => content,
            None => return Ok(0),
        };

        let mut candidates: Vec<Candidate> = strategy.candidates(content).collect();
        candidates.sort_by_key(|c| c.word.start);

        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        let mut edited_up_to = 0;
        for candidate in &candidates {
            let span = candidate.word.span();
            if content.get(span.clone()) != Some(candidate.word.text.as_str()) {
                return Err(SubcorrectError::InvalidArgument(format!(
                    "'{}' is not found at {:?} in '{}'",
                    candidate.word.text, span, content
                )));
            }
            if span.start < edited_up_to {
                warn!(
                    "Skipping '{}' at {}, it overlaps an earlier correction",
                    candidate.word.text, span.start
                );
                continue;
            }
            if let Some(text) = self.resolve(candidate)? {
                edited_up_to = span.end;
                edits.push((span, text));
            }
        }

        if edits.is_empty() {
            return Ok(0);
        }
        let mut corrected = content.to_string();
        for (span, text) in edits.iter().rev() {
            corrected.replace_range(span.clone(), text);
        }
        subtitle.content = Some(corrected);
        Ok(edits.len())
    }

    pub fn correct_file<S: Strategy + ?Sized>(
        &mut self,
        file: &mut SubtitleFile,
        strategy: &S,
    ) -> Result<usize> {
        let mut replaced = 0;
        for subtitle in file.iter_mut() {
            replaced += self.correct_subtitle(subtitle, strategy)?;
        }
        Ok(replaced)
    }

    /// Closes the prompt session and returns the run's statistics.
    pub fn finish(mut self) -> Result<Statistics> {
        self.open = false;
        self.prompt.stop_session()?;
        debug!(
            "Session finished, {} decision(s) remembered",
            self.cache.len()
        );
        Ok(self.stats)
    }
}

impl<'p, P: UserPrompt + ?Sized> Drop for CorrectionSession<'p, P> {
    fn drop(&mut self) {
        if self.open {
            warn!("Correction session dropped before it was finished");
            if let Err(err) = self.prompt.stop_session() {
                warn!("Could not stop the prompt session: {}", err);
            }
        }
    }
}
