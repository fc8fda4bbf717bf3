//! The user-facing side of a correction run.
//!
//! A [`UserPrompt`] surface asks the user to confirm replacements and to
//! pick among options. Every question requires an open session: the
//! surface acquires its input channel in [`UserPrompt::start_session`] and
//! releases it in [`UserPrompt::stop_session`]. Using a surface outside a
//! session, or opening/closing it twice, is an
//! [`IllegalSessionState`](crate::error::SubcorrectError::IllegalSessionState).

pub mod console;
pub mod scripted;

use std::fmt::Display;
use std::path::PathBuf;

use crate::error::{Result, SubcorrectError};

pub use console::ConsolePrompt;
pub use scripted::ScriptedPrompt;

/// What the user decided for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDecision {
    /// Text to put in place of the original word. Empty when cancelled.
    pub replacement: String,
    /// Leave the original word unchanged.
    pub cancelled: bool,
    /// Apply the same decision to later occurrences of the word.
    pub remember: bool,
}

impl UserDecision {
    pub fn accept(replacement: impl Into<String>, remember: bool) -> Self {
        Self {
            replacement: replacement.into(),
            cancelled: false,
            remember,
        }
    }

    pub fn cancel(remember: bool) -> Self {
        Self {
            replacement: String::new(),
            cancelled: true,
            remember,
        }
    }
}

/// Describes the run a session is opened for.
#[derive(Debug, Clone, Default)]
pub struct SessionParameters {
    /// Strategy requested up front, if any
    pub strategy: Option<String>,
    pub files: Vec<PathBuf>,
}

pub trait UserPrompt {
    fn start_session(&mut self, parameters: &SessionParameters) -> Result<()>;

    fn stop_session(&mut self) -> Result<()>;

    /// Asks whether `original` should become `replacement`, showing
    /// `context` when there is one.
    fn confirm(
        &mut self,
        context: Option<&str>,
        original: &str,
        replacement: &str,
    ) -> Result<UserDecision>;

    fn confirm_without_context(&mut self, original: &str, replacement: &str) -> Result<UserDecision> {
        self.confirm(None, original, replacement)
    }

    /// Offers `choices` under the question `key`. Returns the zero-based
    /// position of the chosen entry, or `None` when the user cancels.
    fn ask_choice(
        &mut self,
        choices: &[String],
        key: &str,
        args: &[&dyn Display],
    ) -> Result<Option<usize>>;

    fn information(&mut self, key: &str, args: &[&dyn Display]) -> Result<()>;

    fn warning(&mut self, key: &str, args: &[&dyn Display]) -> Result<()>;

    fn error(&mut self, key: &str, args: &[&dyn Display]) -> Result<()>;
}

/// Offers `choices` by their display form and returns the chosen one.
pub fn choose<'a, T, P>(
    prompt: &mut P,
    choices: &'a [T],
    key: &str,
    args: &[&dyn Display],
) -> Result<Option<&'a T>>
where
    T: Display,
    P: UserPrompt + ?Sized,
{
    let labels: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
    Ok(prompt
        .ask_choice(&labels, key, args)?
        .and_then(|i| choices.get(i)))
}

pub(crate) fn check_choices(choices: &[String]) -> Result<()> {
    if choices.is_empty() {
        return Err(SubcorrectError::InvalidArgument(
            "cannot propose choices with an empty list".to_string(),
        ));
    }
    Ok(())
}
