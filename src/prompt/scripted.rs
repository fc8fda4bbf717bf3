use std::collections::VecDeque;
use std::fmt::Display;

use super::{check_choices, SessionParameters, UserDecision, UserPrompt};
use crate::error::{Result, SubcorrectError};

/// One `confirm` call as seen by a [`ScriptedPrompt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub context: Option<String>,
    pub original: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Information,
    Warning,
    Error,
}

/// A surface that answers from a queue of prepared decisions and records
/// every question it was asked. Runs out of answers as [`SubcorrectError::InputClosed`].
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    decisions: VecDeque<UserDecision>,
    choices: VecDeque<Option<usize>>,
    open: bool,
    sessions: usize,
    pub confirmations: Vec<Confirmation>,
    pub notices: Vec<(Level, String)>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decisions<I: IntoIterator<Item = UserDecision>>(decisions: I) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn push_decision(&mut self, decision: UserDecision) {
        self.decisions.push_back(decision);
    }

    pub fn push_choice(&mut self, choice: Option<usize>) {
        self.choices.push_back(choice);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of sessions opened so far.
    pub fn sessions(&self) -> usize {
        self.sessions
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.open {
            return Err(SubcorrectError::IllegalSessionState(
                "session was not started".to_string(),
            ));
        }
        Ok(())
    }

    fn notice(&mut self, level: Level, key: &str, args: &[&dyn Display]) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.notices.push((level, format!("{} {:?}", key, args)));
    }
}

impl UserPrompt for ScriptedPrompt {
    fn start_session(&mut self, _parameters: &SessionParameters) -> Result<()> {
        if self.open {
            return Err(SubcorrectError::IllegalSessionState(
                "session was not properly stopped".to_string(),
            ));
        }
        self.open = true;
        self.sessions += 1;
        Ok(())
    }

    fn stop_session(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.open = false;
        Ok(())
    }

    fn confirm(
        &mut self,
        context: Option<&str>,
        original: &str,
        replacement: &str,
    ) -> Result<UserDecision> {
        self.ensure_open()?;
        self.confirmations.push(Confirmation {
            context: context.map(String::from),
            original: original.to_string(),
            replacement: replacement.to_string(),
        });
        self.decisions.pop_front().ok_or(SubcorrectError::InputClosed)
    }

    fn ask_choice(
        &mut self,
        choices: &[String],
        _key: &str,
        _args: &[&dyn Display],
    ) -> Result<Option<usize>> {
        check_choices(choices)?;
        self.ensure_open()?;
        let choice = self.choices.pop_front().ok_or(SubcorrectError::InputClosed)?;
        match choice {
            Some(i) if i >= choices.len() => Err(SubcorrectError::InvalidArgument(format!(
                "scripted choice {} is out of range",
                i
            ))),
            other => Ok(other),
        }
    }

    fn information(&mut self, key: &str, args: &[&dyn Display]) -> Result<()> {
        self.notice(Level::Information, key, args);
        Ok(())
    }

    fn warning(&mut self, key: &str, args: &[&dyn Display]) -> Result<()> {
        self.notice(Level::Warning, key, args);
        Ok(())
    }

    fn error(&mut self, key: &str, args: &[&dyn Display]) -> Result<()> {
        self.notice(Level::Error, key, args);
        Ok(())
    }
}
