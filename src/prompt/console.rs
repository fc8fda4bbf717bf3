use std::fmt::Display;
use std::io::{BufRead, BufReader, Read, Write};

use tracing::debug;

use super::{check_choices, SessionParameters, UserDecision, UserPrompt};
use crate::error::{Result, SubcorrectError};
use crate::messages::{keys, Messages};

/// Text console surface: questions go to `W`, answers are read line by
/// line from `R`.
///
/// The line buffer over `R` only exists while a session is open. Anything
/// it buffered but did not hand out is dropped when the session stops.
pub struct ConsolePrompt<R, W> {
    input: Option<R>,
    session: Option<BufReader<R>>,
    output: W,
    messages: Messages,
}

impl<R: Read, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W, messages: Messages) -> Self {
        Self {
            input: Some(input),
            session: None,
            output,
            messages,
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    fn text(&self, key: &str, args: &[&dyn Display]) -> String {
        self.messages.get(key, args)
    }

    fn println(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text).map_err(|e| SubcorrectError::io("Failed to write to console", e))
    }

    fn print(&mut self, text: &str) -> Result<()> {
        write!(self.output, "{}", text)
            .and_then(|_| self.output.flush())
            .map_err(|e| SubcorrectError::io("Failed to write to console", e))
    }

    fn ensure_session(&self, operation: &str) -> Result<()> {
        if self.session.is_none() {
            return Err(SubcorrectError::IllegalSessionState(format!(
                "session was not started, cannot {}",
                operation
            )));
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let reader = self.session.as_mut().ok_or_else(|| {
            SubcorrectError::IllegalSessionState("session was not started, cannot read".to_string())
        })?;
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .map_err(|e| SubcorrectError::io("Failed to read from console", e))?;
        if read == 0 {
            return Err(SubcorrectError::InputClosed);
        }
        Ok(line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string())
    }

    fn read_yes(&mut self) -> Result<bool> {
        let question = self.text(keys::YES_NO, &[]);
        self.print(&question)?;
        let yes = self.text(keys::YES, &[]);
        Ok(self.read_line()?.trim_start().starts_with(&yes))
    }
}

impl<R: Read, W: Write> UserPrompt for ConsolePrompt<R, W> {
    fn start_session(&mut self, parameters: &SessionParameters) -> Result<()> {
        if self.session.is_some() {
            return Err(SubcorrectError::IllegalSessionState(
                "session was not properly stopped".to_string(),
            ));
        }
        let input = self.input.take().ok_or_else(|| {
            SubcorrectError::IllegalSessionState("console input is not available".to_string())
        })?;
        self.session = Some(BufReader::new(input));
        debug!(
            "Console session started for {} file(s) with strategy '{}'",
            parameters.files.len(),
            parameters.strategy.as_deref().unwrap_or("<to be chosen>")
        );
        Ok(())
    }

    fn stop_session(&mut self) -> Result<()> {
        let reader = self.session.take().ok_or_else(|| {
            SubcorrectError::IllegalSessionState("session was not started".to_string())
        })?;
        self.input = Some(reader.into_inner());
        debug!("Console session stopped");
        Ok(())
    }

    fn confirm(
        &mut self,
        context: Option<&str>,
        original: &str,
        replacement: &str,
    ) -> Result<UserDecision> {
        self.ensure_session("confirm replacement")?;

        let question = self.text(keys::REPLACE, &[&original, &replacement]);
        self.println(&question)?;
        if let Some(context) = context {
            let label = self.text(keys::CONTEXT, &[]);
            self.println(&label)?;
            self.println(context)?;
        }

        let mut cancelled = false;
        let answer = if self.read_yes()? {
            replacement.to_string()
        } else {
            let question = self.text(keys::CHANGE_REPLACEMENT, &[&original]);
            self.print(&question)?;
            let answer = self.read_line()?;
            cancelled = answer.is_empty();
            answer
        };

        let question = self.text(keys::REMEMBER_CHOICE, &[]);
        self.println(&question)?;
        let remember = self.read_yes()?;

        Ok(UserDecision {
            replacement: answer,
            cancelled,
            remember,
        })
    }

    fn ask_choice(
        &mut self,
        choices: &[String],
        key: &str,
        args: &[&dyn Display],
    ) -> Result<Option<usize>> {
        check_choices(choices)?;
        self.ensure_session("ask for a choice")?;

        let mut question = self.text(key, args);
        for (i, choice) in choices.iter().enumerate() {
            question.push_str(&format!("\n\t{}\t{}", i + 1, choice));
        }
        question.push_str("\n\t");
        question.push_str(&self.text(keys::PROMPT_MARK, &[]));

        loop {
            self.print(&question)?;
            let answer = self.read_line()?;
            match answer.trim().parse::<usize>() {
                Ok(0) => return Ok(None),
                Ok(n) if n <= choices.len() => return Ok(Some(n - 1)),
                _ => {
                    let invalid = self.text(keys::INVALID_CHOICE, &[&answer, &choices.len()]);
                    self.println(&invalid)?;
                }
            }
        }
    }

    fn information(&mut self, key: &str, args: &[&dyn Display]) -> Result<()> {
        let text = self.text(key, args);
        self.println(&text)
    }

    fn warning(&mut self, key: &str, args: &[&dyn Display]) -> Result<()> {
        let text = self.text(key, args);
        let text = self.text(keys::WARNING, &[&text]);
        self.println(&text)
    }

    fn error(&mut self, key: &str, args: &[&dyn Display]) -> Result<()> {
        let text = self.text(key, args);
        let text = self.text(keys::ERROR, &[&text]);
        self.println(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::choose;

    type TestPrompt = ConsolePrompt<&'static [u8], Vec<u8>>;

    fn console(input: &'static str) -> TestPrompt {
        ConsolePrompt::new(input.as_bytes(), Vec::new(), Messages::builtin())
    }

    fn started(input: &'static str) -> TestPrompt {
        let mut prompt = console(input);
        prompt.start_session(&SessionParameters::default()).unwrap();
        prompt
    }

    fn printed(prompt: &TestPrompt) -> String {
        String::from_utf8(prompt.output().clone()).unwrap()
    }

    #[test]
    fn accept_without_remembering() {
        let mut prompt = started("yes\nno\n");
        let decision = prompt.confirm_without_context("ther", "there").unwrap();
        assert_eq!(
            decision,
            UserDecision {
                replacement: "there".to_string(),
                cancelled: false,
                remember: false,
            }
        );
        assert!(printed(&prompt).contains("Replace 'ther' by 'there'?"));
    }

    #[test]
    fn empty_replacement_cancels() {
        let mut prompt = started("no\n\nyes\n");
        let decision = prompt.confirm_without_context("ther", "there").unwrap();
        assert!(decision.cancelled);
        assert!(decision.remember);
        assert_eq!(decision.replacement, "");
    }

    #[test]
    fn typed_replacement_is_used() {
        let mut prompt = started("no\nthe\nno\n");
        let decision = prompt
            .confirm(Some("I saw ther cat"), "ther", "there")
            .unwrap();
        assert_eq!(decision, UserDecision::accept("the", false));
        let out = printed(&prompt);
        assert!(out.contains("Context:\nI saw ther cat\n"));
    }

    #[test]
    fn choice_reprompts_until_valid() {
        let mut prompt = started("x\n5\n1\n");
        let options = ["A", "B"];
        let picked = choose(&mut prompt, &options, "pick", &[]).unwrap();
        assert_eq!(picked, Some(&"A"));

        let out = printed(&prompt);
        assert_eq!(out.matches("is not a valid choice").count(), 2);
        assert!(out.contains("'x' is not a valid choice, enter a number between 0 and 2"));
        assert!(out.contains("\t1\tA\n\t2\tB\n"));
    }

    #[test]
    fn choice_zero_is_no_selection() {
        let mut prompt = started("0\n");
        let picked = choose(&mut prompt, &["A", "B"], "pick", &[]).unwrap();
        assert_eq!(picked, None);
    }

    #[test]
    fn empty_choices_are_rejected() {
        let mut prompt = started("1\n");
        let err = prompt.ask_choice(&[], "pick", &[]).unwrap_err();
        assert!(matches!(err, SubcorrectError::InvalidArgument(_)));
    }

    #[test]
    fn session_state_is_enforced() {
        let mut prompt = console("yes\nyes\n");
        assert!(matches!(
            prompt.confirm_without_context("a", "b"),
            Err(SubcorrectError::IllegalSessionState(_))
        ));
        assert!(matches!(
            prompt.ask_choice(&["A".to_string()], "pick", &[]),
            Err(SubcorrectError::IllegalSessionState(_))
        ));
        assert!(matches!(
            prompt.stop_session(),
            Err(SubcorrectError::IllegalSessionState(_))
        ));

        prompt.start_session(&SessionParameters::default()).unwrap();
        assert!(matches!(
            prompt.start_session(&SessionParameters::default()),
            Err(SubcorrectError::IllegalSessionState(_))
        ));
        prompt.stop_session().unwrap();
        assert!(matches!(
            prompt.stop_session(),
            Err(SubcorrectError::IllegalSessionState(_))
        ));
    }

    #[test]
    fn closed_input_is_reported() {
        let mut prompt = started("yes\n");
        assert!(matches!(
            prompt.confirm_without_context("a", "b"),
            Err(SubcorrectError::InputClosed)
        ));
    }

    #[test]
    fn diagnostics_are_prefixed() {
        let mut prompt = console("");
        prompt.information(keys::CONTEXT, &[]).unwrap();
        prompt.warning(keys::READ_FAILED, &[&"a.srt", &"boom"]).unwrap();
        prompt.error(keys::NO_STRATEGY, &[]).unwrap();
        assert_eq!(
            printed(&prompt),
            "Context:\n\
             WARNING: Could not read 'a.srt': boom\n\
             ERROR: No correction strategy selected, nothing to do.\n"
        );
    }
}
