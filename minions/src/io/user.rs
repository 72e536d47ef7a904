//! Questions put to the user during a run.

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;

/// A question shown to the user.
#[derive(Debug, Clone, Copy)]
pub struct Question<'a> {
    pub title: &'a str,
    pub prompt: &'a str,
    pub placeholder: &'a str,
}

pub trait UserInteraction {
    /// Ask a question. `Ok(None)` means the user gave no answer.
    fn ask(&self, question: &Question<'_>) -> Result<Option<String>>;
}

/// Terminal prompt on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

impl UserInteraction for ConsolePrompt {
    fn ask(&self, question: &Question<'_>) -> Result<Option<String>> {
        eprintln!("{}", style(question.title).bold().cyan());
        eprintln!("{}", style(question.placeholder).dim());
        let answer: String = Input::new()
            .with_prompt(question.prompt)
            .allow_empty(true)
            .interact_text()
            .context("read answer from terminal")?;
        let answer = answer.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }
}
