// src/system/prompt.rs

//! Synchronous interactive input: plain line reads, masked password reads and
//! yes/no confirmations.

use anyhow::{Result, anyhow};
use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};
use std::io::{BufRead, Write};

use crate::constants::SECRET_MASK;

/// The interactive I/O a command may use while executing.
pub trait Prompt {
    /// Reads a non-empty, trimmed line. An empty answer selects `default`
    /// when there is one; otherwise the question is asked again.
    fn read_line(&mut self, text: &str, default: Option<&str>) -> Result<String>;

    /// Like [`Prompt::read_line`] but the input is not echoed and the default
    /// is displayed masked.
    fn read_password(&mut self, text: &str, default: Option<&str>) -> Result<String>;

    /// Asks a yes/no question.
    fn confirm(&mut self, text: &str, default: Option<bool>) -> Result<bool>;
}

/// Prompts on the controlling terminal through `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn read_line(&mut self, text: &str, default: Option<&str>) -> Result<String> {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme).with_prompt(text);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?.trim().to_string())
    }

    fn read_password(&mut self, text: &str, default: Option<&str>) -> Result<String> {
        let prompt = match default {
            Some(_) => format!("{} [{}]", text, SECRET_MASK),
            None => text.to_string(),
        };
        let theme = ColorfulTheme::default();
        loop {
            let value = Password::with_theme(&theme)
                .with_prompt(prompt.as_str())
                .allow_empty_password(true)
                .interact()?;
            let value = value.trim();
            if !value.is_empty() {
                return Ok(value.to_string());
            }
            if let Some(default) = default {
                return Ok(default.to_string());
            }
        }
    }

    fn confirm(&mut self, text: &str, default: Option<bool>) -> Result<bool> {
        let theme = ColorfulTheme::default();
        let mut confirm = Confirm::with_theme(&theme).with_prompt(text);
        if let Some(default) = default {
            confirm = confirm.default(default);
        }
        Ok(confirm.interact()?)
    }
}

/// Prompts over any line-oriented reader/writer pair. Used when standard
/// input is not a terminal, and by tests.
///
/// Passwords are read as plain lines here: there is nothing to mask on a pipe.
#[derive(Debug)]
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Reads answers from `input` and writes questions to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consumes the prompt, returning the writer (handy to inspect what was asked).
    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(&mut self, text: &str, shown_default: Option<&str>) -> Result<String> {
        write!(self.output, "{}", text)?;
        if let Some(default) = shown_default {
            write!(self.output, " [{}]", default)?;
        }
        write!(self.output, ": ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(anyhow!("End of input while waiting for an answer to '{}'", text));
        }
        Ok(line.trim().to_string())
    }

    fn read_masked(&mut self, text: &str, default: Option<&str>, masked: bool) -> Result<String> {
        let shown = default.map(|d| if masked { SECRET_MASK } else { d });
        loop {
            let value = self.ask(text, shown)?;
            if !value.is_empty() {
                return Ok(value);
            }
            if let Some(default) = default {
                return Ok(default.to_string());
            }
        }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn read_line(&mut self, text: &str, default: Option<&str>) -> Result<String> {
        self.read_masked(text, default, false)
    }

    fn read_password(&mut self, text: &str, default: Option<&str>) -> Result<String> {
        self.read_masked(text, default, true)
    }

    fn confirm(&mut self, text: &str, default: Option<bool>) -> Result<bool> {
        let default_str = default.map(|d| if d { "yes" } else { "no" });
        loop {
            let value = self.read_line(text, default_str)?;
            match value.to_lowercase().as_str() {
                "yes" | "y" | "true" => return Ok(true),
                "no" | "n" | "false" => return Ok(false),
                _ => writeln!(
                    self.output,
                    "Response must be either: yes, no, n, y, true, false"
                )?,
            }
        }
    }
}
