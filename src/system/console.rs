// src/system/console.rs

use std::cell::RefCell;
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::rc::Rc;

use log::LevelFilter;

use crate::system::prompt::{LinePrompt, Prompt, TerminalPrompt};

/// How much the invocation should print, from the `-q`/`-v` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Informative lines too.
    #[default]
    Normal,
    /// Debug output and full error causes.
    Verbose,
}

impl Verbosity {
    /// The logger filter matching this verbosity.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Error,
            Verbosity::Normal => LevelFilter::Info,
            Verbosity::Verbose => LevelFilter::Debug,
        }
    }
}

/// The I/O context of one invocation: where output goes, how verbose it is,
/// and how to ask the user things.
///
/// It is created by the caller and handed to the driver, which threads it
/// through to the executing command. Nothing here is process-global.
pub struct Console {
    verbosity: Verbosity,
    ansi: bool,
    out: Box<dyn Write>,
    prompt: Box<dyn Prompt>,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("verbosity", &self.verbosity)
            .field("ansi", &self.ansi)
            .finish_non_exhaustive()
    }
}

impl Console {
    /// A console writing to `out` and asking through `prompt`, without styling.
    pub fn new(out: Box<dyn Write>, prompt: Box<dyn Prompt>) -> Self {
        Self {
            verbosity: Verbosity::Normal,
            ansi: false,
            out,
            prompt,
        }
    }

    /// Standard output, with terminal prompts when stdin is a terminal and a
    /// line-based fallback otherwise. Styling follows stdout being a terminal.
    pub fn stdio() -> Self {
        let prompt: Box<dyn Prompt> = if io::stdin().is_terminal() {
            Box::new(TerminalPrompt)
        } else {
            Box::new(LinePrompt::new(io::stdin().lock(), io::stdout()))
        };
        let mut console = Self::new(Box::new(io::stdout()), prompt);
        console.ansi = io::stdout().is_terminal();
        console
    }

    /// Builder form of [`Self::set_verbosity`].
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Turns ANSI styling on or off.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Sets the verbosity; the driver does this from the early scan.
    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// The current verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Whether `-v` was given.
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Whether `-q` was given without `-v`.
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    /// Whether help and error output may carry ANSI styling.
    pub fn ansi(&self) -> bool {
        self.ansi
    }

    /// Prints a line unconditionally (command results, errors).
    pub fn println(&mut self, line: impl fmt::Display) -> io::Result<()> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    /// Prints an informative line, suppressed by `-q`.
    pub fn info(&mut self, line: impl fmt::Display) -> io::Result<()> {
        if self.is_quiet() {
            return Ok(());
        }
        self.println(line)
    }

    /// Raw access to the output sink.
    pub fn out(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    /// The prompt used for interactive input.
    pub fn prompt(&mut self) -> &mut dyn Prompt {
        self.prompt.as_mut()
    }
}

/// A clonable in-memory sink, for capturing what a [`Console`] printed.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn captured(input: &str) -> (Console, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let prompt = LinePrompt::new(Cursor::new(input.as_bytes().to_vec()), buffer.clone());
        let console = Console::new(Box::new(buffer.clone()), Box::new(prompt));
        (console, buffer)
    }

    #[test]
    fn test_quiet_suppresses_info_only() {
        let (console, buffer) = captured("");
        let mut console = console.with_verbosity(Verbosity::Quiet);
        console.info("hello").unwrap();
        console.println("result").unwrap();
        assert_eq!(buffer.contents(), "result\n");
    }

    #[test]
    fn test_prompt_goes_through_console() {
        let (mut console, buffer) = captured("yes\n");
        assert!(console.prompt().confirm("Sure?", None).unwrap());
        assert!(buffer.contents().starts_with("Sure?: "));
    }

    #[test]
    fn test_level_filters() {
        assert_eq!(Verbosity::Quiet.level_filter(), LevelFilter::Error);
        assert_eq!(Verbosity::Normal.level_filter(), LevelFilter::Info);
        assert_eq!(Verbosity::Verbose.level_filter(), LevelFilter::Debug);
    }
}
