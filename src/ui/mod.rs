//! User interface module - line-based prompts and formatting.
//!
//! - `formatter` - status output
//! - [Prompter] - reads answers from any `BufRead`, so prompts can be driven
//!   from stdin or from an in-memory buffer in tests

use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

use crate::error::{BuildError, Result};

pub mod formatter;

pub use formatter::{
    display_error, display_menu, display_stage, display_status, display_success, display_warning,
};

/// Interprets a yes/no answer.
///
/// An empty answer yields `default`; `y`/`yes` and `n`/`no` are accepted in
/// any case. Anything else is `None`.
pub fn parse_yes_no(answer: &str, default: bool) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Asks questions on `output` and reads one line per answer from `input`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<StdinLock<'static>, Stdout> {
    /// Prompter bound to the process terminal
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Prompter::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompter { input, output }
    }

    /// Print a line of text.
    pub fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    /// Print `prompt` and read one trimmed line.
    ///
    /// End of input is an error, so a closed stdin cannot loop forever.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(BuildError::decision(format!(
                "no answer given for: {}",
                prompt.trim()
            )));
        }
        Ok(line.trim().to_string())
    }

    /// Ask a yes/no question until a valid answer is given.
    pub fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        loop {
            let answer = self.ask(prompt)?;
            match parse_yes_no(&answer, default) {
                Some(decision) => return Ok(decision),
                None => self.say("Please choose a valid option")?,
            }
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
