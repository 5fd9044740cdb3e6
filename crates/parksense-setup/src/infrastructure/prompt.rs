//! Yes/no questions on the operator console.
//!
//! Generic over the reader and writer so tests can script the answers with
//! an in-memory cursor.

use std::io::{self, BufRead, Write};

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Asks `question` until the answer is `y`/`yes` or `n`/`no`
    /// (case-insensitive).  End of input counts as "no".
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        loop {
            write!(self.output, "{question} [y/n]: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(false);
            }

            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
