use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};

use crate::error::PortRangeError;
use crate::ports;

/// Print `question` and read one whitespace-trimmed answer line.
///
/// Errors when input is closed before an answer arrives.
pub fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    let n = input.read_line(&mut line).context("failed to read answer")?;
    if n == 0 {
        bail!("input closed while waiting for: {}", question.trim());
    }
    Ok(line.trim().to_string())
}

/// Yes/no question; only an answer starting with `y`/`Y` counts as yes.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<bool> {
    let answer = ask(input, output, question)?;
    Ok(is_yes(&answer))
}

/// Ask for a single port number.
///
/// The outer error is an I/O failure; the inner one is an answer that is not a
/// port in `1..=65535`, which callers report without aborting.
pub fn ask_port<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<Result<u16, PortRangeError>> {
    let answer = ask(input, output, question)?;
    Ok(ports::parse_port_str(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.chars().next(), Some('y' | 'Y'))
}
