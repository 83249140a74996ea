//! # Shell-like Argument Splitting
//!
//! Command handlers prompt for their arguments as a single line. This module
//! splits such a line into process arguments, honouring single quotes, double
//! quotes and backslash escapes the way a POSIX shell would, without performing
//! any expansion.

use thiserror::Error;

/// Errors produced while splitting an argument line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("unterminated {quote} quote starting at byte {start}")]
    UnterminatedQuote { quote: char, start: usize },

    #[error("trailing backslash at the end of the input")]
    TrailingEscape,
}

/// Split `input` into arguments.
///
/// Quotes group whitespace into a single argument and are removed from the
/// result. Inside double quotes a backslash only escapes `"` and `\`; inside
/// single quotes nothing is escaped.
///
/// # Example
/// ```rust
/// use parrot_util::split_arguments;
///
/// let arguments = split_arguments(r#"--plan "ABC 123" --label 'night run' path\ with\ spaces"#).unwrap();
/// assert_eq!(arguments, vec!["--plan", "ABC 123", "--label", "night run", "path with spaces"]);
/// ```
pub fn split_arguments(input: &str) -> Result<Vec<String>, ArgumentError> {
    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut characters = input.char_indices().peekable();

    while let Some((index, character)) = characters.next() {
        match character {
            '\'' => {
                has_token = true;
                loop {
                    match characters.next() {
                        Some((_, '\'')) => break,
                        Some((_, quoted)) => current.push(quoted),
                        None => return Err(ArgumentError::UnterminatedQuote { quote: '\'', start: index }),
                    }
                }
            }
            '"' => {
                has_token = true;
                loop {
                    match characters.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match characters.peek() {
                            Some((_, next @ ('"' | '\\'))) => {
                                current.push(*next);
                                characters.next();
                            }
                            _ => current.push('\\'),
                        },
                        Some((_, quoted)) => current.push(quoted),
                        None => return Err(ArgumentError::UnterminatedQuote { quote: '"', start: index }),
                    }
                }
            }
            '\\' => {
                has_token = true;
                match characters.next() {
                    Some((_, escaped)) => current.push(escaped),
                    None => return Err(ArgumentError::TrailingEscape),
                }
            }
            whitespace if whitespace.is_whitespace() => {
                if has_token {
                    arguments.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            other => {
                has_token = true;
                current.push(other);
            }
        }
    }

    if has_token {
        arguments.push(current);
    }
    Ok(arguments)
}
