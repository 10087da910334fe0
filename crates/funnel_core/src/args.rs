//! Tokenizer for free-text command arguments.
//!
//! Two input forms are accepted:
//!
//! - a JSON array of strings (`["npm", "run", "start"]`), the form the
//!   console stores for existing services;
//! - a shell-style line (`npm run "start prod"`), split on whitespace with
//!   POSIX quoting rules.
//!
//! Nothing is ever evaluated. Malformed input produces an
//! [`ArgumentParseError`] instead of a best-effort split.

use thiserror::Error;

/// Reasons an argument string cannot be tokenized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentParseError {
    #[error("unterminated {quote} quote starting at offset {offset}")]
    UnterminatedQuote { quote: char, offset: usize },

    #[error("trailing backslash at offset {offset}")]
    DanglingEscape { offset: usize },

    #[error("invalid JSON argument array: {0}")]
    InvalidJsonArray(String),
}

/// Split an argument string into ordered tokens.
pub fn tokenize(input: &str) -> Result<Vec<String>, ArgumentParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(trimmed)
            .map_err(|e| ArgumentParseError::InvalidJsonArray(e.to_string()));
    }
    tokenize_shell(trimmed)
}

/// Tokenize an optional field, treating `None` as no arguments.
pub fn tokenize_opt(input: Option<&str>) -> Result<Vec<String>, ArgumentParseError> {
    input.map_or_else(|| Ok(Vec::new()), tokenize)
}

fn tokenize_shell(input: &str) -> Result<Vec<String>, ArgumentParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A token may be empty ("") but still exist.
    let mut in_token = false;
    let mut chars = input.char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '\\' => {
                let (_, escaped) = chars
                    .next()
                    .ok_or(ArgumentParseError::DanglingEscape { offset })?;
                // Backslash-newline is a line continuation.
                if escaped != '\n' {
                    current.push(escaped);
                    in_token = true;
                }
            }
            '\'' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some((_, '\'')) => break,
                        Some((_, ch)) => current.push(ch),
                        None => {
                            return Err(ArgumentParseError::UnterminatedQuote {
                                quote: '\'',
                                offset,
                            })
                        }
                    }
                }
            }
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((escape_at, '\\')) => match chars.next() {
                            Some((_, ch @ ('"' | '\\' | '$' | '`'))) => current.push(ch),
                            Some((_, '\n')) => {}
                            Some((_, ch)) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => {
                                return Err(ArgumentParseError::DanglingEscape {
                                    offset: escape_at,
                                })
                            }
                        },
                        Some((_, ch)) => current.push(ch),
                        None => {
                            return Err(ArgumentParseError::UnterminatedQuote {
                                quote: '"',
                                offset,
                            })
                        }
                    }
                }
            }
            other => {
                current.push(other);
                in_token = true;
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
