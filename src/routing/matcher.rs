//! Host pattern matching.
//!
//! # Responsibilities
//! - Compile a `server_name` glob once, at snapshot build time
//! - Match the raw Host value (port included when the client sent one)
//!
//! # Glob Syntax
//! - `*` any run of characters, including `.` and `:`
//! - `?` exactly one character
//! - `[abc]`, `[a-z]`, `[!x]` character classes
//! - `{a,b}` alternation
//! - `\` escapes the next character
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110 host names)
//! - Patterns are translated to an anchored regex; the regex engine keeps
//!   matching linear in the host length

use std::fmt;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Why a `server_name` pattern failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unclosed character class")]
    UnclosedClass,
    #[error("unclosed alternation")]
    UnclosedAlternation,
    #[error("unexpected '}}' outside an alternation")]
    UnexpectedBrace,
    #[error("dangling escape at end of pattern")]
    DanglingEscape,
    #[error("{0}")]
    Regex(String),
}

/// Matches the Host header against a compiled glob.
#[derive(Clone)]
pub struct HostMatcher {
    pattern: String,
    regex: Regex,
}

impl HostMatcher {
    /// Compile a glob pattern.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let source = glob_to_regex(pattern)?;
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| PatternError::Regex(e.to_string()))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if the host matches this pattern.
    pub fn matches(&self, host: &str) -> bool {
        self.regex.is_match(host)
    }

    /// The pattern as written in configuration.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when the pattern contains no glob metacharacters.
    pub fn is_literal(&self) -> bool {
        !self
            .pattern
            .chars()
            .any(|c| matches!(c, '*' | '?' | '[' | '{' | '\\'))
    }
}

impl fmt::Debug for HostMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostMatcher").field(&self.pattern).finish()
    }
}

fn glob_to_regex(pattern: &str) -> Result<String, PatternError> {
    let mut out = String::with_capacity(pattern.len() * 2 + 4);
    out.push_str("^(?:");

    let mut chars = pattern.chars().peekable();
    let mut alternation_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                let escaped = chars.next().ok_or(PatternError::DanglingEscape)?;
                push_literal(&mut out, escaped);
            }
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                let mut closed = false;
                let mut first = true;
                while let Some(class_char) = chars.next() {
                    match class_char {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            let escaped = chars.next().ok_or(PatternError::DanglingEscape)?;
                            push_literal(&mut out, escaped);
                        }
                        '-' => out.push('-'),
                        other => push_literal(&mut out, other),
                    }
                    first = false;
                }
                if !closed {
                    return Err(PatternError::UnclosedClass);
                }
                out.push(']');
            }
            '{' => {
                alternation_depth += 1;
                out.push_str("(?:");
            }
            ',' if alternation_depth > 0 => out.push('|'),
            '}' => {
                if alternation_depth == 0 {
                    return Err(PatternError::UnexpectedBrace);
                }
                alternation_depth -= 1;
                out.push(')');
            }
            other => push_literal(&mut out, other),
        }
    }

    if alternation_depth > 0 {
        return Err(PatternError::UnclosedAlternation);
    }

    out.push_str(")$");
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}
