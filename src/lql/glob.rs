//! Shell-style glob patterns for the LIKE operator.
//!
//! Syntax:
//!
//! ```text
//!   *          any run of characters except '/'
//!   ?          any single character except '/'
//!   [abc]      character class, ranges like [a-z], negated with [^...]
//!   \c         literal c (also inside a class)
//! ```
//!
//! Patterns are parsed once so syntax errors surface before any value is
//! matched.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unterminated character class")]
    UnterminatedClass,

    #[error("empty character class")]
    EmptyClass,

    #[error("unexpected '{0}' in character class")]
    BadClassChar(char),

    #[error("trailing escape character")]
    TrailingEscape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GlobToken {
    Literal(char),
    AnyChar,
    Class {
        negated: bool,
        ranges: Vec<(char, char)>,
    },
}

impl GlobToken {
    fn matches_char(&self, c: char) -> bool {
        match self {
            GlobToken::Literal(l) => *l == c,
            GlobToken::AnyChar => c != '/',
            GlobToken::Class { negated, ranges } => {
                let hit = ranges.iter().any(|(lo, hi)| *lo <= c && c <= *hi);
                hit != *negated
            }
        }
    }
}

/// Fixed-width run of tokens, optionally preceded by a star.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Chunk {
    star: bool,
    tokens: Vec<GlobToken>,
}

impl Chunk {
    /// Match the chunk at the start of `value`, returning the remainder.
    fn match_prefix<'a>(&self, value: &'a str) -> Option<&'a str> {
        let mut chars = value.chars();
        for token in &self.tokens {
            match chars.next() {
                Some(c) if token.matches_char(c) => {}
                _ => return None,
            }
        }
        Some(chars.as_str())
    }
}

/// A parsed glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    chunks: Vec<Chunk>,
}

impl GlobPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut chunks = Vec::new();
        let mut current = Chunk::default();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    // consecutive stars behave like one
                    if !current.tokens.is_empty() {
                        chunks.push(std::mem::take(&mut current));
                    }
                    current.star = true;
                }
                '?' => current.tokens.push(GlobToken::AnyChar),
                '\\' => match chars.next() {
                    Some(escaped) => current.tokens.push(GlobToken::Literal(escaped)),
                    None => return Err(PatternError::TrailingEscape),
                },
                '[' => {
                    let negated = chars.next_if_eq(&'^').is_some();
                    let mut ranges = Vec::new();
                    loop {
                        match chars.peek() {
                            None => return Err(PatternError::UnterminatedClass),
                            Some(']') if !ranges.is_empty() => {
                                chars.next();
                                break;
                            }
                            Some(']') => return Err(PatternError::EmptyClass),
                            Some(_) => {}
                        }
                        let lo = class_char(&mut chars)?;
                        let hi = if chars.next_if_eq(&'-').is_some() {
                            class_char(&mut chars)?
                        } else {
                            lo
                        };
                        ranges.push((lo, hi));
                    }
                    current.tokens.push(GlobToken::Class { negated, ranges });
                }
                other => current.tokens.push(GlobToken::Literal(other)),
            }
        }
        chunks.push(current);

        Ok(Self { chunks })
    }

    /// Each starred chunk takes its leftmost match; only the last chunk is
    /// anchored to the end of the value. Runs in O(len(value) * len(pattern)).
    pub fn matches(&self, value: &str) -> bool {
        let mut rest = value;
        let last = self.chunks.len() - 1;

        'chunks: for (i, chunk) in self.chunks.iter().enumerate() {
            let is_last = i == last;
            if chunk.star && chunk.tokens.is_empty() {
                // trailing star
                return !rest.contains('/');
            }

            if let Some(tail) = chunk.match_prefix(rest) {
                if tail.is_empty() || !is_last {
                    rest = tail;
                    continue;
                }
            }

            if chunk.star {
                let mut skipped = rest.chars();
                while let Some(c) = skipped.next() {
                    if c == '/' {
                        break;
                    }
                    if let Some(tail) = chunk.match_prefix(skipped.as_str()) {
                        if is_last && !tail.is_empty() {
                            continue;
                        }
                        rest = tail;
                        continue 'chunks;
                    }
                }
            }
            return false;
        }

        rest.is_empty()
    }
}

/// Read one (possibly escaped) class member; the class must not end here.
fn class_char<I>(chars: &mut std::iter::Peekable<I>) -> Result<char, PatternError>
where
    I: Iterator<Item = char>,
{
    let c = match chars.next() {
        None => return Err(PatternError::UnterminatedClass),
        Some(c @ ('-' | ']')) => return Err(PatternError::BadClassChar(c)),
        Some('\\') => chars.next().ok_or(PatternError::UnterminatedClass)?,
        Some(c) => c,
    };
    if chars.peek().is_none() {
        return Err(PatternError::UnterminatedClass);
    }
    Ok(c)
}
