//! Tokenization and segment wildcard matching.
//!
//! Rules, request paths, and permission scopes are all matched the same way:
//! both sides are split into ordered token sequences by a delimiter class and
//! compared position by position. The `*` token is the only wildcard.
//!
//! Boundary semantics are deliberately strict:
//!
//! - `*` matches exactly one token at its position;
//! - a *trailing* `*` token also matches an empty or longer suffix, so
//!   `tool-hero-*` matches `tool-hero`, `tool-hero-admin`, and
//!   `tool-hero-superadmin`;
//! - a pattern without any `*` token matches only the exact token sequence,
//!   so `tool-hero` does not match `tool-hero-admin`;
//! - `*` glued to a literal inside a single token (`tool*`) is not a
//!   wildcard at all, just the literal token `tool*`. Wildcard expansion
//!   only happens at delimiter boundaries, never as a substring match.

use std::fmt;

/// The wildcard token.
pub(crate) const WILDCARD: &str = "*";

/// Delimiter classes used to tokenize the different string kinds.
///
/// Runs of delimiter characters collapse, so `"a,,b"` and `"a, b"` both
/// tokenize to `["a", "b"]`. Tokens are always non-empty; empty input yields
/// an empty sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Term separator `[,; ]+`: method lists and permission expressions.
    Term,
    /// Path separator `/+`: request paths and path patterns.
    Path,
    /// Scope separator `[:-]+`: hierarchical permission scopes.
    Scope,
}

impl Delimiter {
    fn chars(self) -> &'static [char] {
        match self {
            Delimiter::Term => &[',', ';', ' '],
            Delimiter::Path => &['/'],
            Delimiter::Scope => &[':', '-'],
        }
    }

    /// Split `input` into ordered, non-empty tokens.
    pub fn split(self, input: &str) -> Vec<&str> {
        input.split(self.chars()).filter(|t| !t.is_empty()).collect()
    }
}

/// A compiled wildcard pattern over delimiter-separated segments.
///
/// # Example
/// ```
/// use rest_access::{Delimiter, SegmentPattern};
///
/// let pattern = SegmentPattern::new("/signup/*", Delimiter::Path);
/// assert!(pattern.matches("/signup/me"));
/// assert!(pattern.matches("/signup"));
/// assert!(!pattern.matches("/account"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPattern {
    raw: String,
    tokens: Vec<String>,
    delimiter: Delimiter,
}

impl SegmentPattern {
    /// Compile a pattern string with the given delimiter class.
    pub fn new(pattern: impl Into<String>, delimiter: Delimiter) -> Self {
        let raw = pattern.into();
        let tokens = delimiter.split(&raw).into_iter().map(str::to_owned).collect();
        Self { raw, tokens, delimiter }
    }

    /// The pattern string as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Test the pattern against a candidate string, tokenized with the
    /// pattern's own delimiter.
    pub fn matches(&self, candidate: &str) -> bool {
        self.matches_tokens(&self.delimiter.split(candidate))
    }

    /// Test the pattern against an already-tokenized candidate.
    pub(crate) fn matches_tokens<C: AsRef<str>>(&self, candidate: &[C]) -> bool {
        segments_match(&self.tokens, candidate)
    }
}

impl fmt::Display for SegmentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Positional wildcard match of a pattern token sequence against a candidate
/// token sequence.
pub(crate) fn segments_match<P, C>(pattern: &[P], candidate: &[C]) -> bool
where
    P: AsRef<str>,
    C: AsRef<str>,
{
    let trailing_wildcard = pattern.last().map(|t| t.as_ref() == WILDCARD).unwrap_or(false);
    let head = if trailing_wildcard {
        &pattern[..pattern.len() - 1]
    } else {
        pattern
    };

    if trailing_wildcard {
        // The trailing `*` absorbs any suffix, including an empty one.
        if candidate.len() < head.len() {
            return false;
        }
    } else if candidate.len() != head.len() {
        return false;
    }

    head.iter()
        .zip(candidate)
        .all(|(p, c)| p.as_ref() == WILDCARD || p.as_ref() == c.as_ref())
}
