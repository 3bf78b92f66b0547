//! Glob patterns
//!
//! Supported syntax: `*` (any run), `?` (any one character), `[abc]`,
//! `[a-z]` and `[!abc]` classes. Everything else is literal, including
//! braces and backslashes. Matching is done by [`globset`] with path
//! separators treated as ordinary characters.

use std::borrow::Cow;

use globset::{GlobBuilder, GlobMatcher};

use crate::error::{PatternError, Result};

/// A compiled glob
#[derive(Debug, Clone)]
pub struct Glob {
    source: String,
    matcher: GlobMatcher,
    literals: usize,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(&normalize(pattern))
            .literal_separator(false)
            .backslash_escape(false)
            .build()
            .map_err(|e| PatternError::InvalidGlob {
                pattern: pattern.to_string(),
                message: e.kind().to_string(),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            matcher: glob.compile_matcher(),
            literals: literal_len(pattern),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of non-wildcard characters in the pattern
    pub fn literal_len(&self) -> usize {
        self.literals
    }

    pub fn is_match(&self, target: &str) -> bool {
        self.matcher.is_match(target)
    }

    /// Literal characters over target length, or `None` when not matching
    pub fn score(&self, target: &str) -> Option<f64> {
        if !self.is_match(target) {
            return None;
        }
        Some(ratio(self.literals, target.chars().count()))
    }
}

/// `part / whole` clamped to `[0, 1]`; an empty whole scores 1.0
pub(crate) fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 1.0;
    }
    (part as f64 / whole as f64).clamp(0.0, 1.0)
}

/// Make braces literal and collapse runs of `*`, outside classes
///
/// Braces are wrapped in single-character classes. A `**` run means the same
/// as `*` here, since there are no path components.
fn normalize(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains(['{', '}']) && !pattern.contains("**") {
        return Cow::Borrowed(pattern);
    }
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut class = ClassState::Outside;
    for c in pattern.chars() {
        class = match (class, c) {
            (ClassState::Outside, '{' | '}') => {
                out.push('[');
                out.push(c);
                out.push(']');
                continue;
            }
            (ClassState::Outside, '*') if out.ends_with('*') => continue,
            (ClassState::Outside, '[') => ClassState::Opened,
            (ClassState::Opened, '!') => ClassState::Negated,
            // A `]` right after the opening bracket is a member
            (ClassState::Opened | ClassState::Negated, _) => ClassState::Inside,
            (ClassState::Inside, ']') => ClassState::Outside,
            (state, _) => state,
        };
        out.push(c);
    }
    Cow::Owned(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassState {
    Outside,
    Opened,
    Negated,
    Inside,
}

/// Characters outside `*`, `?` and `[...]`
fn literal_len(pattern: &str) -> usize {
    let mut literals = 0;
    let mut class = ClassState::Outside;
    for c in pattern.chars() {
        class = match (class, c) {
            (ClassState::Outside, '*' | '?') => ClassState::Outside,
            (ClassState::Outside, '[') => ClassState::Opened,
            (ClassState::Outside, _) => {
                literals += 1;
                ClassState::Outside
            }
            (ClassState::Opened, '!') => ClassState::Negated,
            (ClassState::Opened | ClassState::Negated, _) => ClassState::Inside,
            (ClassState::Inside, ']') => ClassState::Outside,
            (state, _) => state,
        };
    }
    literals
}
