//! Route pattern parsing.
//!
//! Syntax: `/`-separated segments where `:name` is a parameter, `*` matches one
//! segment, `**` matches one or more trailing segments, and anything else is literal
//! text. Empty segments are ignored, so `/a//b/` and `a/b` are the same pattern.

use super::segment::PatternToken;
use crate::error::{Error, ErrorKind};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Segments of a request path, inline for typical depths.
pub type PathSegments<'a> = SmallVec<[&'a str; 8]>;

/// Split a request path into segments.
///
/// Any `?query` or `#fragment` suffix is dropped first; empty segments are skipped.
#[must_use]
pub fn split_path(path: &str) -> PathSegments<'_> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].split('/').filter(|s| !s.is_empty()).collect()
}

/// Ordered sequence of pattern tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoutePattern {
    tokens: Vec<PatternToken>,
}

impl RoutePattern {
    /// Parse pattern text. The root pattern is `/` (or the empty string).
    #[track_caller]
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        let tokens = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(PatternToken::from_segment)
            .collect();
        Self::from_tokens(tokens, pattern)
    }

    #[track_caller]
    fn from_tokens(tokens: Vec<PatternToken>, source: &str) -> Result<Self, Error> {
        let invalid = |reason: String| {
            Error::new(ErrorKind::InvalidPattern {
                pattern: source.to_string(),
                reason,
            })
        };

        let mut names: SmallVec<[Arc<str>; 8]> = SmallVec::new();
        for (i, token) in tokens.iter().enumerate() {
            match token {
                PatternToken::Parameter(name) if name.is_empty() => {
                    return Err(invalid("parameter name is empty".to_string()));
                }
                PatternToken::Parameter(name) => {
                    if names.contains(name) {
                        return Err(invalid(format!("parameter ':{name}' appears twice")));
                    }
                    names.push(Arc::clone(name));
                }
                PatternToken::Catchall if i + 1 != tokens.len() => {
                    return Err(invalid("'**' must be the final segment".to_string()));
                }
                _ => {}
            }
        }
        Ok(Self { tokens })
    }

    /// Append `other` to this pattern, as a group prefix does.
    #[track_caller]
    pub fn join(&self, other: &RoutePattern) -> Result<Self, Error> {
        if other.tokens.is_empty() {
            return Ok(self.clone());
        }
        let mut tokens = Vec::with_capacity(self.tokens.len() + other.tokens.len());
        tokens.extend(self.tokens.iter().cloned());
        tokens.extend(other.tokens.iter().cloned());
        let source = format!("{self}{other}");
        Self::from_tokens(tokens, &source)
    }

    #[must_use]
    pub fn tokens(&self) -> &[PatternToken] {
        &self.tokens
    }

    /// Parameter names in pattern order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.tokens.iter().filter_map(PatternToken::parameter_name)
    }

    #[must_use]
    pub fn has_catchall(&self) -> bool {
        matches!(self.tokens.last(), Some(PatternToken::Catchall))
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tokens.is_empty() {
            return f.write_str("/");
        }
        for token in &self.tokens {
            write!(f, "/{token}")?;
        }
        Ok(())
    }
}

impl FromStr for RoutePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoutePattern::parse(s)
    }
}
