//! Segment matcher: one request path segment against one pattern token.

use crate::config::CaseSensitivity;
use std::fmt;
use std::sync::Arc;

/// One `/`-delimited component of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternToken {
    /// Literal text, e.g. `users`
    Constant(Arc<str>),
    /// Named capture, written `:name`
    Parameter(Arc<str>),
    /// Any single segment, written `*`
    Wildcard,
    /// One or more trailing segments, written `**`
    Catchall,
}

/// Outcome of matching one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentMatch<'a> {
    Miss,
    /// Matched without capturing
    Hit,
    /// Matched a parameter; carries the raw segment
    Captured(&'a str),
}

impl SegmentMatch<'_> {
    #[inline]
    #[must_use]
    pub fn is_match(self) -> bool {
        !matches!(self, SegmentMatch::Miss)
    }
}

impl PatternToken {
    /// Classify a pattern segment by its syntax. Validation lives in `RoutePattern::parse`.
    pub(crate) fn from_segment(segment: &str) -> Self {
        match segment {
            "**" => PatternToken::Catchall,
            "*" => PatternToken::Wildcard,
            _ => match segment.strip_prefix(':') {
                Some(name) => PatternToken::Parameter(Arc::from(name)),
                None => PatternToken::Constant(Arc::from(segment)),
            },
        }
    }

    /// Match a single request segment.
    ///
    /// `Catchall` reports a hit for any non-empty segment; consuming the rest of the
    /// path is up to the caller.
    #[inline]
    #[must_use]
    pub fn matches<'a>(&self, segment: &'a str, case: CaseSensitivity) -> SegmentMatch<'a> {
        match self {
            PatternToken::Constant(text) => {
                if case.equals(text, segment) {
                    SegmentMatch::Hit
                } else {
                    SegmentMatch::Miss
                }
            }
            _ if segment.is_empty() => SegmentMatch::Miss,
            PatternToken::Parameter(_) => SegmentMatch::Captured(segment),
            PatternToken::Wildcard | PatternToken::Catchall => SegmentMatch::Hit,
        }
    }

    /// Match the remainder of a path against a trailing `Catchall`.
    ///
    /// Returns the consumed tail, which is never empty.
    #[must_use]
    pub fn matches_tail<'s, 'a>(&self, segments: &'s [&'a str]) -> Option<&'s [&'a str]> {
        match self {
            PatternToken::Catchall if !segments.is_empty() => Some(segments),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self, PatternToken::Constant(_))
    }

    /// Parameter name, if this is a parameter token.
    #[must_use]
    pub fn parameter_name(&self) -> Option<&Arc<str>> {
        match self {
            PatternToken::Parameter(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for PatternToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternToken::Constant(text) => f.write_str(text),
            PatternToken::Parameter(name) => write!(f, ":{name}"),
            PatternToken::Wildcard => f.write_str("*"),
            PatternToken::Catchall => f.write_str("**"),
        }
    }
}
