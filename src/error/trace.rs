//! Call-site capture for diagnostics.
//!
//! Every [`Error`](super::Error) remembers the source location that constructed it.
//! When [`TraceCapture::Enabled`] is configured, the construction paths that know the
//! configuration also attach a full [`Trace`] of the stack at that moment. Traces are a
//! side channel for logging; nothing about an error's identity depends on them.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

/// Whether errors built through configured paths record a stack trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceCapture {
    /// Record the call-site chain at construction time (the default)
    #[default]
    Enabled,
    /// Record only the origin call site
    Disabled,
}

impl TraceCapture {
    #[inline]
    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(self, TraceCapture::Enabled)
    }

    /// Parse the usual on/off spellings. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" | "enabled" => Some(TraceCapture::Enabled),
            "0" | "false" | "off" | "no" | "disabled" => Some(TraceCapture::Disabled),
            _ => None,
        }
    }
}

/// Source location that constructed an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl CallSite {
    /// Location of the nearest caller not marked `#[track_caller]`.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One frame of a captured trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Symbol name as reported by the platform unwinder
    pub function: String,
    /// `file:line:column` when debug info is available
    pub location: Option<String>,
}

/// Ordered call-site chain, innermost frame first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Trace {
    frames: Vec<Frame>,
}

impl Trace {
    /// Capture the current stack regardless of `RUST_BACKTRACE`.
    ///
    /// Frames belonging to the capture machinery itself are dropped so the first
    /// frame is the code that built the error.
    #[must_use]
    pub fn capture() -> Self {
        let backtrace = Backtrace::force_capture();
        Self::from_rendered(&backtrace.to_string())
    }

    /// Build a trace from the textual form `std::backtrace::Backtrace` renders.
    ///
    /// Lines look like `  3: crate::module::function` optionally followed by
    /// `      at src/module.rs:10:5`.
    pub(crate) fn from_rendered(text: &str) -> Self {
        let mut frames: Vec<Frame> = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if let Some(location) = line.strip_prefix("at ") {
                if let Some(last) = frames.last_mut() {
                    if last.location.is_none() {
                        last.location = Some(location.to_string());
                    }
                }
                continue;
            }
            let Some((index, function)) = line.split_once(": ") else {
                continue;
            };
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            frames.push(Frame {
                function: function.to_string(),
                location: None,
            });
        }

        let skip = frames
            .iter()
            .take_while(|frame| is_capture_frame(&frame.function))
            .count();
        frames.drain(..skip);
        Self { frames }
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn is_capture_frame(function: &str) -> bool {
    function.starts_with("std::backtrace")
        || function.contains("trellis::error::trace::")
        || function.contains("trellis::error::Error::with_trace")
        || function.contains("trellis::error::Error::captured")
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            match &frame.location {
                Some(location) => writeln!(f, "{i:>4}: {} ({location})", frame.function)?,
                None => writeln!(f, "{i:>4}: {}", frame.function)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERED: &str = "   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:117:9
   1: std::backtrace::Backtrace::create
   2: trellis::error::trace::Trace::capture
             at ./src/error/trace.rs:80:25
   3: app::handlers::login
             at ./src/handlers.rs:42:17
   4: core::ops::function::FnOnce::call_once
";

    #[test]
    fn test_from_rendered_skips_capture_frames() {
        let trace = Trace::from_rendered(RENDERED);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.frames()[0].function, "app::handlers::login");
        assert_eq!(
            trace.frames()[0].location.as_deref(),
            Some("./src/handlers.rs:42:17")
        );
        assert_eq!(trace.frames()[1].location, None);
    }

    #[test]
    fn test_from_rendered_ignores_noise() {
        let trace = Trace::from_rendered("unsupported backtrace\n\nnote: run with RUST_BACKTRACE");
        assert!(trace.is_empty());
    }

    #[test]
    fn test_call_site_points_at_caller() {
        let site = CallSite::caller();
        assert!(site.file.ends_with("trace.rs"));
        assert!(site.line > 0);
    }

    #[test]
    fn test_trace_capture_parse() {
        assert_eq!(TraceCapture::parse("OFF"), Some(TraceCapture::Disabled));
        assert_eq!(TraceCapture::parse("enabled"), Some(TraceCapture::Enabled));
        assert_eq!(TraceCapture::parse("maybe"), None);
    }
}
