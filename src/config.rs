//! # Process configuration
//!
//! [`Config`] is built once at startup and handed by reference to the router, the
//! content decoder, and the responder. Nothing reads ambient global state.
//!
//! ## Sources
//!
//! - [`Config::default()`]
//! - [`Config::from_env()`]: `TRELLIS_CASE_INSENSITIVE`, `TRELLIS_TRACE_CAPTURE`,
//!   `TRELLIS_MAX_BODY_SIZE` plus the `TRELLIS_LOG_*` variables of
//!   [`LogConfig::from_env`]
//! - [`Config::from_file()`]: YAML, TOML or JSON chosen by extension
//!
//! Invalid environment values fall back to the default with a warning.
//!
//! ```rust
//! use trellis::config::{ByteSize, Config};
//!
//! let config = Config::default();
//! assert_eq!(config.max_body_size, ByteSize::kib(16));
//! ```

use crate::error::TraceCapture;
use crate::logging::LogConfig;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// How constant path segments are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    /// Unicode case-insensitive comparison; stored text keeps its case
    Insensitive,
}

impl CaseSensitivity {
    #[inline]
    #[must_use]
    pub fn equals(self, pattern: &str, segment: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => pattern == segment,
            CaseSensitivity::Insensitive if pattern.is_ascii() && segment.is_ascii() => {
                pattern.eq_ignore_ascii_case(segment)
            }
            CaseSensitivity::Insensitive => pattern
                .chars()
                .flat_map(char::to_lowercase)
                .eq(segment.chars().flat_map(char::to_lowercase)),
        }
    }
}

/// Parse YAML, accepting externally tagged enums written as single-key maps
/// (`range: {min: 18}`) as well as plain unit variants (`alphanumeric`).
pub(crate) fn yaml_from_str<T: DeserializeOwned>(text: &str) -> Result<T, serde_yaml::Error> {
    let deserializer = serde_yaml::Deserializer::from_str(text);
    serde_yaml::with::singleton_map_recursive::deserialize(deserializer)
}

/// A byte count parsed from strings like `16kb`, `500kb`, `1mb` or `2048`.
///
/// Units are powers of 1024 and case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(pub u64);

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

impl ByteSize {
    #[must_use]
    pub const fn bytes(n: u64) -> Self {
        ByteSize(n)
    }

    #[must_use]
    pub const fn kib(n: u64) -> Self {
        ByteSize(n * KIB)
    }

    #[must_use]
    pub const fn mib(n: u64) -> Self {
        ByteSize(n * MIB)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether `len` bytes fit within this limit.
    #[inline]
    #[must_use]
    pub fn admits(self, len: usize) -> bool {
        u64::try_from(len).map_or(false, |len| len <= self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseByteSizeError(String);

impl fmt::Display for ParseByteSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid byte size '{}': expected a number with an optional b/kb/mb/gb unit",
            self.0
        )
    }
}

impl std::error::Error for ParseByteSizeError {}

impl FromStr for ByteSize {
    type Err = ParseByteSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let split = lower
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(lower.len());
        let (digits, unit) = lower.split_at(split);
        let err = || ParseByteSizeError(trimmed.to_string());
        let value: u64 = digits.parse().map_err(|_| err())?;
        let multiplier = match unit.trim() {
            "" | "b" => 1,
            "k" | "kb" | "kib" => KIB,
            "m" | "mb" | "mib" => MIB,
            "g" | "gb" | "gib" => GIB,
            _ => return Err(err()),
        };
        value.checked_mul(multiplier).map(ByteSize).ok_or_else(err)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n >= GIB && n % GIB == 0 {
            write!(f, "{}gb", n / GIB)
        } else if n >= MIB && n % MIB == 0 {
            write!(f, "{}mb", n / MIB)
        } else if n >= KIB && n % KIB == 0 {
            write!(f, "{}kb", n / KIB)
        } else {
            write!(f, "{n}b")
        }
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(ByteSize(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Immutable process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Comparison mode for constant path segments
    pub case_sensitivity: CaseSensitivity,
    /// Whether errors record a stack trace at construction
    pub trace_capture: TraceCapture,
    /// Default limit for collected request bodies
    pub max_body_size: ByteSize,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            case_sensitivity: CaseSensitivity::Sensitive,
            trace_capture: TraceCapture::Enabled,
            max_body_size: ByteSize::kib(16),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let case_sensitivity = match env::var("TRELLIS_CASE_INSENSITIVE") {
            Ok(val) => match parse_flag(&val) {
                Some(true) => CaseSensitivity::Insensitive,
                Some(false) => CaseSensitivity::Sensitive,
                None => {
                    warn!(value = %val, "Invalid TRELLIS_CASE_INSENSITIVE, using default");
                    defaults.case_sensitivity
                }
            },
            Err(_) => defaults.case_sensitivity,
        };

        let trace_capture = match env::var("TRELLIS_TRACE_CAPTURE") {
            Ok(val) => TraceCapture::parse(&val).unwrap_or_else(|| {
                warn!(value = %val, "Invalid TRELLIS_TRACE_CAPTURE, using default");
                defaults.trace_capture
            }),
            Err(_) => defaults.trace_capture,
        };

        let max_body_size = match env::var("TRELLIS_MAX_BODY_SIZE") {
            Ok(val) => val.parse().unwrap_or_else(|e: ParseByteSizeError| {
                warn!(error = %e, "Invalid TRELLIS_MAX_BODY_SIZE, using default");
                defaults.max_body_size
            }),
            Err(_) => defaults.max_body_size,
        };

        Self {
            case_sensitivity,
            trace_capture,
            max_body_size,
            log: LogConfig::from_env(),
        }
    }

    /// Load configuration from a YAML, TOML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config = match ext.as_deref() {
            Some("yaml") | Some("yml") => yaml_from_str(&text)
                .with_context(|| format!("Invalid YAML config {}", path.display()))?,
            Some("toml") => toml::from_str(&text)
                .with_context(|| format!("Invalid TOML config {}", path.display()))?,
            Some("json") => serde_json::from_str(&text)
                .with_context(|| format!("Invalid JSON config {}", path.display()))?,
            _ => bail!(
                "Unsupported config file extension for {} (expected .yaml, .yml, .toml or .json)",
                path.display()
            ),
        };
        Ok(config)
    }

    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitivity = CaseSensitivity::Insensitive;
        self
    }

    #[must_use]
    pub fn without_traces(mut self) -> Self {
        self.trace_capture = TraceCapture::Disabled;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: ByteSize) -> Self {
        self.max_body_size = size;
        self
    }
}

pub(crate) fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_parse() {
        assert_eq!("16kb".parse::<ByteSize>().unwrap(), ByteSize::kib(16));
        assert_eq!("500KB".parse::<ByteSize>().unwrap(), ByteSize::kib(500));
        assert_eq!("1mb".parse::<ByteSize>().unwrap(), ByteSize::mib(1));
        assert_eq!("2048".parse::<ByteSize>().unwrap(), ByteSize(2048));
        assert_eq!(" 3 gb ".parse::<ByteSize>().unwrap(), ByteSize(3 * GIB));
        assert!("".parse::<ByteSize>().is_err());
        assert!("12parsecs".parse::<ByteSize>().is_err());
        assert!("kb".parse::<ByteSize>().is_err());
    }

    #[test]
    fn test_byte_size_display() {
        assert_eq!(ByteSize::kib(500).to_string(), "500kb");
        assert_eq!(ByteSize::mib(1).to_string(), "1mb");
        assert_eq!(ByteSize(1500).to_string(), "1500b");
    }

    #[test]
    fn test_byte_size_admits() {
        let limit = ByteSize(4);
        assert!(limit.admits(4));
        assert!(!limit.admits(5));
    }

    #[test]
    fn test_case_sensitivity_eq() {
        assert!(CaseSensitivity::Sensitive.equals("foo", "foo"));
        assert!(!CaseSensitivity::Sensitive.equals("foo", "Foo"));
        assert!(CaseSensitivity::Insensitive.equals("foo", "FOO"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.case_sensitivity, CaseSensitivity::Sensitive);
        assert_eq!(config.trace_capture, TraceCapture::Enabled);
        assert_eq!(config.max_body_size, ByteSize::kib(16));
    }

    #[test]
    fn test_insensitive_comparison_folds_unicode() {
        let case = CaseSensitivity::Insensitive;
        assert!(case.equals("äpfel", "ÄPFEL"));
        assert!(case.equals("Foo", "fOO"));
        assert!(!case.equals("äpfel", "apfel"));
        assert!(!CaseSensitivity::Sensitive.equals("äpfel", "ÄPFEL"));
    }

    #[test]
    fn test_deserialize_partial_yaml() {
        let config: Config = yaml_from_str(
            "case_sensitivity: insensitive\nmax_body_size: 500kb\nlog:\n  level: debug\n",
        )
        .unwrap();
        assert_eq!(config.case_sensitivity, CaseSensitivity::Insensitive);
        assert_eq!(config.max_body_size, ByteSize::kib(500));
        assert_eq!(config.trace_capture, TraceCapture::Enabled);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_deserialize_numeric_body_size() {
        let config: Config = serde_json::from_str(r#"{"max_body_size": 1024}"#).unwrap();
        assert_eq!(config.max_body_size, ByteSize::kib(1));
    }

    #[test]
    fn test_from_file_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_from_file_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "trace_capture = \"disabled\"\nmax_body_size = \"1mb\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.trace_capture, TraceCapture::Disabled);
        assert_eq!(config.max_body_size, ByteSize::mib(1));
    }
}
