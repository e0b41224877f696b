//! Composable value predicates.
//!
//! A [`Predicate`] checks one JSON value and reports a [`Verdict`] carrying both the
//! success and the failure description, so negation can swap them. Predicates compose
//! with `&`, `|` and `!`:
//!
//! ```rust
//! use serde_json::json;
//! use trellis::validation::Predicate;
//!
//! let username = Predicate::count(3..) & Predicate::Alphanumeric;
//! assert!(username.evaluate(&json!("ada99")).passed);
//! assert_eq!(
//!     username.evaluate(&json!("a!")).failure,
//!     "is less than minimum of 3 character(s) and contains an invalid character: '!' (allowed: A-Z, a-z, 0-9)"
//! );
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::ops::{Bound, RangeBounds};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$").unwrap()
});

/// A compiled regular expression that serializes as its source text.
#[derive(Clone)]
pub struct RegexRule(Regex);

impl RegexRule {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(RegexRule)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl fmt::Debug for RegexRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegexRule({:?})", self.0.as_str())
    }
}

impl PartialEq for RegexRule {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for RegexRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegexRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        RegexRule::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Result of evaluating a predicate against one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    /// Description that holds when the predicate passes, e.g. `is empty`
    pub success: String,
    /// Description that holds when it fails, e.g. `is not empty`
    pub failure: String,
    /// The value had the wrong JSON type; negation does not rescue it
    type_mismatch: bool,
}

impl Verdict {
    fn new(passed: bool, success: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            passed,
            success: success.into(),
            failure: failure.into(),
            type_mismatch: false,
        }
    }

    /// The description matching the outcome.
    #[must_use]
    pub fn description(&self) -> &str {
        if self.passed {
            &self.success
        } else {
            &self.failure
        }
    }

    fn negate(self) -> Self {
        if self.type_mismatch {
            return self;
        }
        Self {
            passed: !self.passed,
            success: self.failure,
            failure: self.success,
            type_mismatch: false,
        }
    }

    fn mismatch(expected: &str) -> Self {
        Self {
            type_mismatch: true,
            ..Self::new(false, format!("is {expected}"), format!("is not {expected}"))
        }
    }
}

/// A check on a single value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Always passes
    #[default]
    Valid,
    /// String, array or object with no content
    Empty,
    /// Numeric bounds, inclusive unless marked exclusive
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "is_false")]
        exclusive_min: bool,
        #[serde(default, skip_serializing_if = "is_false")]
        exclusive_max: bool,
    },
    /// Inclusive bounds on characters of a string or elements of an array
    Count {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
    /// Only ASCII letters and digits
    Alphanumeric,
    /// Only ASCII characters
    Ascii,
    /// Only the listed characters
    Charset(String),
    /// Full or partial regex match
    Pattern(RegexRule),
    Email,
    /// Absolute URL with a host
    Url,
    /// Equal to one of the listed values
    In(Vec<Value>),
    /// JSON `null`
    Nil,
    /// Every part passes
    And(Vec<Predicate>),
    /// At least one part passes
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Predicate {
    #[must_use]
    pub fn not_empty() -> Self {
        !Predicate::Empty
    }

    /// Numeric range from Rust range syntax, e.g. `range(18..)` or `range(0..=100)`.
    pub fn range<T, R>(range: R) -> Self
    where
        T: Into<f64> + Copy,
        R: RangeBounds<T>,
    {
        let (min, exclusive_min) = match range.start_bound() {
            Bound::Included(v) => (Some((*v).into()), false),
            Bound::Excluded(v) => (Some((*v).into()), true),
            Bound::Unbounded => (None, false),
        };
        let (max, exclusive_max) = match range.end_bound() {
            Bound::Included(v) => (Some((*v).into()), false),
            Bound::Excluded(v) => (Some((*v).into()), true),
            Bound::Unbounded => (None, false),
        };
        Predicate::Range {
            min,
            max,
            exclusive_min,
            exclusive_max,
        }
    }

    /// Length range from Rust range syntax, e.g. `count(3..)`.
    pub fn count<R: RangeBounds<usize>>(range: R) -> Self {
        let min = match range.start_bound() {
            Bound::Included(v) => Some(*v),
            Bound::Excluded(v) => Some(v.saturating_add(1)),
            Bound::Unbounded => None,
        };
        let max = match range.end_bound() {
            Bound::Included(v) => Some(*v),
            Bound::Excluded(v) => Some(v.saturating_sub(1)),
            Bound::Unbounded => None,
        };
        Predicate::Count { min, max }
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In(values.into_iter().map(Into::into).collect())
    }

    pub fn charset(allowed: impl Into<String>) -> Self {
        Predicate::Charset(allowed.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        RegexRule::new(pattern).map(Predicate::Pattern)
    }

    /// `null`, or a value passing `inner`.
    #[must_use]
    pub fn nil_or(inner: Predicate) -> Self {
        Predicate::Nil | inner
    }

    /// Evaluate against `value`.
    #[must_use]
    pub fn evaluate(&self, value: &Value) -> Verdict {
        match self {
            Predicate::Valid => Verdict::new(true, "is valid", "is not valid"),
            Predicate::Empty => evaluate_empty(value),
            Predicate::Range {
                min,
                max,
                exclusive_min,
                exclusive_max,
            } => evaluate_range(value, *min, *max, *exclusive_min, *exclusive_max),
            Predicate::Count { min, max } => evaluate_count(value, *min, *max),
            Predicate::Alphanumeric => evaluate_chars(value, "A-Z, a-z, 0-9", |c| {
                c.is_ascii_alphanumeric()
            }),
            Predicate::Ascii => evaluate_chars(value, "ASCII", |c| c.is_ascii()),
            Predicate::Charset(allowed) => {
                evaluate_chars(value, allowed, |c| allowed.contains(c))
            }
            Predicate::Pattern(rule) => match value.as_str() {
                Some(text) => Verdict::new(
                    rule.is_match(text),
                    format!("is a valid match for '{}'", rule.as_str()),
                    format!("is not a valid match for '{}'", rule.as_str()),
                ),
                None => Verdict::mismatch("a string"),
            },
            Predicate::Email => match value.as_str() {
                Some(text) => Verdict::new(
                    EMAIL_REGEX.is_match(text),
                    "is a valid email address",
                    "is not a valid email address",
                ),
                None => Verdict::mismatch("a string"),
            },
            Predicate::Url => match value.as_str() {
                Some(text) => Verdict::new(
                    url::Url::parse(text).is_ok_and(|u| u.has_host()),
                    "is a valid URL",
                    "is an invalid URL",
                ),
                None => Verdict::mismatch("a string"),
            },
            Predicate::In(options) => {
                let listed = list_values(options);
                Verdict::new(
                    options.contains(value),
                    format!("is {listed}"),
                    format!("is not {listed}"),
                )
            }
            Predicate::Nil => Verdict::new(value.is_null(), "is null", "is not null"),
            Predicate::Not(inner) => inner.evaluate(value).negate(),
            Predicate::And(parts) => {
                let verdicts: Vec<Verdict> = parts.iter().map(|p| p.evaluate(value)).collect();
                let passed = verdicts.iter().all(|v| v.passed);
                let success = join_descriptions(verdicts.iter().map(|v| v.success.as_str()));
                let failure = join_descriptions(
                    verdicts
                        .iter()
                        .filter(|v| !v.passed)
                        .map(|v| v.failure.as_str()),
                );
                Verdict {
                    type_mismatch: verdicts.iter().any(|v| v.type_mismatch),
                    ..Verdict::new(passed, success, failure)
                }
            }
            Predicate::Or(parts) => {
                let verdicts: Vec<Verdict> = parts.iter().map(|p| p.evaluate(value)).collect();
                let passed = verdicts.iter().any(|v| v.passed);
                let success = join_descriptions(
                    verdicts
                        .iter()
                        .filter(|v| v.passed)
                        .map(|v| v.success.as_str()),
                );
                let failure = join_descriptions(verdicts.iter().map(|v| v.failure.as_str()));
                Verdict {
                    type_mismatch: !verdicts.is_empty()
                        && verdicts.iter().all(|v| v.type_mismatch),
                    ..Verdict::new(passed, success, failure)
                }
            }
        }
    }
}

impl std::ops::BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        match (self, rhs) {
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), rhs) => {
                left.push(rhs);
                Predicate::And(left)
            }
            (lhs, rhs) => Predicate::And(vec![lhs, rhs]),
        }
    }
}

impl std::ops::BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        match (self, rhs) {
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), rhs) => {
                left.push(rhs);
                Predicate::Or(left)
            }
            (lhs, rhs) => Predicate::Or(vec![lhs, rhs]),
        }
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

fn evaluate_empty(value: &Value) -> Verdict {
    let empty = match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => return Verdict::mismatch("a string or array"),
    };
    Verdict::new(empty, "is empty", "is not empty")
}

fn evaluate_range(
    value: &Value,
    min: Option<f64>,
    max: Option<f64>,
    exclusive_min: bool,
    exclusive_max: bool,
) -> Verdict {
    let Some(n) = value.as_f64() else {
        return Verdict::mismatch("a number");
    };

    let success = match (min, max) {
        (Some(lo), Some(hi)) => format!("is between {lo} and {hi}"),
        (Some(lo), None) if exclusive_min => format!("is greater than {lo}"),
        (Some(lo), None) => format!("is greater than or equal to minimum of {lo}"),
        (None, Some(hi)) if exclusive_max => format!("is less than {hi}"),
        (None, Some(hi)) => format!("is less than or equal to maximum of {hi}"),
        (None, None) => "is a number".to_string(),
    };

    if let Some(lo) = min {
        if exclusive_min && n <= lo {
            return Verdict::new(false, success, format!("is not greater than {lo}"));
        }
        if n < lo {
            return Verdict::new(false, success, format!("is less than minimum of {lo}"));
        }
    }
    if let Some(hi) = max {
        if exclusive_max && n >= hi {
            return Verdict::new(false, success, format!("is not less than {hi}"));
        }
        if n > hi {
            return Verdict::new(false, success, format!("is greater than maximum of {hi}"));
        }
    }

    let failure = match (min, max) {
        (Some(lo), Some(hi)) => format!("is not between {lo} and {hi}"),
        (Some(lo), None) => format!("is less than minimum of {lo}"),
        (None, Some(hi)) => format!("is greater than maximum of {hi}"),
        (None, None) => "is not a number".to_string(),
    };
    Verdict::new(true, success, failure)
}

fn evaluate_count(value: &Value, min: Option<usize>, max: Option<usize>) -> Verdict {
    let (n, unit) = match value {
        Value::String(s) => (s.chars().count(), "character(s)"),
        Value::Array(items) => (items.len(), "item(s)"),
        _ => return Verdict::mismatch("a string or array"),
    };

    let success = match (min, max) {
        (Some(lo), Some(hi)) => format!("is between {lo} and {hi} {unit}"),
        (Some(lo), None) => format!("is greater than or equal to minimum of {lo} {unit}"),
        (None, Some(hi)) => format!("is less than or equal to maximum of {hi} {unit}"),
        (None, None) => format!("has any number of {unit}"),
    };

    if let Some(lo) = min.filter(|lo| n < *lo) {
        return Verdict::new(false, success, format!("is less than minimum of {lo} {unit}"));
    }
    if let Some(hi) = max.filter(|hi| n > *hi) {
        return Verdict::new(false, success, format!("is greater than maximum of {hi} {unit}"));
    }
    let failure = match (min, max) {
        (Some(lo), Some(hi)) => format!("is not between {lo} and {hi} {unit}"),
        (Some(lo), None) => format!("is less than minimum of {lo} {unit}"),
        (None, Some(hi)) => format!("is greater than maximum of {hi} {unit}"),
        (None, None) => format!("has no {unit}"),
    };
    Verdict::new(true, success, failure)
}

fn evaluate_chars(value: &Value, allowed: &str, admits: impl Fn(char) -> bool) -> Verdict {
    let Some(text) = value.as_str() else {
        return Verdict::mismatch("a string");
    };
    let success = format!("contains only {allowed}");
    match text.chars().find(|c| !admits(*c)) {
        Some(bad) => Verdict::new(
            false,
            success,
            format!("contains an invalid character: '{bad}' (allowed: {allowed})"),
        ),
        None => Verdict::new(
            true,
            success,
            format!("contains a character outside {allowed}"),
        ),
    }
}

/// `red`, `red or blue`, `red, blue, or green`
fn list_values(values: &[Value]) -> String {
    let rendered: Vec<String> = values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    match rendered.as_slice() {
        [] => "one of no values".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}

fn join_descriptions<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(" and ")
}
