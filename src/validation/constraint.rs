//! Field constraints: which field, what type, which predicate.

use super::predicate::Predicate;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// JSON type a field must have before its predicate runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    /// Any JSON number
    Float,
    Bool,
    Array,
    Object,
    #[default]
    Any,
}

impl FieldType {
    /// Whether `value` has this type. `null` is never admitted here.
    #[must_use]
    pub fn admits(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Any => !value.is_null(),
        }
    }

    /// Phrase used in type failures, e.g. `is not an integer`.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Integer => "an integer",
            FieldType::Float => "a number",
            FieldType::Bool => "a boolean",
            FieldType::Array => "an array",
            FieldType::Object => "an object",
            FieldType::Any => "present",
        }
    }

    /// Convert form or query text to this type.
    ///
    /// Text that does not parse stays a string so the type check reports it.
    #[must_use]
    pub fn coerce(self, raw: &str) -> Value {
        match self {
            FieldType::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            FieldType::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())),
            FieldType::Bool => raw
                .parse::<bool>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            FieldType::Array => Value::Array(vec![Value::String(raw.to_string())]),
            FieldType::String | FieldType::Object | FieldType::Any => {
                Value::String(raw.to_string())
            }
        }
    }
}

fn default_required() -> bool {
    true
}

/// A check applied to one field of a structured input.
///
/// `field` may be a dotted path (`address.city`) into nested objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraint {
    pub field: String,
    #[serde(rename = "type", default)]
    pub ty: FieldType,
    #[serde(default)]
    pub rule: Predicate,
    /// Absent required fields fail with `is required`; absent optional ones are skipped
    #[serde(default = "default_required")]
    pub required: bool,
    /// Admit `null` past the type check; the predicate still sees it
    #[serde(default)]
    pub nullable: bool,
}

impl FieldConstraint {
    pub fn new(field: impl Into<String>, ty: FieldType, rule: Predicate) -> Self {
        Self {
            field: field.into(),
            ty,
            rule,
            required: true,
            nullable: false,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// The failure for this constraint against `input`.
    ///
    /// `None` when the field passes or is an absent optional field. A type failure
    /// stops the predicate from running.
    #[must_use]
    pub fn check(&self, input: &Value) -> Option<String> {
        let Some(value) = lookup(input, &self.field) else {
            return self.required.then(|| "is required".to_string());
        };

        let type_ok = self.ty.admits(value) || (value.is_null() && self.nullable);
        if !type_ok {
            return Some(format!("is not {}", self.ty.describe()));
        }

        let verdict = self.rule.evaluate(value);
        (!verdict.passed).then_some(verdict.failure)
    }
}

/// Resolve a dotted path. `None` means absent, which differs from `null`.
pub(crate) fn lookup<'v>(input: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(input, |current, key| current.as_object()?.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_distinguishes_null_from_absent() {
        let input = json!({"a": {"b": null}});
        assert_eq!(lookup(&input, "a.b"), Some(&Value::Null));
        assert_eq!(lookup(&input, "a.c"), None);
        assert_eq!(lookup(&input, "a.b.c"), None);
    }

    #[test]
    fn test_type_failure_skips_predicate() {
        let age = FieldConstraint::new("age", FieldType::Integer, Predicate::range(18..));
        assert_eq!(
            age.check(&json!({"age": "ten"})).as_deref(),
            Some("is not an integer")
        );
        assert_eq!(
            age.check(&json!({"age": null})).as_deref(),
            Some("is not an integer")
        );
        assert_eq!(age.check(&json!({})).as_deref(), Some("is required"));
        assert_eq!(age.check(&json!({"age": 30})), None);
    }

    #[test]
    fn test_optional_absent_is_skipped_but_present_is_checked() {
        let color = FieldConstraint::new(
            "favorite_color",
            FieldType::String,
            Predicate::one_of(["red", "blue"]),
        )
        .optional();
        assert_eq!(color.check(&json!({})), None);
        assert_eq!(
            color.check(&json!({"favorite_color": "pink"})).as_deref(),
            Some("is not red or blue")
        );
    }

    #[test]
    fn test_nullable_runs_predicate_on_null() {
        let color = FieldConstraint::new(
            "favorite_color",
            FieldType::String,
            Predicate::nil_or(Predicate::one_of(["red"])),
        )
        .nullable();
        assert_eq!(color.check(&json!({"favorite_color": null})), None);

        let strict = FieldConstraint::new("nickname", FieldType::String, Predicate::not_empty())
            .nullable();
        assert_eq!(
            strict.check(&json!({"nickname": null})).as_deref(),
            Some("is not a string or array")
        );
    }

    #[test]
    fn test_coerce() {
        assert_eq!(FieldType::Integer.coerce("42"), json!(42));
        assert_eq!(FieldType::Integer.coerce("4.2"), json!("4.2"));
        assert_eq!(FieldType::Float.coerce("4.5"), json!(4.5));
        assert_eq!(FieldType::Bool.coerce("true"), json!(true));
        assert_eq!(FieldType::String.coerce("7"), json!("7"));
    }
}
