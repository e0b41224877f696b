//! The validation engine.
//!
//! [`Validations::validate`] runs every constraint and collects every failure; it never
//! stops at the first one. Decoding into a typed value happens only after the input
//! has passed.

use super::constraint::{FieldConstraint, FieldType};
use super::predicate::Predicate;
use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Failures per field. Empty means the input passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationOutcome {
    failures: BTreeMap<String, Vec<String>>,
}

impl ValidationOutcome {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.failures
            .entry(field.into())
            .or_default()
            .push(reason.into());
    }

    /// Reasons recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.failures.get(field).map(Vec::as_slice)
    }

    /// Failing fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.failures
            .iter()
            .map(|(field, reasons)| (field.as_str(), reasons.as_slice()))
    }

    pub fn merge(&mut self, other: ValidationOutcome) {
        for (field, reasons) in other.failures {
            self.failures.entry(field).or_default().extend(reasons);
        }
    }

    /// `Ok(())` when valid, otherwise a `ValidationFailed` error.
    #[track_caller]
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::validation(self))
        }
    }
}

/// `age is less than minimum of 18, name is empty`
impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, reasons) in &self.failures {
            for reason in reasons {
                if !first {
                    f.write_str(", ")?;
                }
                first = false;
                write!(f, "{field} {reason}")?;
            }
        }
        Ok(())
    }
}

/// An ordered set of field constraints for one input type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Validations {
    constraints: Vec<FieldConstraint>,
}

impl Validations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field constraint.
    pub fn add(
        &mut self,
        field: impl Into<String>,
        ty: FieldType,
        rule: Predicate,
    ) -> &mut Self {
        self.constraints.push(FieldConstraint::new(field, ty, rule));
        self
    }

    /// Add a prepared constraint, e.g. one marked optional or nullable.
    pub fn push(&mut self, constraint: FieldConstraint) -> &mut Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn constraints(&self) -> &[FieldConstraint] {
        &self.constraints
    }

    /// Declared type of `field`, used to coerce form and query text.
    #[must_use]
    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.constraints
            .iter()
            .find(|c| c.field == field)
            .map(|c| c.ty)
    }

    /// Check every constraint against `input` and collect all failures.
    ///
    /// A non-object input has no fields, so each required field reports `is required`.
    #[must_use]
    pub fn validate(&self, input: &Value) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new();
        for constraint in &self.constraints {
            if let Some(reason) = constraint.check(input) {
                outcome.add(constraint.field.as_str(), reason);
            }
        }
        outcome
    }

    /// [`Validations::validate`] as a `Result`.
    #[track_caller]
    pub fn check(&self, input: &Value) -> Result<(), Error> {
        self.validate(input).into_result()
    }

    /// Validate, then deserialize. Invalid input is never deserialized.
    #[track_caller]
    pub fn decode<T: DeserializeOwned>(&self, input: Value) -> Result<T, Error> {
        self.check(&input)?;
        serde_json::from_value(input).map_err(Error::decode)
    }
}

impl FromIterator<FieldConstraint> for Validations {
    fn from_iter<I: IntoIterator<Item = FieldConstraint>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}

/// A type decoded from untrusted input after passing its declared constraints.
///
/// ```rust
/// use serde::Deserialize;
/// use serde_json::json;
/// use trellis::validation::{FieldType, Predicate, Validatable, Validations};
///
/// #[derive(Deserialize)]
/// struct Signup {
///     name: String,
///     age: u32,
/// }
///
/// impl Validatable for Signup {
///     fn validations() -> Validations {
///         let mut v = Validations::new();
///         v.add("name", FieldType::String, Predicate::not_empty())
///             .add("age", FieldType::Integer, Predicate::range(18..));
///         v
///     }
/// }
///
/// let err = Signup::decode(json!({"name": "", "age": 10})).err().unwrap();
/// let fields = err.field_errors().unwrap();
/// assert_eq!(fields.len(), 2);
/// ```
pub trait Validatable: DeserializeOwned {
    fn validations() -> Validations;

    /// Runs after a successful decode, e.g. to normalise fields.
    fn after_decode(&mut self) -> Result<(), Error> {
        Ok(())
    }

    #[track_caller]
    fn decode(input: Value) -> Result<Self, Error> {
        let mut value: Self = Self::validations().decode(input)?;
        value.after_decode()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signup() -> Validations {
        let mut v = Validations::new();
        v.add("age", FieldType::Integer, Predicate::range(18..))
            .add("name", FieldType::String, Predicate::not_empty());
        v
    }

    #[test]
    fn test_collects_every_failure() {
        let outcome = signup().validate(&json!({"age": 10, "name": ""}));
        assert_eq!(outcome.len(), 2);
        assert_eq!(
            outcome.get("age").unwrap(),
            ["is less than minimum of 18".to_string()]
        );
        assert_eq!(outcome.get("name").unwrap(), ["is empty".to_string()]);
        assert_eq!(
            outcome.to_string(),
            "age is less than minimum of 18, name is empty"
        );
    }

    #[test]
    fn test_non_object_input() {
        let outcome = signup().validate(&json!([1, 2]));
        assert_eq!(outcome.get("age").unwrap(), ["is required".to_string()]);
        assert_eq!(outcome.get("name").unwrap(), ["is required".to_string()]);
    }

    #[test]
    fn test_no_implicit_trimming() {
        let outcome = signup().validate(&json!({"age": 20, "name": "  "}));
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_outcome_serializes_as_field_map() {
        let outcome = signup().validate(&json!({"age": 3, "name": "x"}));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"age": ["is less than minimum of 18"]})
        );
    }

    #[test]
    fn test_decode_reports_shape_errors_after_validation() {
        #[derive(Debug, serde::Deserialize)]
        struct Adult {
            #[allow(dead_code)]
            age: u8,
        }
        let mut v = Validations::new();
        v.add("age", FieldType::Integer, Predicate::Valid);
        let err = v.decode::<Adult>(json!({"age": 300})).unwrap_err();
        assert_eq!(err.identifier(), "malformed_content");
    }

    #[test]
    fn test_merge() {
        let mut a = ValidationOutcome::new();
        a.add("x", "is empty");
        let mut b = ValidationOutcome::new();
        b.add("x", "is not a string");
        b.add("y", "is required");
        a.merge(b);
        assert_eq!(a.get("x").unwrap().len(), 2);
        assert_eq!(a.len(), 2);
    }
}
