//! # Validation Module
//!
//! Declarative, non-short-circuiting validation of structured input.
//!
//! A [`Validations`] set is a list of [`FieldConstraint`]s. Each constraint names a
//! field, the JSON type it must have, and a [`Predicate`]. Validating an input runs
//! every constraint and returns a [`ValidationOutcome`] holding every failure keyed
//! by field, so a client sees all problems in one response.
//!
//! Sets can be written in code through [`Validatable`] or loaded from YAML, TOML or
//! JSON:
//!
//! ```yaml
//! - field: username
//!   type: string
//!   rule:
//!     and: [{count: {min: 3}}, alphanumeric]
//! - field: favorite_color
//!   type: string
//!   required: false
//!   nullable: true
//!   rule:
//!     or: [nil, {in: [red, blue, green]}]
//! ```

mod constraint;
mod content;
mod engine;
mod predicate;
mod registry;

pub use constraint::{FieldConstraint, FieldType};
pub use content::ContentDecoder;
pub use engine::{Validatable, ValidationOutcome, Validations};
pub use predicate::{Predicate, RegexRule, Verdict};
pub use registry::ValidationRegistry;
