//! Named validation sets, built once at startup and shared behind `Arc`.
//!
//! Sets come from two places: [`Validatable`] types registered in code, keyed by
//! their type name, and declarative sets loaded from a route manifest, keyed by the
//! name the manifest gives them.

use super::engine::{Validatable, Validations};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ValidationRegistry {
    sets: HashMap<String, Arc<Validations>>,
}

impl ValidationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constraints declared by `T`.
    pub fn register<T: Validatable>(&mut self) -> Arc<Validations> {
        let name = std::any::type_name::<T>();
        self.insert(name, T::validations())
    }

    /// Constraints previously registered for `T`.
    #[must_use]
    pub fn get_for<T: Validatable>(&self) -> Option<Arc<Validations>> {
        self.get(std::any::type_name::<T>())
    }

    /// Store a set under `name`, replacing any earlier one.
    pub fn insert(&mut self, name: impl Into<String>, validations: Validations) -> Arc<Validations> {
        let name = name.into();
        let validations = Arc::new(validations);
        debug!(
            set = %name,
            constraints = validations.constraints().len(),
            "Validation set registered"
        );
        if self.sets.insert(name.clone(), Arc::clone(&validations)).is_some() {
            debug!(set = %name, "Replaced existing validation set");
        }
        validations
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Validations>> {
        self.sets.get(name).cloned()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
