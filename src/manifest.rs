//! # Route Manifests
//!
//! Routes and validation sets can be declared in a YAML, TOML or JSON file instead
//! of code:
//!
//! ```yaml
//! routes:
//!   - method: GET
//!     path: /hello/:name
//!     handler: hello_name
//!     description: Say hello
//!   - method: POST
//!     path: /upload
//!     handler: upload
//!     body: { strategy: stream }
//! groups:
//!   - prefix: users
//!     routes:
//!       - { method: GET, path: "", handler: list_users }
//!     groups:
//!       - prefix: ":id"
//!         routes:
//!           - { method: GET, path: "", handler: show_user }
//! validations:
//!   create_user:
//!     - { field: email, type: string, rule: email }
//! ```
//!
//! The format is chosen by file extension.

use crate::config::{yaml_from_str, Config};
use crate::router::{BodyStrategy, Route, RouteGroup, RoutePattern, Router};
use crate::validation::{FieldConstraint, ValidationRegistry, Validations};
use anyhow::{bail, Context, Result};
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Top-level manifest document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteManifest {
    pub routes: Vec<RouteEntry>,
    pub groups: Vec<GroupEntry>,
    /// Named constraint sets
    pub validations: BTreeMap<String, Vec<FieldConstraint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// HTTP method, case-insensitive
    pub method: String,
    pub path: String,
    pub handler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyStrategy>,
}

/// Routes sharing a path prefix. Groups nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub prefix: String,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
}

impl RouteEntry {
    fn to_route(&self) -> Result<Route> {
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method '{}'", self.method))?;
        let mut route = Route::with_pattern(
            method,
            RoutePattern::parse(&self.path)?,
            self.handler.as_str(),
        );
        if let Some(description) = &self.description {
            route = route.describe(description.clone());
        }
        if let Some(body) = self.body {
            route = route.body(body);
        }
        Ok(route)
    }
}

/// Load a manifest, choosing the format from the file extension.
pub fn load_manifest(path: &Path) -> Result<RouteManifest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let manifest: RouteManifest = match ext.as_deref() {
        Some("yaml") | Some("yml") => yaml_from_str(&text)
            .with_context(|| format!("Invalid YAML manifest {}", path.display()))?,
        Some("toml") => toml::from_str(&text)
            .with_context(|| format!("Invalid TOML manifest {}", path.display()))?,
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON manifest {}", path.display()))?,
        _ => bail!(
            "Unsupported manifest extension for {} (expected .yaml, .yml, .toml or .json)",
            path.display()
        ),
    };
    debug!(
        path = %path.display(),
        routes = manifest.routes.len(),
        groups = manifest.groups.len(),
        validation_sets = manifest.validations.len(),
        "Manifest loaded"
    );
    Ok(manifest)
}

impl RouteManifest {
    /// Register every route and group. The first conflict aborts.
    pub fn build_router(&self, config: &Config) -> Result<Router> {
        let mut router = Router::new(config);
        for entry in &self.routes {
            router
                .register(entry.to_route()?)
                .with_context(|| format!("Failed to register {} {}", entry.method, entry.path))?;
        }
        for group in &self.groups {
            let mut scope = router
                .grouped(&group.prefix)
                .with_context(|| format!("Invalid group prefix '{}'", group.prefix))?;
            register_group(&mut scope, group)?;
        }
        info!(route_count = router.routes().len(), "Routing table loaded");
        Ok(router)
    }

    pub fn build_registry(&self) -> ValidationRegistry {
        let mut registry = ValidationRegistry::new();
        for (name, constraints) in &self.validations {
            registry.insert(name.as_str(), constraints.iter().cloned().collect::<Validations>());
        }
        registry
    }
}

fn register_group(scope: &mut RouteGroup<'_>, group: &GroupEntry) -> Result<()> {
    for entry in &group.routes {
        scope.register(entry.to_route()?).with_context(|| {
            format!(
                "Failed to register {} {} in group '{}'",
                entry.method, entry.path, group.prefix
            )
        })?;
    }
    for nested in &group.groups {
        let mut inner = scope
            .grouped(&nested.prefix)
            .with_context(|| format!("Invalid group prefix '{}'", nested.prefix))?;
        register_group(&mut inner, nested)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::MatchResult;
    use serde_json::json;

    const YAML: &str = r#"
routes:
  - method: get
    path: /hello/:name
    handler: hello_name
    description: Say hello
groups:
  - prefix: users
    routes:
      - { method: GET, path: "", handler: list_users }
    groups:
      - prefix: ":id"
        routes:
          - { method: PATCH, path: "", handler: update_user }
validations:
  create_user:
    - field: name
      type: string
      rule: empty
"#;

    #[test]
    fn test_nested_groups() {
        let manifest: RouteManifest = yaml_from_str(YAML).unwrap();
        let router = manifest.build_router(&Config::default()).unwrap();
        assert_eq!(router.routes().len(), 3);

        let MatchResult::Matched(m) = router.resolve(&Method::PATCH, "/users/9") else {
            panic!("expected a match");
        };
        assert_eq!(m.handler(), "update_user");
        assert_eq!(m.param("id"), Some("9"));
    }

    #[test]
    fn test_registry_from_manifest() {
        let manifest: RouteManifest = yaml_from_str(YAML).unwrap();
        let registry = manifest.build_registry();
        let set = registry.get("create_user").unwrap();
        assert!(set.validate(&json!({"name": ""})).is_valid());
        assert!(!set.validate(&json!({"name": "x"})).is_valid());
    }

    #[test]
    fn test_bad_method() {
        let manifest = RouteManifest {
            routes: vec![RouteEntry {
                method: "GE T".into(),
                path: "/".into(),
                handler: "root".into(),
                description: None,
                body: None,
            }],
            ..RouteManifest::default()
        };
        let err = manifest.build_router(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("Invalid HTTP method"));
    }
}
