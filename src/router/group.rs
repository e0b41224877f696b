//! Route groups: registration scopes sharing a path prefix.
//!
//! ```rust
//! use trellis::router::Router;
//!
//! let mut router = Router::default();
//! router
//!     .group("users", |users| {
//!         users.get("", "list_users")?;
//!         users.group(":id", |user| {
//!             user.get("", "show_user")?;
//!             user.patch("", "update_user")?;
//!             Ok(())
//!         })
//!     })
//!     .unwrap();
//! assert_eq!(router.routes()[1].pattern.to_string(), "/users/:id");
//! ```

use super::core::{Route, Router};
use super::pattern::RoutePattern;
use crate::error::Error;
use http::Method;
use std::sync::Arc;

/// Registers routes on a [`Router`] with a fixed prefix.
pub struct RouteGroup<'r> {
    router: &'r mut Router,
    prefix: RoutePattern,
}

impl<'r> RouteGroup<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: RoutePattern) -> Self {
        Self { router, prefix }
    }

    #[must_use]
    pub fn prefix(&self) -> &RoutePattern {
        &self.prefix
    }

    /// Register `route` with the group prefix prepended to its pattern.
    #[track_caller]
    pub fn register(&mut self, mut route: Route) -> Result<Arc<Route>, Error> {
        route.pattern = self
            .prefix
            .join(&route.pattern)
            .map_err(|e| e.with_trace(self.router.trace_capture()))?;
        self.router.register(route)
    }

    #[track_caller]
    pub fn on(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Arc<Route>, Error> {
        let route = Route::new(method, pattern, handler)
            .map_err(|e| e.with_trace(self.router.trace_capture()))?;
        self.register(route)
    }

    #[track_caller]
    pub fn get(
        &mut self,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Arc<Route>, Error> {
        self.on(Method::GET, pattern, handler)
    }

    #[track_caller]
    pub fn post(
        &mut self,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Arc<Route>, Error> {
        self.on(Method::POST, pattern, handler)
    }

    #[track_caller]
    pub fn put(
        &mut self,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Arc<Route>, Error> {
        self.on(Method::PUT, pattern, handler)
    }

    #[track_caller]
    pub fn patch(
        &mut self,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Arc<Route>, Error> {
        self.on(Method::PATCH, pattern, handler)
    }

    #[track_caller]
    pub fn delete(
        &mut self,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Arc<Route>, Error> {
        self.on(Method::DELETE, pattern, handler)
    }

    #[track_caller]
    pub fn options(
        &mut self,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Arc<Route>, Error> {
        self.on(Method::OPTIONS, pattern, handler)
    }

    #[track_caller]
    pub fn head(
        &mut self,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Arc<Route>, Error> {
        self.on(Method::HEAD, pattern, handler)
    }

    /// A nested group under this group's prefix.
    #[track_caller]
    pub fn grouped(&mut self, prefix: &str) -> Result<RouteGroup<'_>, Error> {
        let trace_capture = self.router.trace_capture();
        let prefix = RoutePattern::parse(prefix)
            .and_then(|p| self.prefix.join(&p))
            .map_err(|e| e.with_trace(trace_capture))?;
        Ok(RouteGroup {
            router: &mut *self.router,
            prefix,
        })
    }

    #[track_caller]
    pub fn group<F>(&mut self, prefix: &str, build: F) -> Result<(), Error>
    where
        F: FnOnce(&mut RouteGroup<'_>) -> Result<(), Error>,
    {
        let mut group = self.grouped(prefix)?;
        build(&mut group)
    }
}
