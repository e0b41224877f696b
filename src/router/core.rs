//! Router core: registration and the request hot path.

use super::group::RouteGroup;
use super::pattern::{split_path, RoutePattern};
use super::trie::{AllowedMethods, Captures, Insert, Trie};
use crate::config::{ByteSize, CaseSensitivity, Config};
use crate::error::{Error, ErrorKind, TraceCapture};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured path parameters.
///
/// Names are `Arc<str>` shared with the route pattern; values are per-request text.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Matches slower than this are logged at `warn`.
const SLOW_MATCH: Duration = Duration::from_millis(1);

/// How the transport should hand a route's body to its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BodyStrategy {
    /// Buffer the body, up to `max_size` or the process default
    Collect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_size: Option<ByteSize>,
    },
    /// Do not buffer; the handler consumes the body itself
    Stream,
}

impl Default for BodyStrategy {
    fn default() -> Self {
        BodyStrategy::Collect { max_size: None }
    }
}

impl BodyStrategy {
    /// Effective buffering limit, or `None` for streamed bodies.
    #[must_use]
    pub fn limit(self, default: ByteSize) -> Option<ByteSize> {
        match self {
            BodyStrategy::Collect { max_size } => Some(max_size.unwrap_or(default)),
            BodyStrategy::Stream => None,
        }
    }
}

/// A registered route. Immutable once added to a [`Router`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub pattern: RoutePattern,
    /// Identifier the dispatcher uses to find the handler
    pub handler: Arc<str>,
    /// Shown in the route table
    pub description: Option<String>,
    pub body: BodyStrategy,
}

impl Route {
    #[track_caller]
    pub fn new(
        method: Method,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Self, Error> {
        Ok(Self::with_pattern(method, RoutePattern::parse(pattern)?, handler))
    }

    #[must_use]
    pub fn with_pattern(
        method: Method,
        pattern: RoutePattern,
        handler: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            method,
            pattern,
            handler: handler.into(),
            description: None,
            body: BodyStrategy::default(),
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: BodyStrategy) -> Self {
        self.body = body;
        self
    }
}

/// A resolved request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Parameter values in pattern order
    pub params: ParamVec,
    /// Segments consumed by a trailing `**`; empty otherwise
    pub catchall: Vec<String>,
}

impl RouteMatch {
    #[inline]
    #[must_use]
    pub fn handler(&self) -> &str {
        &self.route.handler
    }

    /// Value of the named parameter.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parse the named parameter.
    ///
    /// A value that does not parse is the client's fault and fails with 400.
    #[track_caller]
    pub fn param_as<T: FromStr>(&self, name: &str) -> Result<T, Error> {
        let Some(raw) = self.param(name) else {
            return Err(Error::internal(anyhow::anyhow!(
                "route {} has no parameter '{name}'",
                self.route.pattern
            )));
        };
        raw.parse().map_err(|_| {
            Error::abort_with(
                StatusCode::BAD_REQUEST,
                format!("Invalid value for parameter '{name}'"),
            )
        })
    }

    #[must_use]
    pub fn catchall(&self) -> &[String] {
        &self.catchall
    }

    /// The catchall tail rejoined with `/`.
    #[must_use]
    pub fn catchall_joined(&self) -> String {
        self.catchall.join("/")
    }

    /// Parameters as an owned map. Allocates; prefer [`RouteMatch::param`].
    #[must_use]
    pub fn params_map(&self) -> HashMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Outcome of [`Router::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Matched(RouteMatch),
    NoMatch,
    /// The path exists for other methods; sorted and deduplicated
    MethodNotAllowed { allowed: Vec<Method> },
}

impl MatchResult {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched(_))
    }

    /// Turn a miss into the matching 404 or 405 error.
    #[track_caller]
    pub fn into_result(self) -> Result<RouteMatch, Error> {
        match self {
            MatchResult::Matched(route_match) => Ok(route_match),
            MatchResult::NoMatch => Err(Error::not_found()),
            MatchResult::MethodNotAllowed { allowed } => Err(Error::method_not_allowed(allowed)),
        }
    }
}

/// Method/path router over a segment trie.
///
/// Build it at startup with `&mut self` registration calls, then share it
/// immutably; [`Router::resolve`] takes `&self` and holds no locks.
#[derive(Debug)]
pub struct Router {
    trie: Trie,
    routes: Vec<Arc<Route>>,
    trace_capture: TraceCapture,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Router {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            trie: Trie::new(config.case_sensitivity),
            routes: Vec::new(),
            trace_capture: config.trace_capture,
        }
    }

    #[must_use]
    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.trie.case_sensitivity()
    }

    /// Add a route.
    ///
    /// Registering an identical route again is a no-op.
    /// Binding a different route to the same method and an indistinguishable
    /// pattern fails with `RouteConflict`.
    #[track_caller]
    pub fn register(&mut self, route: Route) -> Result<Arc<Route>, Error> {
        let route = Arc::new(route);
        match self.trie.insert(&route.pattern, Arc::clone(&route)) {
            Insert::Added => {
                debug!(
                    method = %route.method,
                    pattern = %route.pattern,
                    handler = %route.handler,
                    "Route registered"
                );
                self.routes.push(Arc::clone(&route));
                Ok(route)
            }
            Insert::Unchanged => {
                debug!(
                    method = %route.method,
                    pattern = %route.pattern,
                    "Route already registered"
                );
                Ok(route)
            }
            Insert::Conflict(existing) => {
                let detail = format!(
                    "{} is already bound to handler '{}'",
                    existing.pattern, existing.handler
                );
                Err(self.conflict(&route, &existing, detail))
            }
            Insert::NameConflict(existing) => {
                let detail = format!(
                    "{} names the parameter at this position differently",
                    existing.pattern
                );
                Err(self.conflict(&route, &existing, detail))
            }
        }
    }

    #[track_caller]
    fn conflict(&self, route: &Route, existing: &Route, detail: String) -> Error {
        warn!(
            method = %route.method,
            pattern = %route.pattern,
            handler = %route.handler,
            existing_pattern = %existing.pattern,
            existing_handler = %existing.handler,
            %detail,
            "Route conflict"
        );
        Error::captured(
            ErrorKind::RouteConflict {
                method: route.method.clone(),
                pattern: route.pattern.to_string(),
                detail,
            },
            self.trace_capture,
        )
    }

    /// Parse `pattern` and register it for `method`.
    #[track_caller]
    pub fn on(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Into<Arc<str>>,
    ) -> Result<Arc<Route>, Error> {
        let route = Route::new(method, pattern, handler)
            .map_err(|e| e.with_trace(self.trace_capture))?;
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

    /// A registration scope whose patterns are prefixed with `prefix`.
    #[track_caller]
    pub fn grouped(&mut self, prefix: &str) -> Result<RouteGroup<'_>, Error> {
        let prefix = RoutePattern::parse(prefix).map_err(|e| e.with_trace(self.trace_capture))?;
        Ok(RouteGroup::new(self, prefix))
    }

    /// Register routes under `prefix` inside `build`.
    #[track_caller]
    pub fn group<F>(&mut self, prefix: &str, build: F) -> Result<(), Error>
    where
        F: FnOnce(&mut RouteGroup<'_>) -> Result<(), Error>,
    {
        let mut group = self.grouped(prefix)?;
        build(&mut group)
    }

    pub(crate) fn trace_capture(&self) -> TraceCapture {
        self.trace_capture
    }

    /// Resolve a request.
    ///
    /// Any `?query` or `#fragment` suffix on `path` is ignored.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> MatchResult {
        let match_start = Instant::now();
        let segments = split_path(path);
        let mut captures = Captures::new();
        let mut allowed = AllowedMethods::new();

        let result = match self
            .trie
            .search(&segments, method, &mut captures, &mut allowed)
        {
            Some(hit) => {
                let params: ParamVec = hit
                    .route
                    .pattern
                    .parameter_names()
                    .zip(captures.iter())
                    .map(|(name, value)| (Arc::clone(name), (*value).to_string()))
                    .collect();
                MatchResult::Matched(RouteMatch {
                    route: Arc::clone(hit.route),
                    params,
                    catchall: hit.tail.iter().map(|s| (*s).to_string()).collect(),
                })
            }
            None if allowed.is_empty() => MatchResult::NoMatch,
            None => {
                let mut allowed = allowed.into_vec();
                allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                allowed.dedup();
                MatchResult::MethodNotAllowed { allowed }
            }
        };

        let match_duration = match_start.elapsed();
        if match_duration > SLOW_MATCH {
            warn!(
                method = %method,
                path = %path,
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            );
        }

        match &result {
            MatchResult::Matched(m) => debug!(
                method = %method,
                path = %path,
                handler = %m.route.handler,
                route_pattern = %m.route.pattern,
                params = ?m.params,
                "Route matched"
            ),
            MatchResult::NoMatch => debug!(method = %method, path = %path, "No route matched"),
            MatchResult::MethodNotAllowed { allowed } => debug!(
                method = %method,
                path = %path,
                allowed = ?allowed,
                "Method not allowed"
            ),
        }

        result
    }

    /// [`Router::resolve`] with misses turned into 404/405 errors.
    #[track_caller]
    pub fn route(&self, method: &Method, path: &str) -> Result<RouteMatch, Error> {
        self.resolve(method, path)
            .into_result()
            .map_err(|e| e.with_trace(self.trace_capture))
    }

    /// Registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Printable route listing.
    #[must_use]
    pub fn table(&self) -> RouteTable<'_> {
        RouteTable {
            routes: &self.routes,
        }
    }
}

/// Route listing in registration order, one route per line:
/// `METHOD pattern handler [description]`.
pub struct RouteTable<'r> {
    routes: &'r [Arc<Route>],
}

impl fmt::Display for RouteTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<String> = self.routes.iter().map(|r| r.pattern.to_string()).collect();
        let method_width = self
            .routes
            .iter()
            .map(|r| r.method.as_str().len())
            .max()
            .unwrap_or(0);
        let pattern_width = patterns.iter().map(String::len).max().unwrap_or(0);
        let handler_width = self.routes.iter().map(|r| r.handler.len()).max().unwrap_or(0);

        for (route, pattern) in self.routes.iter().zip(&patterns) {
            let line = format!(
                "{:<mw$}  {:<pw$}  {:<hw$}  {}",
                route.method.as_str(),
                pattern,
                route.handler,
                route.description.as_deref().unwrap_or(""),
                mw = method_width,
                pw = pattern_width,
                hw = handler_width,
            );
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
