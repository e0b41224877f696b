use crate::config::{ByteSize, Config};
use crate::error::{Error, Rendered, Responder, TraceCapture};
use crate::router::{RouteMatch, Router};
use crate::validation::{ContentDecoder, Validatable};
use anyhow::anyhow;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Request or response headers. Names are shared `Arc<str>`; values are per request.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// A matched request handed to a handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Raw query string, without the leading `?`
    pub query: Option<String>,
    pub headers: HeaderVec,
    /// Collected body; empty for bodiless requests
    pub body: Vec<u8>,
    pub route: RouteMatch,
}

impl HandlerRequest {
    /// Path parameter by name.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.route.param(name)
    }

    /// Header by name, case-insensitive.
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// What a handler returns on success, and what [`Dispatcher::dispatch`] always returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type` header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self::new(status, headers, body)
    }

    /// `200 OK` with a JSON body.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    /// Plain-text response. The text is carried as a JSON string.
    #[must_use]
    pub fn text(status: u16, text: impl Into<String>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "text/plain; charset=utf-8".to_string()));
        Self::new(status, headers, Value::String(text.into()))
    }

    #[must_use]
    pub fn from_rendered(rendered: &Rendered) -> Self {
        let mut response = Self::json(rendered.status.as_u16(), rendered.body());
        for (name, value) in &rendered.headers {
            response.set_header(name, value.clone());
        }
        response
    }

    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// A handler function registered under a route's handler identifier.
pub type Handler = Arc<dyn Fn(&HandlerRequest) -> Result<HandlerResponse, Error> + Send + Sync>;

/// Routes requests to registered handlers and renders every failure.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
    handlers: HashMap<String, Handler>,
    decoder: ContentDecoder,
    responder: Responder,
    max_body_size: ByteSize,
    trace_capture: TraceCapture,
}

impl Dispatcher {
    pub fn new(router: impl Into<Arc<Router>>, config: &Config) -> Self {
        Self {
            router: router.into(),
            handlers: HashMap::new(),
            decoder: ContentDecoder::new(config),
            responder: Responder::new(config),
            max_body_size: config.max_body_size,
            trace_capture: config.trace_capture,
        }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Register `handler` under `name`, replacing any earlier handler.
    pub fn register_handler<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&HandlerRequest) -> Result<HandlerResponse, Error> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.handlers.insert(name.clone(), Arc::new(handler)).is_some() {
            warn!(handler_name = %name, "Replaced existing handler");
        } else {
            debug!(handler_name = %name, "Handler registered");
        }
    }

    /// Register a handler that receives a validated `T`.
    ///
    /// `GET`, `HEAD` and `DELETE` requests without a body decode `T` from the query
    /// string; everything else decodes the body by its content type, within the
    /// route's body limit.
    pub fn register_typed<T, F>(&mut self, name: impl Into<String>, handler: F)
    where
        T: Validatable,
        F: Fn(&HandlerRequest, T) -> Result<HandlerResponse, Error> + Send + Sync + 'static,
    {
        let decoder = self.decoder;
        self.register_handler(name, move |req: &HandlerRequest| {
            let reads_query = matches!(req.method, Method::GET | Method::HEAD | Method::DELETE)
                && req.body.is_empty();
            let input = if reads_query {
                decoder.query::<T>(req.query.as_deref().unwrap_or_default())?
            } else {
                let limit = req
                    .route
                    .route
                    .body
                    .limit(decoder.limit())
                    .unwrap_or(ByteSize(u64::MAX));
                decoder
                    .with_limit(limit)
                    .content::<T>(req.content_type(), &req.body)?
            };
            handler(req, input)
        });
    }

    /// Handler identifiers named by routes but missing here, in route order.
    pub fn unregistered_handlers(&self) -> Vec<Arc<str>> {
        let mut missing: Vec<Arc<str>> = Vec::new();
        for route in self.router.routes() {
            if !self.handlers.contains_key(&*route.handler)
                && !missing.contains(&route.handler)
            {
                warn!(
                    handler_name = %route.handler,
                    method = %route.method,
                    pattern = %route.pattern,
                    "Route has no registered handler"
                );
                missing.push(Arc::clone(&route.handler));
            }
        }
        missing
    }

    /// Resolve, run the handler, and render any failure.
    ///
    /// `path` may carry a query string. A handler panic becomes a 500.
    pub fn dispatch(
        &self,
        method: &Method,
        path: &str,
        headers: HeaderVec,
        body: Vec<u8>,
    ) -> HandlerResponse {
        match self.try_dispatch(method, path, headers, body) {
            Ok(response) => response,
            Err(err) => self.render(&err),
        }
    }

    /// Render an error produced outside the dispatcher.
    #[must_use]
    pub fn render(&self, err: &Error) -> HandlerResponse {
        HandlerResponse::from_rendered(&self.responder.render(err))
    }

    /// [`Dispatcher::dispatch`] without rendering, for callers that inspect the
    /// [`Error`] themselves. With trace capture enabled every error carries a trace.
    pub fn try_dispatch(
        &self,
        method: &Method,
        path: &str,
        headers: HeaderVec,
        body: Vec<u8>,
    ) -> Result<HandlerResponse, Error> {
        let route = self.router.route(method, path)?;

        if let Some(limit) = route.route.body.limit(self.max_body_size) {
            if !limit.admits(body.len()) {
                debug!(
                    handler_name = %route.handler(),
                    size = body.len(),
                    limit = %limit,
                    "Request body over route limit"
                );
                return Err(Error::payload_too_large(limit).with_trace(self.trace_capture));
            }
        }

        let Some(handler) = self.handlers.get(route.handler()) else {
            let available: Vec<&String> = self.handlers.keys().collect();
            error!(
                handler_name = %route.handler(),
                available_handlers = ?available,
                "Handler not found"
            );
            return Err(Error::internal(anyhow!(
                "no handler registered for '{}'",
                route.handler()
            ))
            .with_trace(self.trace_capture));
        };

        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path.to_string(), None),
        };
        let request = HandlerRequest {
            method: method.clone(),
            path,
            query,
            headers,
            body,
            route,
        };

        info!(
            handler_name = %request.route.handler(),
            method = %request.method,
            path = %request.path,
            "Request dispatched to handler"
        );
        let start = Instant::now();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(&request)));
        match outcome {
            Ok(result) => {
                debug!(
                    handler_name = %request.route.handler(),
                    elapsed_us = start.elapsed().as_micros() as u64,
                    ok = result.is_ok(),
                    "Handler execution complete"
                );
                result.map_err(|e| e.with_trace(self.trace_capture))
            }
            Err(panic) => {
                let panic_message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                let backtrace = std::backtrace::Backtrace::capture();
                error!(
                    handler_name = %request.route.handler(),
                    panic_message = %panic_message,
                    backtrace = %backtrace,
                    "Handler panicked"
                );
                Err(Error::internal(anyhow!("handler panicked: {panic_message}"))
                    .with_trace(self.trace_capture))
            }
        }
    }
}
