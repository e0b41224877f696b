//! # Dispatcher Module
//!
//! The dispatcher performs the hand-off from transport to handler and back:
//!
//! 1. The [`Router`](crate::router::Router) resolves `(method, path)` to a route
//! 2. The route's body limit is enforced
//! 3. The handler registered under the route's identifier runs
//! 4. Any failure, from routing, decoding, validation or the handler itself, is
//!    rendered by the [`Responder`](crate::error::Responder)
//!
//! ## Handler Registration
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use trellis::config::Config;
//! use trellis::dispatcher::{Dispatcher, HandlerResponse, HeaderVec};
//! use trellis::router::Router;
//!
//! let config = Config::default();
//! let mut router = Router::new(&config);
//! router.get("/hello/:name", "hello_name").unwrap();
//!
//! let mut dispatcher = Dispatcher::new(router, &config);
//! dispatcher.register_handler("hello_name", |req| {
//!     Ok(HandlerResponse::ok(json!({ "hello": req.param("name") })))
//! });
//!
//! let response = dispatcher.dispatch(&Method::GET, "/hello/ada", HeaderVec::new(), Vec::new());
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, json!({ "hello": "ada" }));
//! ```
//!
//! ## Error Handling
//!
//! - Unknown paths render 404, known paths with another method 405 with `Allow`
//! - Routes whose handler was never registered render 500
//! - Handler panics are caught and render 500

mod core;

pub use core::{
    Dispatcher, Handler, HandlerRequest, HandlerResponse, HeaderVec, MAX_INLINE_HEADERS,
};
