//! # Router Module
//!
//! Resolves `(method, path)` pairs to registered routes.
//!
//! ## Architecture
//!
//! 1. **Registration**: at startup, patterns such as `/users/:id` or `/files/**` are
//!    parsed into [`PatternToken`]s and inserted into a segment trie. Conflicting
//!    registrations fail immediately.
//!
//! 2. **Matching**: each request path is split into segments and walked through the
//!    trie with backtracking. Precedence at every level is constant, then parameter,
//!    then wildcard, then catchall.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use trellis::router::{MatchResult, Router};
//!
//! let mut router = Router::default();
//! router.get("/foo/:bar/:baz", "foo_params").unwrap();
//!
//! let MatchResult::Matched(m) = router.resolve(&Method::GET, "/foo/1/2") else {
//!     panic!("expected a match");
//! };
//! assert_eq!(m.handler(), "foo_params");
//! assert_eq!(m.param("bar"), Some("1"));
//! assert_eq!(m.param("baz"), Some("2"));
//! ```

mod core;
mod group;
mod pattern;
mod segment;
mod trie;

pub use core::{
    BodyStrategy, MatchResult, ParamVec, Route, RouteMatch, RouteTable, Router, MAX_INLINE_PARAMS,
};
pub use group::RouteGroup;
pub use pattern::{split_path, PathSegments, RoutePattern};
pub use segment::{PatternToken, SegmentMatch};
