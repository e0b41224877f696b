//! # trellis
//!
//! **trellis** is the request core of an HTTP service: a backtracking route trie, a
//! declarative validation engine and a typed error taxonomy with a responder.
//!
//! ## Overview
//!
//! The flow of a request through the crate:
//!
//! ```text
//! transport ──► Router::resolve ──► handler ──► Validations / ContentDecoder
//!                     │                 │                 │
//!                     └──── Error ◄─────┴─────────────────┘
//!                             │
//!                             ▼
//!                   Responder::render ──► status, identifier, reason, fields
//! ```
//!
//! ## Architecture
//!
//! - **[`router`]** - Pattern parsing, the segment trie and route groups. Patterns use
//!   `:name` for parameters, `*` for one segment and a trailing `**` for the rest.
//! - **[`validation`]** - Predicates, field constraints and the engine that reports
//!   every failing field at once, plus decoding of JSON, form and query input.
//! - **[`error`]** - The closed [`ErrorKind`] set, application [`DomainError`]s,
//!   optional trace capture and the [`Responder`](error::Responder).
//! - **[`dispatcher`]** - Maps handler identifiers to functions and renders failures.
//! - **[`manifest`]** - Routes and constraint sets declared in YAML, TOML or JSON.
//! - **[`config`]** / **[`logging`]** - Immutable process configuration and
//!   `tracing` setup.
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use trellis::config::Config;
//! use trellis::router::{MatchResult, Router};
//! use trellis::validation::{FieldType, Predicate, Validations};
//!
//! let config = Config::default();
//! let mut router = Router::new(&config);
//! router.get("/users/:id", "show_user").unwrap();
//! router.get("/files/**", "serve_file").unwrap();
//!
//! let MatchResult::Matched(m) = router.resolve(&Method::GET, "/files/a/b.txt") else {
//!     panic!("expected a match");
//! };
//! assert_eq!(m.catchall_joined(), "a/b.txt");
//!
//! let mut rules = Validations::new();
//! rules
//!     .add("age", FieldType::Integer, Predicate::range(18..))
//!     .add("name", FieldType::String, Predicate::not_empty());
//! let outcome = rules.validate(&json!({"age": 10, "name": ""}));
//! assert_eq!(outcome.len(), 2);
//! ```
//!
//! ## Configuration
//!
//! [`Config`](config::Config) is built once, from defaults, a file or `TRELLIS_*`
//! environment variables, and passed by reference. Nothing is read from global state
//! after startup.

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod router;
pub mod validation;

pub use error::{DomainError, Error, ErrorKind, ResultExt};

/// `Result` with the crate's [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
