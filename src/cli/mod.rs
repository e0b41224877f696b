//! # CLI Module
//!
//! Command-line surface of the `trellis` binary.
//!
//! ## Commands
//!
//! ```bash
//! # Print the route table
//! trellis routes --manifest demos/routes.yaml
//!
//! # Resolve a request; exits 1 when nothing matches
//! trellis resolve --manifest demos/routes.yaml GET /foo/1/2
//!
//! # Validate a document against a constraint set; exits 1 when it fails
//! trellis validate --manifest demos/routes.yaml --set create_user '{"age": 10}'
//! ```
//!
//! Global flags `--config`, `--case-insensitive` and `--log-level` apply to every
//! command.

mod commands;


pub use commands::{run_cli, Cli, Commands};
