use crate::config::Config;
use crate::error::Responder;
use crate::manifest::load_manifest;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;

/// Command-line interface for trellis
///
/// Inspects route manifests: lists routes, resolves requests and validates
/// documents against declared constraint sets.
#[derive(Debug, Parser)]
#[command(name = "trellis")]
#[command(about = "Route trie and validation toolkit", long_about = None, version)]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON); defaults come from the environment
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Compare constant path segments case-insensitively
    #[arg(long, global = true, default_value_t = false)]
    pub case_insensitive: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TRELLIS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the route table of a manifest
    Routes {
        /// Route manifest (YAML, TOML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Resolve a request against a manifest and print the result as JSON
    Resolve {
        #[arg(short, long)]
        manifest: PathBuf,

        /// HTTP method, e.g. GET
        method: String,

        /// Request path, e.g. /users/42
        path: String,
    },
    /// Validate a JSON document against a named constraint set
    Validate {
        #[arg(short, long)]
        manifest: PathBuf,

        /// Name of the constraint set in the manifest
        #[arg(short, long)]
        set: String,

        /// JSON document to validate
        document: String,
    },
}

impl Cli {
    /// Build the process configuration from `--config` or the environment, then
    /// apply command-line overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::from_env(),
        };
        if self.case_insensitive {
            config = config.case_insensitive();
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        Ok(config)
    }
}

/// Execute `cli`, writing results to `out`.
///
/// Returns `Ok(true)` when the command succeeded: a request resolved, or a document
/// passed validation.
///
/// # Errors
///
/// Returns an error if the configuration or manifest cannot be loaded, the
/// manifest's routes conflict, or the arguments are malformed.
pub fn run_cli(cli: &Cli, config: &Config, out: &mut impl Write) -> Result<bool> {
    match &cli.command {
        Commands::Routes { manifest } => {
            let router = load_manifest(manifest)?.build_router(config)?;
            write!(out, "{}", router.table())?;
            Ok(true)
        }
        Commands::Resolve {
            manifest,
            method,
            path,
        } => {
            let router = load_manifest(manifest)?.build_router(config)?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method '{method}'"))?;
            let (report, matched) = match router.route(&method, path) {
                Ok(m) => (
                    json!({
                        "matched": true,
                        "handler": m.handler(),
                        "pattern": m.route.pattern.to_string(),
                        "params": m.params_map(),
                        "catchall": m.catchall(),
                    }),
                    true,
                ),
                Err(err) => {
                    let rendered = Responder::new(config).render(&err);
                    let mut body = rendered.body();
                    if let Value::Object(map) = &mut body {
                        map.insert("matched".into(), Value::Bool(false));
                        map.insert("status".into(), rendered.status.as_u16().into());
                        if let Some(allow) = rendered.header("allow") {
                            map.insert("allow".into(), allow.into());
                        }
                    }
                    (body, false)
                }
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            Ok(matched)
        }
        Commands::Validate {
            manifest,
            set,
            document,
        } => {
            let registry = load_manifest(manifest)?.build_registry();
            let validations = registry
                .get(set)
                .with_context(|| format!("Unknown validation set '{set}'"))?;
            let document: Value =
                serde_json::from_str(document).context("Document is not valid JSON")?;
            let outcome = validations.validate(&document);
            let report = json!({
                "valid": outcome.is_valid(),
                "fields": outcome,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            Ok(report["valid"].as_bool().unwrap_or(false))
        }
    }
}
