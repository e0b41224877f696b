//! Rendering errors for the transport.
//!
//! The responder turns an [`Error`] into a [`Rendered`] value: status, identifier,
//! client-facing reason, per-field failures for validation errors and the headers a
//! status requires. The trace travels alongside for logging and never reaches the body.

use super::{Error, ErrorKind, Trace, TraceCapture};
use crate::config::Config;
use crate::validation::ValidationOutcome;
use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

/// Wire-ready form of an error.
#[derive(Debug, Clone, Serialize)]
pub struct Rendered {
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusCode,
    pub identifier: &'static str,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationOutcome>,
    #[serde(skip)]
    pub headers: Vec<(&'static str, String)>,
    #[serde(skip)]
    pub trace: Option<Trace>,
}

fn serialize_status<S: serde::Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

impl Rendered {
    /// JSON response body.
    ///
    /// ```json
    /// {"error": true, "identifier": "validation_failed", "reason": "...", "fields": {"age": ["..."]}}
    /// ```
    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = json!({
            "error": true,
            "identifier": self.identifier,
            "reason": self.reason,
        });
        if let (Some(fields), Some(map)) = (&self.fields, body.as_object_mut()) {
            map.insert(
                "fields".to_string(),
                serde_json::to_value(fields).unwrap_or(Value::Null),
            );
        }
        body
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Stateless error renderer configured once at startup.
#[derive(Debug, Clone, Copy)]
pub struct Responder {
    trace_capture: TraceCapture,
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Responder {
    pub fn new(config: &Config) -> Self {
        Self {
            trace_capture: config.trace_capture,
        }
    }

    /// Render `err` and log it: server errors at `error` with origin and trace,
    /// client errors at `debug`.
    pub fn render(&self, err: &Error) -> Rendered {
        let status = err.status();
        let trace = if self.trace_capture.is_enabled() {
            err.trace().cloned()
        } else {
            None
        };

        if status.is_server_error() {
            error!(
                status = status.as_u16(),
                identifier = err.identifier(),
                origin = %err.origin(),
                error = %err,
                trace = %trace.as_ref().map(ToString::to_string).unwrap_or_default(),
                "Request failed"
            );
        } else {
            debug!(
                status = status.as_u16(),
                identifier = err.identifier(),
                origin = %err.origin(),
                reason = %err.reason(),
                "Request rejected"
            );
        }

        let mut headers = Vec::new();
        if let ErrorKind::MethodNotAllowed { allowed } = err.kind() {
            let allow = allowed
                .iter()
                .map(http::Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            headers.push(("allow", allow));
        }

        Rendered {
            status,
            identifier: err.identifier(),
            reason: err.reason(),
            fields: err.field_errors().cloned(),
            headers,
            trace,
        }
    }
}
