//! # Error taxonomy
//!
//! Every failure the crate produces is an [`Error`]: a closed [`ErrorKind`] plus the
//! call site that built it and, when trace capture is enabled, a [`Trace`].
//!
//! Each kind maps through [`ErrorKind::descriptor`] to a fixed status, a stable
//! identifier and a reason template. Application failures plug in through the
//! [`DomainError`] trait and travel as [`ErrorKind::Domain`].
//!
//! | Kind | Status | Identifier |
//! |------|--------|------------|
//! | `InvalidPattern` | 500 | `invalid_route_pattern` |
//! | `RouteConflict` | 500 | `route_conflict` |
//! | `NoMatch` | 404 | `not_found` |
//! | `MethodNotAllowed` | 405 | `method_not_allowed` |
//! | `ValidationFailed` | 400 | `validation_failed` |
//! | `Decode` | 400 | `malformed_content` |
//! | `PayloadTooLarge` | 413 | `payload_too_large` |
//! | `UnsupportedMediaType` | 415 | `unsupported_media_type` |
//! | `Abort` | any | derived from the status |
//! | `Domain` | declared by the domain error | declared by the domain error |
//! | `Internal` | 500 | `internal_error` |

mod domain;
mod responder;
mod trace;

pub use domain::{interpolate, AccountError, DomainError, ErrorDescriptor};
pub use responder::{Rendered, Responder};
pub use trace::{CallSite, Frame, Trace, TraceCapture};

use crate::config::ByteSize;
use crate::validation::ValidationOutcome;
use http::{Method, StatusCode};
use std::fmt;

/// Closed set of failure kinds.
#[derive(Debug)]
pub enum ErrorKind {
    /// A route pattern could not be parsed
    InvalidPattern { pattern: String, reason: String },
    /// Registration would make two routes indistinguishable
    RouteConflict {
        method: Method,
        pattern: String,
        detail: String,
    },
    /// No route terminates at the requested path
    NoMatch,
    /// The path terminates at routes for other methods only
    MethodNotAllowed { allowed: Vec<Method> },
    /// One or more field constraints failed
    ValidationFailed(ValidationOutcome),
    /// Request content could not be decoded
    Decode { detail: String },
    /// Collected body exceeded its limit
    PayloadTooLarge { limit: ByteSize },
    /// No decoder for the request content type
    UnsupportedMediaType { content_type: String },
    /// Plain status failure with an optional custom reason
    Abort {
        status: StatusCode,
        reason: Option<String>,
    },
    /// Application-defined failure
    Domain(Box<dyn DomainError>),
    /// Anything unexpected; rendered without detail
    Internal(anyhow::Error),
}

const INVALID_PATTERN: ErrorDescriptor = ErrorDescriptor::new(
    StatusCode::INTERNAL_SERVER_ERROR,
    "invalid_route_pattern",
    "Invalid route pattern '{pattern}': {reason}.",
);
const ROUTE_CONFLICT: ErrorDescriptor = ErrorDescriptor::new(
    StatusCode::INTERNAL_SERVER_ERROR,
    "route_conflict",
    "Route {method} {pattern} conflicts with an existing route: {detail}.",
);
const NO_MATCH: ErrorDescriptor =
    ErrorDescriptor::new(StatusCode::NOT_FOUND, "not_found", "Not Found");
const METHOD_NOT_ALLOWED: ErrorDescriptor = ErrorDescriptor::new(
    StatusCode::METHOD_NOT_ALLOWED,
    "method_not_allowed",
    "Method Not Allowed",
);
const VALIDATION_FAILED: ErrorDescriptor =
    ErrorDescriptor::new(StatusCode::BAD_REQUEST, "validation_failed", "{fields}");
const DECODE: ErrorDescriptor = ErrorDescriptor::new(
    StatusCode::BAD_REQUEST,
    "malformed_content",
    "Could not decode request content: {detail}",
);
const PAYLOAD_TOO_LARGE: ErrorDescriptor = ErrorDescriptor::new(
    StatusCode::PAYLOAD_TOO_LARGE,
    "payload_too_large",
    "Request body exceeds the {limit} limit.",
);
const UNSUPPORTED_MEDIA_TYPE: ErrorDescriptor = ErrorDescriptor::new(
    StatusCode::UNSUPPORTED_MEDIA_TYPE,
    "unsupported_media_type",
    "Unsupported content type '{content_type}'.",
);
const INTERNAL: ErrorDescriptor = ErrorDescriptor::new(
    StatusCode::INTERNAL_SERVER_ERROR,
    "internal_error",
    "Internal Server Error",
);

impl ErrorKind {
    /// Lookup-table entry for this kind.
    ///
    /// `Abort` builds its entry from the status; `Domain` defers to the domain error.
    pub fn descriptor(&self) -> ErrorDescriptor {
        match self {
            ErrorKind::InvalidPattern { .. } => INVALID_PATTERN,
            ErrorKind::RouteConflict { .. } => ROUTE_CONFLICT,
            ErrorKind::NoMatch => NO_MATCH,
            ErrorKind::MethodNotAllowed { .. } => METHOD_NOT_ALLOWED,
            ErrorKind::ValidationFailed(_) => VALIDATION_FAILED,
            ErrorKind::Decode { .. } => DECODE,
            ErrorKind::PayloadTooLarge { .. } => PAYLOAD_TOO_LARGE,
            ErrorKind::UnsupportedMediaType { .. } => UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::Abort { status, .. } => ErrorDescriptor::new(
                *status,
                status_identifier(*status),
                status.canonical_reason().unwrap_or("Unknown Status"),
            ),
            ErrorKind::Domain(domain) => domain.descriptor(),
            ErrorKind::Internal(_) => INTERNAL,
        }
    }

    fn arguments(&self) -> Vec<(&'static str, String)> {
        match self {
            ErrorKind::InvalidPattern { pattern, reason } => {
                vec![("pattern", pattern.clone()), ("reason", reason.clone())]
            }
            ErrorKind::RouteConflict {
                method,
                pattern,
                detail,
            } => vec![
                ("method", method.to_string()),
                ("pattern", pattern.clone()),
                ("detail", detail.clone()),
            ],
            ErrorKind::ValidationFailed(outcome) => vec![("fields", outcome.to_string())],
            ErrorKind::Decode { detail } => vec![("detail", detail.clone())],
            ErrorKind::PayloadTooLarge { limit } => vec![("limit", limit.to_string())],
            ErrorKind::UnsupportedMediaType { content_type } => {
                vec![("content_type", content_type.clone())]
            }
            ErrorKind::Domain(domain) => domain.arguments(),
            ErrorKind::NoMatch
            | ErrorKind::MethodNotAllowed { .. }
            | ErrorKind::Abort { .. }
            | ErrorKind::Internal(_) => Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Domain(domain) => domain.status(),
            other => other.descriptor().status,
        }
    }

    pub fn identifier(&self) -> &'static str {
        self.descriptor().identifier
    }

    /// Client-facing reason. Never includes detail of internal failures.
    pub fn reason(&self) -> String {
        match self {
            ErrorKind::Abort {
                reason: Some(reason),
                ..
            } => reason.clone(),
            ErrorKind::Domain(domain) => domain.reason(),
            other => other.descriptor().interpolate(&other.arguments()),
        }
    }
}

/// Identifier for a bare status, used by `Abort`.
fn status_identifier(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "bad_request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not_found",
        405 => "method_not_allowed",
        408 => "request_timeout",
        409 => "conflict",
        410 => "gone",
        413 => "payload_too_large",
        415 => "unsupported_media_type",
        422 => "unprocessable_entity",
        429 => "too_many_requests",
        500 => "internal_error",
        501 => "not_implemented",
        502 => "bad_gateway",
        503 => "service_unavailable",
        504 => "gateway_timeout",
        _ if status.is_client_error() => "client_error",
        _ if status.is_server_error() => "server_error",
        _ => "http_status",
    }
}

/// A failure together with where it was built.
pub struct Error {
    kind: ErrorKind,
    origin: CallSite,
    trace: Option<Trace>,
}

impl Error {
    /// Build an error without a stack trace. The caller's location is recorded.
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            origin: CallSite::caller(),
            trace: None,
        }
    }

    /// Build an error, capturing a stack trace when `capture` is enabled.
    #[track_caller]
    pub fn captured(kind: ErrorKind, capture: TraceCapture) -> Self {
        Self::new(kind).with_trace(capture)
    }

    /// Attach a stack trace if `capture` is enabled and none is recorded yet.
    #[must_use]
    pub fn with_trace(mut self, capture: TraceCapture) -> Self {
        if capture.is_enabled() && self.trace.is_none() {
            self.trace = Some(Trace::capture());
        }
        self
    }

    #[track_caller]
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NoMatch)
    }

    #[track_caller]
    pub fn method_not_allowed(allowed: Vec<Method>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed { allowed })
    }

    #[track_caller]
    pub fn validation(outcome: ValidationOutcome) -> Self {
        Self::new(ErrorKind::ValidationFailed(outcome))
    }

    #[track_caller]
    pub fn decode(detail: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Decode {
            detail: detail.to_string(),
        })
    }

    #[track_caller]
    pub fn payload_too_large(limit: ByteSize) -> Self {
        Self::new(ErrorKind::PayloadTooLarge { limit })
    }

    #[track_caller]
    pub fn unsupported_media_type(content_type: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedMediaType {
            content_type: content_type.into(),
        })
    }

    /// Fail with `status` and its canonical reason.
    #[track_caller]
    pub fn abort(status: StatusCode) -> Self {
        Self::new(ErrorKind::Abort {
            status,
            reason: None,
        })
    }

    #[track_caller]
    pub fn abort_with(status: StatusCode, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Abort {
            status,
            reason: Some(reason.into()),
        })
    }

    #[track_caller]
    pub fn domain<D: DomainError>(error: D) -> Self {
        Self::new(ErrorKind::Domain(Box::new(error)))
    }

    #[track_caller]
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorKind::Internal(error.into()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn origin(&self) -> CallSite {
        self.origin
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn identifier(&self) -> &'static str {
        self.kind.identifier()
    }

    pub fn reason(&self) -> String {
        self.kind.reason()
    }

    /// Per-field failures when this is a validation error.
    pub fn field_errors(&self) -> Option<&ValidationOutcome> {
        match &self.kind {
            ErrorKind::ValidationFailed(outcome) => Some(outcome),
            _ => None,
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .field("trace", &self.trace.as_ref().map(Trace::len))
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Internal(inner) => {
                write!(f, "{}: {inner:#}", self.identifier())
            }
            _ => write!(f, "{}: {}", self.identifier(), self.reason()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Internal(inner) => Some(&**inner),
            _ => None,
        }
    }
}

impl From<ErrorKind> for Error {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl From<anyhow::Error> for Error {
    #[track_caller]
    fn from(error: anyhow::Error) -> Self {
        Error::internal(error)
    }
}

impl From<AccountError> for Error {
    #[track_caller]
    fn from(error: AccountError) -> Self {
        Error::domain(error)
    }
}

/// Convert foreign failures into [`ErrorKind::Internal`].
pub trait ResultExt<T> {
    fn or_internal(self) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    #[track_caller]
    fn or_internal(self) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(Error::internal(e)),
        }
    }
}
