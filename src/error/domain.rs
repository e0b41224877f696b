//! Application-defined failures.
//!
//! Applications describe their own failures as closed enums and implement
//! [`DomainError`] on them. Each variant maps to a fixed [`ErrorDescriptor`] (status,
//! stable identifier, reason template); [`DomainError::arguments`] supplies the values
//! interpolated into the template.

use http::StatusCode;
use std::fmt;

/// Fixed rendering facts for one error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDescriptor {
    /// Default protocol status
    pub status: StatusCode,
    /// Stable machine-readable identifier, e.g. `user_not_logged_in`
    pub identifier: &'static str,
    /// Human-readable reason with `{name}` placeholders
    pub reason_template: &'static str,
}

impl ErrorDescriptor {
    #[must_use]
    pub const fn new(
        status: StatusCode,
        identifier: &'static str,
        reason_template: &'static str,
    ) -> Self {
        Self {
            status,
            identifier,
            reason_template,
        }
    }

    /// Fill the reason template with `arguments`.
    #[must_use]
    pub fn interpolate(&self, arguments: &[(&str, String)]) -> String {
        interpolate(self.reason_template, arguments)
    }
}

/// Replace each `{name}` in `template` with the matching argument.
///
/// Placeholders without a matching argument are left untouched.
pub fn interpolate(template: &str, arguments: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match arguments.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// A failure owned by the application rather than by routing or validation.
pub trait DomainError: fmt::Debug + Send + Sync + 'static {
    /// Lookup-table entry for this variant.
    fn descriptor(&self) -> ErrorDescriptor;

    /// Values interpolated into the reason template.
    fn arguments(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Status override. Defaults to the descriptor's status.
    fn status(&self) -> StatusCode {
        self.descriptor().status
    }

    /// Rendered reason.
    fn reason(&self) -> String {
        self.descriptor().interpolate(&self.arguments())
    }
}

/// Account failures used by the bundled demo handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// No authenticated user on the request
    UserNotLoggedIn,
    /// Supplied email address failed the format check
    InvalidEmail(String),
}

const USER_NOT_LOGGED_IN: ErrorDescriptor = ErrorDescriptor::new(
    StatusCode::UNAUTHORIZED,
    "user_not_logged_in",
    "User is not logged in.",
);

const INVALID_EMAIL: ErrorDescriptor = ErrorDescriptor::new(
    StatusCode::BAD_REQUEST,
    "invalid_email",
    "Email address is not valid {email}.",
);

impl DomainError for AccountError {
    fn descriptor(&self) -> ErrorDescriptor {
        match self {
            AccountError::UserNotLoggedIn => USER_NOT_LOGGED_IN,
            AccountError::InvalidEmail(_) => INVALID_EMAIL,
        }
    }

    fn arguments(&self) -> Vec<(&'static str, String)> {
        match self {
            AccountError::UserNotLoggedIn => Vec::new(),
            AccountError::InvalidEmail(email) => vec![("email", email.clone())],
        }
    }
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

impl std::error::Error for AccountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_known_and_unknown() {
        let args = [("email", "a@b".to_string())];
        assert_eq!(interpolate("bad {email}!", &args), "bad a@b!");
        assert_eq!(interpolate("keep {other}", &args), "keep {other}");
        assert_eq!(interpolate("open { brace", &args), "open { brace");
    }

    #[test]
    fn test_account_error_reasons() {
        assert_eq!(
            AccountError::UserNotLoggedIn.reason(),
            "User is not logged in."
        );
        assert_eq!(AccountError::UserNotLoggedIn.status(), StatusCode::UNAUTHORIZED);
        let err = AccountError::InvalidEmail("nope".into());
        assert_eq!(err.reason(), "Email address is not valid nope.");
        assert_eq!(err.descriptor().identifier, "invalid_email");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
