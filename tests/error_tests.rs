use http::{Method, StatusCode};
use serde_json::json;
use trellis::config::Config;
use trellis::error::{
    AccountError, DomainError, ErrorDescriptor, ErrorKind, Responder, TraceCapture,
};
use trellis::router::Router;
use trellis::validation::{FieldType, Predicate, Validations};
use trellis::{Error, ResultExt};

#[derive(Debug)]
enum BillingError {
    CardDeclined { last4: String },
}

impl DomainError for BillingError {
    fn descriptor(&self) -> ErrorDescriptor {
        match self {
            BillingError::CardDeclined { .. } => ErrorDescriptor::new(
                StatusCode::PAYMENT_REQUIRED,
                "card_declined",
                "Card ending in {last4} was declined.",
            ),
        }
    }

    fn arguments(&self) -> Vec<(&'static str, String)> {
        match self {
            BillingError::CardDeclined { last4 } => vec![("last4", last4.clone())],
        }
    }
}

#[test]
fn test_account_errors() {
    let responder = Responder::default();

    let rendered = responder.render(&AccountError::UserNotLoggedIn.into());
    assert_eq!(rendered.status, StatusCode::UNAUTHORIZED);
    assert_eq!(rendered.reason, "User is not logged in.");

    let rendered = responder.render(&AccountError::InvalidEmail("bob@".into()).into());
    assert_eq!(rendered.status, StatusCode::BAD_REQUEST);
    assert_eq!(rendered.identifier, "invalid_email");
    assert_eq!(rendered.reason, "Email address is not valid bob@.");
}

#[test]
fn test_application_domain_error() {
    let err = Error::domain(BillingError::CardDeclined {
        last4: "4242".into(),
    });
    assert!(matches!(err.kind(), ErrorKind::Domain(_)));
    let rendered = Responder::default().render(&err);
    assert_eq!(rendered.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(
        rendered.body(),
        json!({
            "error": true,
            "identifier": "card_declined",
            "reason": "Card ending in 4242 was declined.",
        })
    );
}

#[test]
fn test_validation_renders_field_map() {
    let mut v = Validations::new();
    v.add("age", FieldType::Integer, Predicate::range(18..))
        .add("name", FieldType::String, Predicate::not_empty());
    let err = v.check(&json!({"age": 10, "name": ""})).unwrap_err();

    let body = Responder::default().render(&err).body();
    assert_eq!(body["identifier"], "validation_failed");
    assert_eq!(body["fields"]["age"], json!(["is less than minimum of 18"]));
    assert_eq!(body["fields"]["name"], json!(["is empty"]));
}

#[test]
fn test_routing_errors() {
    let mut router = Router::default();
    router.get("/users/:id", "show_user").unwrap();
    let responder = Responder::default();

    let rendered = responder.render(&router.route(&Method::GET, "/nowhere").unwrap_err());
    assert_eq!(rendered.status, StatusCode::NOT_FOUND);
    assert_eq!(rendered.reason, "Not Found");

    let rendered = responder.render(&router.route(&Method::POST, "/users/1").unwrap_err());
    assert_eq!(rendered.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(rendered.header("allow"), Some("GET"));
    assert!(!rendered.reason.contains(":id"));
}

#[test]
fn test_internal_errors_do_not_leak() {
    let err = std::fs::read_to_string("/definitely/not/here")
        .or_internal()
        .unwrap_err();
    let rendered = Responder::default().render(&err);
    assert_eq!(rendered.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(rendered.identifier, "internal_error");
    let body = rendered.body().to_string();
    assert!(!body.contains("/definitely/not/here"));
}

#[test]
fn test_trace_does_not_change_identity() {
    let with = Error::captured(ErrorKind::NoMatch, TraceCapture::Enabled);
    let without = Error::captured(ErrorKind::NoMatch, TraceCapture::Disabled);
    assert!(with.trace().is_some());
    assert!(without.trace().is_none());
    assert_eq!(with.status(), without.status());
    assert_eq!(with.identifier(), without.identifier());
    assert_eq!(with.reason(), without.reason());

    let rendered = Responder::new(&Config::default()).render(&with);
    assert!(rendered.trace.is_some());
    assert!(rendered.body().get("trace").is_none());
}

#[test]
fn test_origin_points_at_constructor_caller() {
    let err = Error::abort(StatusCode::FORBIDDEN);
    assert!(err.origin().file.ends_with("error_tests.rs"));
    assert_eq!(err.identifier(), "forbidden");
}
