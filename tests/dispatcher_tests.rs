mod common;

use common::fixtures::{demo_router, CreateUser};
use http::Method;
use serde_json::json;
use std::sync::Arc;
use trellis::config::{ByteSize, Config};
use trellis::dispatcher::{Dispatcher, HandlerResponse, HeaderVec};
use trellis::error::AccountError;
use trellis::{Error, ResultExt};

fn json_headers() -> HeaderVec {
    let mut headers = HeaderVec::new();
    headers.push((Arc::from("Content-Type"), "application/json".to_string()));
    headers
}

fn dispatcher(config: &Config) -> Dispatcher {
    let mut d = Dispatcher::new(demo_router(config), config);
    d.register_handler("hello_name", |req| {
        Ok(HandlerResponse::text(
            200,
            format!("Hello, {}!", req.param("name").unwrap_or_default()),
        ))
    });
    d.register_handler("number", |req| {
        let x: i64 = req.route.param_as("x")?;
        Ok(HandlerResponse::ok(json!({ "double": x * 2 })))
    });
    d.register_handler("show_user", |req| match req.param("id") {
        Some("0") => Err(AccountError::UserNotLoggedIn.into()),
        Some(id) => Ok(HandlerResponse::ok(json!({ "id": id }))),
        None => Err(Error::abort(http::StatusCode::BAD_REQUEST)),
    });
    d.register_handler("foo_catchall", |_| panic!("boom"));
    d.register_typed::<CreateUser, _>("create_user", |_, user| {
        Ok(HandlerResponse::json(201, json!({ "name": user.name, "age": user.age })))
    });
    d.register_handler("create_listing", |req| {
        Ok(HandlerResponse::ok(json!({ "bytes": req.body.len() })))
    });
    d.register_handler("upload", |req| {
        Ok(HandlerResponse::ok(json!({ "bytes": req.body.len() })))
    });
    d
}

#[test]
fn test_success_paths() {
    let d = dispatcher(&Config::default());

    let resp = d.dispatch(&Method::GET, "/hello/ada", HeaderVec::new(), Vec::new());
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!("Hello, ada!"));

    let resp = d.dispatch(&Method::GET, "/number/21", HeaderVec::new(), Vec::new());
    assert_eq!(resp.body, json!({ "double": 42 }));
}

#[test]
fn test_handler_errors_are_rendered() {
    let d = dispatcher(&Config::default());

    let resp = d.dispatch(&Method::GET, "/number/abc", HeaderVec::new(), Vec::new());
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body["reason"], "Invalid value for parameter 'x'");

    let resp = d.dispatch(&Method::GET, "/users/0", HeaderVec::new(), Vec::new());
    assert_eq!(resp.status, 401);
    assert_eq!(resp.body["identifier"], "user_not_logged_in");
}

#[test]
fn test_routing_failures() {
    let d = dispatcher(&Config::default());

    let resp = d.dispatch(&Method::GET, "/missing", HeaderVec::new(), Vec::new());
    assert_eq!(resp.status, 404);

    let resp = d.dispatch(&Method::DELETE, "/users/3", HeaderVec::new(), Vec::new());
    assert_eq!(resp.status, 405);
    assert_eq!(resp.header("allow"), Some("GET, PATCH, PUT"));
}

#[test]
fn test_panic_becomes_500() {
    let d = dispatcher(&Config::default());
    let resp = d.dispatch(&Method::GET, "/foo/a/b/c/d", HeaderVec::new(), Vec::new());
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body["identifier"], "internal_error");
    assert!(!resp.body.to_string().contains("boom"));
}

#[test]
fn test_server_errors_carry_traces() {
    let mut d = dispatcher(&Config::default());
    d.register_handler("foo", |_| {
        std::fs::read_to_string("/definitely/not/here").or_internal()?;
        Ok(HandlerResponse::ok(json!({})))
    });

    let err = d
        .try_dispatch(&Method::GET, "/foo", HeaderVec::new(), Vec::new())
        .unwrap_err();
    assert_eq!(err.identifier(), "internal_error");
    assert!(err.trace().is_some());

    let err = d
        .try_dispatch(&Method::GET, "/foo/a/b/c/d", HeaderVec::new(), Vec::new())
        .unwrap_err();
    assert_eq!(err.identifier(), "internal_error");
    assert!(err.trace().is_some());

    let err = d
        .try_dispatch(&Method::POST, "/validating", json_headers(), b"{}".to_vec())
        .unwrap_err();
    assert_eq!(err.identifier(), "validation_failed");
    assert!(err.trace().is_some());

    let quiet = dispatcher(&Config::default().without_traces());
    let err = quiet
        .try_dispatch(&Method::GET, "/foo/a/b/c/d", HeaderVec::new(), Vec::new())
        .unwrap_err();
    assert!(err.trace().is_none());
}

#[test]
fn test_missing_handler() {
    let d = dispatcher(&Config::default());
    let missing = d.unregistered_handlers();
    assert!(missing.iter().any(|h| &**h == "root"));
    assert!(!missing.iter().any(|h| &**h == "hello_name"));

    let resp = d.dispatch(&Method::GET, "/", HeaderVec::new(), Vec::new());
    assert_eq!(resp.status, 500);
}

#[test]
fn test_typed_handler_validates_body() {
    let d = dispatcher(&Config::default());

    let body = br#"{"name": "Ada", "username": "ada99", "age": 36, "email": "ada@example.com"}"#;
    let resp = d.dispatch(&Method::POST, "/validating", json_headers(), body.to_vec());
    assert_eq!(resp.status, 201);
    assert_eq!(resp.body, json!({ "name": "Ada", "age": 36 }));

    let body = br#"{"name": "", "username": "ada99", "age": 3, "email": "ada@example.com"}"#;
    let resp = d.dispatch(&Method::POST, "/validating", json_headers(), body.to_vec());
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body["fields"]["name"], json!(["is empty"]));
    assert_eq!(resp.body["fields"]["age"], json!(["is less than minimum of 18"]));

    let resp = d.dispatch(&Method::POST, "/validating", HeaderVec::new(), b"{}".to_vec());
    assert_eq!(resp.status, 415);
}

#[test]
fn test_route_body_strategies() {
    let config = Config::default().with_max_body_size(ByteSize(4));
    let d = dispatcher(&config);

    // Listings collect up to 1mb regardless of the process default.
    let resp = d.dispatch(&Method::POST, "/listings", HeaderVec::new(), vec![b'x'; 1024]);
    assert_eq!(resp.status, 200);
    let resp = d.dispatch(
        &Method::POST,
        "/listings",
        HeaderVec::new(),
        vec![b'x'; 1024 * 1024 + 1],
    );
    assert_eq!(resp.status, 413);

    // Streamed uploads are never limited.
    let resp = d.dispatch(&Method::POST, "/upload", HeaderVec::new(), vec![b'x'; 4096]);
    assert_eq!(resp.status, 200);

    // Default routes fall back to the process limit.
    let resp = d.dispatch(&Method::POST, "/validating", json_headers(), b"{\"a\": 1}".to_vec());
    assert_eq!(resp.status, 413);
}
