mod common;

use common::fixtures::{demo_manifest_path, Color, CreateUser};
use serde_json::json;
use trellis::config::{ByteSize, Config};
use trellis::manifest::load_manifest;
use trellis::validation::{
    ContentDecoder, FieldType, Predicate, Validatable, ValidationRegistry, Validations,
};

#[test]
fn test_validation_never_short_circuits() {
    let mut v = Validations::new();
    v.add("age", FieldType::Integer, Predicate::range(18..))
        .add("name", FieldType::String, Predicate::not_empty());

    let outcome = v.validate(&json!({"age": 10, "name": ""}));
    assert!(outcome.get("age").is_some());
    assert!(outcome.get("name").is_some());
    assert_eq!(outcome.len(), 2);
}

#[test]
fn test_create_user_reports_every_field() {
    let err = CreateUser::decode(json!({
        "name": "",
        "username": "a!",
        "age": 10,
        "email": "nope",
        "favorite_color": "pink",
    }))
    .unwrap_err();

    let fields = err.field_errors().unwrap();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields.get("name").unwrap(), ["is empty".to_string()]);
    assert_eq!(
        fields.get("age").unwrap(),
        ["is less than minimum of 18".to_string()]
    );
    assert_eq!(
        fields.get("email").unwrap(),
        ["is not a valid email address".to_string()]
    );
    let username = &fields.get("username").unwrap()[0];
    assert!(username.contains("less than minimum of 3 character"), "{username}");
    assert!(username.contains(" and "), "{username}");
    assert_eq!(
        fields.get("favorite_color").unwrap(),
        ["is not null and is not red, blue, or green".to_string()]
    );
}

#[test]
fn test_create_user_accepts_null_or_missing_color() {
    let base = json!({
        "name": "  Ada ",
        "username": "ada99",
        "age": 36,
        "email": "ada@example.com",
    });
    let user = CreateUser::decode(base.clone()).unwrap();
    assert_eq!(user.favorite_color, None);
    assert_eq!(user.name, "Ada");

    let mut with_null = base.clone();
    with_null["favorite_color"] = json!(null);
    assert!(CreateUser::decode(with_null).is_ok());

    let mut with_blue = base;
    with_blue["favorite_color"] = json!("blue");
    assert_eq!(
        CreateUser::decode(with_blue).unwrap().favorite_color,
        Some(Color::Blue)
    );
}

#[test]
fn test_form_body_is_coerced_before_validation() {
    let decoder = ContentDecoder::new(&Config::default());
    let user: CreateUser = decoder
        .content(
            Some("application/x-www-form-urlencoded"),
            b"name=Ada&username=ada99&age=36&email=ada%40example.com",
        )
        .unwrap();
    assert_eq!(user.age, 36);
    assert_eq!(user.email, "ada@example.com");

    let err = decoder
        .form::<CreateUser>(b"name=Ada&username=ada99&age=old&email=ada%40example.com")
        .unwrap_err();
    assert_eq!(
        err.field_errors().unwrap().get("age").unwrap(),
        ["is not an integer".to_string()]
    );
}

#[test]
fn test_query_decoding() {
    let decoder = ContentDecoder::default();
    let user: CreateUser = decoder
        .query("?name=Ada&username=ada99&age=20&email=a%40b.io&favorite_color=green")
        .unwrap();
    assert_eq!(user.favorite_color, Some(Color::Green));
}

#[test]
fn test_body_limit_and_media_type() {
    let config = Config::default().with_max_body_size(ByteSize(8));
    let decoder = ContentDecoder::new(&config);
    let err = decoder
        .json::<CreateUser>(br#"{"name": "far too long"}"#)
        .unwrap_err();
    assert_eq!(err.status(), http::StatusCode::PAYLOAD_TOO_LARGE);

    let err = ContentDecoder::default()
        .content::<CreateUser>(Some("text/csv"), b"a,b")
        .unwrap_err();
    assert_eq!(err.status(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[test]
fn test_manifest_set_matches_code_set() {
    let manifest = load_manifest(&demo_manifest_path()).unwrap();
    let from_manifest = manifest.build_registry();
    let mut registry = ValidationRegistry::new();
    let from_code = registry.register::<CreateUser>();

    let input = json!({"name": "", "username": "ab", "age": 10, "email": "x"});
    let a = from_manifest.get("create_user").unwrap().validate(&input);
    let b = from_code.validate(&input);
    assert_eq!(a, b);
}
