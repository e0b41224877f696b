//! Turning raw request content into validated values.
//!
//! JSON bodies are parsed as-is. Form bodies and query strings arrive as text, so
//! each value is coerced using the declared [`FieldType`] of its field before the
//! constraints run. Keys such as `address.city` build nested objects.

use super::constraint::FieldType;
use super::engine::{Validatable, Validations};
use crate::config::{ByteSize, Config};
use crate::error::{Error, TraceCapture};
use serde_json::{Map, Value};
use tracing::debug;

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Decodes request content, enforcing a body size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentDecoder {
    max_body_size: ByteSize,
    trace_capture: TraceCapture,
}

impl Default for ContentDecoder {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl ContentDecoder {
    pub fn new(config: &Config) -> Self {
        Self {
            max_body_size: config.max_body_size,
            trace_capture: config.trace_capture,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: ByteSize) -> Self {
        self.max_body_size = limit;
        self
    }

    #[must_use]
    pub fn limit(&self) -> ByteSize {
        self.max_body_size
    }

    #[track_caller]
    pub fn check_size(&self, body: &[u8]) -> Result<(), Error> {
        if self.max_body_size.admits(body.len()) {
            Ok(())
        } else {
            debug!(
                size = body.len(),
                limit = %self.max_body_size,
                "Request body over limit"
            );
            Err(Error::payload_too_large(self.max_body_size).with_trace(self.trace_capture))
        }
    }

    /// Parse a JSON body without validating it.
    #[track_caller]
    pub fn json_value(&self, body: &[u8]) -> Result<Value, Error> {
        self.check_size(body)?;
        serde_json::from_slice(body).map_err(|e| Error::decode(e).with_trace(self.trace_capture))
    }

    #[track_caller]
    pub fn json<T: Validatable>(&self, body: &[u8]) -> Result<T, Error> {
        let value = self.json_value(body)?;
        self.traced(T::decode(value))
    }

    /// Decode an `application/x-www-form-urlencoded` body.
    #[track_caller]
    pub fn form<T: Validatable>(&self, body: &[u8]) -> Result<T, Error> {
        self.check_size(body)?;
        self.traced(T::decode(form_value(body, &T::validations())))
    }

    /// Decode a query string. A leading `?` is ignored.
    #[track_caller]
    pub fn query<T: Validatable>(&self, query: &str) -> Result<T, Error> {
        let query = query.strip_prefix('?').unwrap_or(query);
        self.traced(T::decode(form_value(query.as_bytes(), &T::validations())))
    }

    /// Pick a decoder from the `Content-Type` header.
    ///
    /// `application/json` and any `+json` suffix decode as JSON; form encoding
    /// decodes as a form. Anything else, or no header, is rejected with 415.
    #[track_caller]
    pub fn content<T: Validatable>(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<T, Error> {
        let Some(content_type) = content_type else {
            return Err(Error::unsupported_media_type("none").with_trace(self.trace_capture));
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == JSON || essence.ends_with("+json") {
            self.json(body)
        } else if essence == FORM {
            self.form(body)
        } else {
            Err(Error::unsupported_media_type(content_type).with_trace(self.trace_capture))
        }
    }

    fn traced<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        result.map_err(|e| e.with_trace(self.trace_capture))
    }
}

/// Build a JSON object from form-encoded pairs.
///
/// Repeated keys collect into an array for array fields; otherwise the last one wins.
pub(crate) fn form_value(encoded: &[u8], validations: &Validations) -> Value {
    let mut root = Map::new();
    for (key, raw) in url::form_urlencoded::parse(encoded) {
        let ty = validations.field_type(&key).unwrap_or(FieldType::String);
        insert_path(&mut root, &key, ty, &raw);
    }
    Value::Object(root)
}

fn insert_path(root: &mut Map<String, Value>, key: &str, ty: FieldType, raw: &str) {
    let mut parts = key.split('.').peekable();
    let mut current = root;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            if ty == FieldType::Array {
                if let Some(Value::Array(items)) = current.get_mut(part) {
                    items.push(Value::String(raw.to_string()));
                    return;
                }
            }
            current.insert(part.to_string(), ty.coerce(raw));
            return;
        }
        let slot = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Predicate;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Search {
        term: String,
        page: i64,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl Validatable for Search {
        fn validations() -> Validations {
            let mut v = Validations::new();
            v.add("term", FieldType::String, Predicate::not_empty())
                .add("page", FieldType::Integer, Predicate::range(1..));
            v.push(
                crate::validation::FieldConstraint::new("tags", FieldType::Array, Predicate::Valid)
                    .optional(),
            );
            v
        }
    }

    #[test]
    fn test_query_coerces_declared_types() {
        let decoder = ContentDecoder::default();
        let search: Search = decoder.query("?term=rust&page=2&tags=a&tags=b").unwrap();
        assert_eq!(search.term, "rust");
        assert_eq!(search.page, 2);
        assert_eq!(search.tags, ["a", "b"]);
    }

    #[test]
    fn test_query_reports_all_failures() {
        let err = ContentDecoder::default()
            .query::<Search>("term=&page=zero")
            .unwrap_err();
        let fields = err.field_errors().unwrap();
        assert_eq!(fields.get("term").unwrap(), ["is empty".to_string()]);
        assert_eq!(fields.get("page").unwrap(), ["is not an integer".to_string()]);
    }

    #[test]
    fn test_dotted_keys_nest() {
        let value = form_value(b"address.city=Oslo&address.zip=0150", &Validations::new());
        assert_eq!(value, json!({"address": {"city": "Oslo", "zip": "0150"}}));
    }

    #[test]
    fn test_size_limit() {
        let decoder = ContentDecoder::default().with_limit(ByteSize(4));
        let err = decoder.json_value(b"[1, 2, 3]").unwrap_err();
        assert_eq!(err.status(), http::StatusCode::PAYLOAD_TOO_LARGE);
        assert!(decoder.json_value(b"[1]").is_ok());
    }

    #[test]
    fn test_content_type_dispatch() {
        let decoder = ContentDecoder::default();
        let body = br#"{"term": "x", "page": 1}"#;
        assert!(decoder
            .content::<Search>(Some("application/json; charset=utf-8"), body)
            .is_ok());
        assert!(decoder
            .content::<Search>(Some("application/vnd.api+json"), body)
            .is_ok());
        assert!(decoder
            .content::<Search>(Some("application/x-www-form-urlencoded"), b"term=x&page=1")
            .is_ok());

        let err = decoder.content::<Search>(Some("text/plain"), body).unwrap_err();
        assert_eq!(err.identifier(), "unsupported_media_type");
        let err = decoder.content::<Search>(None, body).unwrap_err();
        assert_eq!(err.reason(), "Unsupported content type 'none'.");
    }

    #[test]
    fn test_malformed_json() {
        let err = ContentDecoder::default().json::<Search>(b"{").unwrap_err();
        assert_eq!(err.identifier(), "malformed_content");
    }
}
