//! Request-body field parsing.
//!
//! Every meme field in a request body is classified as absent, invalid or present
//! before any service logic runs, so create and update share one set of rules.

use serde_json::{Map, Value};
use std::num::IntErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput<T> {
    Absent,
    Invalid,
    Present(T),
}

impl<T> FieldInput<T> {
    pub fn present(self) -> Option<T> {
        match self {
            FieldInput::Present(v) => Some(v),
            _ => None,
        }
    }
}

/// Classified `title`, `url` and `userId` fields of a meme request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemeFields {
    pub title: FieldInput<String>,
    pub url: FieldInput<String>,
    pub user_id: FieldInput<i64>,
}

impl MemeFields {
    pub fn from_body(body: &Map<String, Value>) -> Self {
        Self {
            title: text_field(body.get("title")),
            url: text_field(body.get("url")),
            user_id: integer_field(body.get("userId")),
        }
    }
}

/// Strings are trimmed; blank strings and non-string values are invalid.
fn text_field(value: Option<&Value>) -> FieldInput<String> {
    match value {
        None => FieldInput::Absent,
        Some(Value::String(s)) => {
            let trimmed = trim_text(s);
            if trimmed.is_empty() {
                FieldInput::Invalid
            } else {
                FieldInput::Present(trimmed.to_string())
            }
        }
        Some(_) => FieldInput::Invalid,
    }
}

/// Whitespace trim that also strips the byte-order mark.
fn trim_text(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

/// Accepts JSON integers, integral floats and strings holding an integer.
fn integer_field(value: Option<&Value>) -> FieldInput<i64> {
    match value {
        None => FieldInput::Absent,
        Some(v) => parse_integer(v).map_or(FieldInput::Invalid, FieldInput::Present),
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        // Float-to-int casts saturate, like out-of-range integer strings below
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => parse_id(s),
        _ => None,
    }
}

/// Parses a path or body identifier. Surrounding whitespace is tolerated,
/// anything else that is not a plain integer is rejected.
///
/// Integers outside the `i64` range saturate to `i64::MAX` / `i64::MIN`. They are
/// well-formed but no stored record carries them, so lookups report not-found.
pub fn parse_id(raw: &str) -> Option<i64> {
    match trim_text(raw).parse::<i64>() {
        Ok(id) => Some(id),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> MemeFields {
        MemeFields::from_body(v.as_object().unwrap())
    }

    #[test]
    fn test_absent_fields() {
        let f = fields(json!({}));
        assert_eq!(f.title, FieldInput::Absent);
        assert_eq!(f.url, FieldInput::Absent);
        assert_eq!(f.user_id, FieldInput::Absent);
    }

    #[test]
    fn test_strings_are_trimmed() {
        let f = fields(json!({ "title": "  Doge ", "url": "\thttps://x/doge.jpg\n" }));
        assert_eq!(f.title, FieldInput::Present("Doge".to_string()));
        assert_eq!(f.url, FieldInput::Present("https://x/doge.jpg".to_string()));
    }

    #[test]
    fn test_blank_and_non_string_text_is_invalid() {
        let f = fields(json!({ "title": "   ", "url": 42 }));
        assert_eq!(f.title, FieldInput::Invalid);
        assert_eq!(f.url, FieldInput::Invalid);

        let f = fields(json!({ "title": null }));
        assert_eq!(f.title, FieldInput::Invalid);
    }

    #[test]
    fn test_byte_order_mark_counts_as_whitespace() {
        let f = fields(json!({ "title": "\u{FEFF}", "url": "\u{FEFF} https://x/a.jpg \u{FEFF}" }));
        assert_eq!(f.title, FieldInput::Invalid);
        assert_eq!(f.url, FieldInput::Present("https://x/a.jpg".to_string()));
    }

    #[test]
    fn test_user_id_forms() {
        assert_eq!(fields(json!({ "userId": 7 })).user_id, FieldInput::Present(7));
        assert_eq!(fields(json!({ "userId": "7" })).user_id, FieldInput::Present(7));
        assert_eq!(fields(json!({ "userId": 7.0 })).user_id, FieldInput::Present(7));
        assert_eq!(fields(json!({ "userId": 7.5 })).user_id, FieldInput::Invalid);
        assert_eq!(fields(json!({ "userId": "abc" })).user_id, FieldInput::Invalid);
        assert_eq!(fields(json!({ "userId": true })).user_id, FieldInput::Invalid);
    }

    #[test]
    fn test_out_of_range_user_id_saturates() {
        assert_eq!(
            fields(json!({ "userId": "99999999999999999999" })).user_id,
            FieldInput::Present(i64::MAX)
        );
        assert_eq!(fields(json!({ "userId": 1e20 })).user_id, FieldInput::Present(i64::MAX));
        assert_eq!(
            fields(json!({ "userId": u64::MAX })).user_id,
            FieldInput::Present(i64::MAX)
        );
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12"), Some(12));
        assert_eq!(parse_id(" 3 "), Some(3));
        assert_eq!(parse_id("-4"), Some(-4));
        assert_eq!(parse_id("99999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_id("-99999999999999999999"), Some(i64::MIN));
        assert_eq!(parse_id("12abc"), None);
        assert_eq!(parse_id("1.5"), None);
        assert_eq!(parse_id(""), None);
    }
}
