use std::collections::HashMap;

use axum::http::HeaderMap;

use crate::error::AppError;
use crate::multipart::{self, MultipartForm};

/// Normalized request payload: whatever the client sent, reduced to flat
/// string fields (plus file attachments for multipart bodies).
#[derive(Debug)]
pub enum Payload {
    Fields(HashMap<String, String>),
    Multipart(MultipartForm),
    Empty,
}

impl Payload {
    /// Look a plain field up regardless of the body encoding.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Payload::Fields(map) => map.get(name).map(|s| s.as_str()),
            Payload::Multipart(form) => form.field(name),
            Payload::Empty => None,
        }
    }

    /// Field value with surrounding whitespace trimmed, empty if absent.
    pub fn trimmed(&self, name: &str) -> String {
        self.field(name).unwrap_or_default().trim().to_string()
    }
}

/// Decode a request body according to its declared content type.
///
/// URL-encoded and JSON bodies flatten to string fields (duplicate keys:
/// last occurrence wins; JSON scalars are stringified). Multipart bodies go
/// through the state-machine splitter. Unknown content types produce an
/// empty payload rather than an error.
pub fn parse(headers: &HeaderMap, body: &[u8]) -> Result<Payload, AppError> {
    if body.is_empty() {
        return Ok(Payload::Empty);
    }
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let mut map = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(body) {
            map.insert(k.into_owned(), v.into_owned());
        }
        Ok(Payload::Fields(map))
    } else if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| AppError::MalformedBody(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| AppError::MalformedBody("expected a JSON object".into()))?;
        let mut map = HashMap::new();
        for (k, v) in obj {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            map.insert(k.clone(), s);
        }
        Ok(Payload::Fields(map))
    } else if content_type.starts_with("multipart/form-data") {
        let boundary = boundary_param(content_type).ok_or_else(|| {
            AppError::MalformedBody("multipart content type without boundary".into())
        })?;
        Ok(Payload::Multipart(multipart::parse(body, &boundary)?))
    } else {
        Ok(Payload::Empty)
    }
}

fn boundary_param(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let param = param.trim();
        let value = param.strip_prefix("boundary=")?;
        Some(value.trim_matches('"').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).unwrap(),
        );
        h
    }

    #[test]
    fn urlencoded_last_duplicate_wins() {
        let payload = parse(
            &headers("application/x-www-form-urlencoded"),
            b"a=1&b=x%20y&a=2",
        )
        .unwrap();
        assert_eq!(payload.field("a"), Some("2"));
        assert_eq!(payload.field("b"), Some("x y"));
    }

    #[test]
    fn json_scalars_are_stringified() {
        let payload = parse(
            &headers("application/json"),
            br#"{"tipo":"lavoro","anni":3,"attivo":true,"niente":null}"#,
        )
        .unwrap();
        assert_eq!(payload.field("tipo"), Some("lavoro"));
        assert_eq!(payload.field("anni"), Some("3"));
        assert_eq!(payload.field("attivo"), Some("true"));
        assert_eq!(payload.field("niente"), None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let result = parse(&headers("application/json"), b"{not json");
        assert!(matches!(result, Err(AppError::MalformedBody(_))));
    }

    #[test]
    fn json_array_is_an_error() {
        let result = parse(&headers("application/json"), b"[1,2]");
        assert!(matches!(result, Err(AppError::MalformedBody(_))));
    }

    #[test]
    fn unknown_content_type_yields_empty() {
        let payload = parse(&headers("text/plain"), b"whatever").unwrap();
        assert!(matches!(payload, Payload::Empty));
    }

    #[test]
    fn missing_content_type_yields_empty() {
        let payload = parse(&HeaderMap::new(), b"whatever").unwrap();
        assert!(matches!(payload, Payload::Empty));
    }

    #[test]
    fn multipart_boundary_is_extracted() {
        let raw = b"--B1\r\nContent-Disposition: form-data; name=\"k\"\r\n\r\nv\r\n--B1--\r\n";
        let payload = parse(&headers("multipart/form-data; boundary=B1"), raw).unwrap();
        assert_eq!(payload.field("k"), Some("v"));
    }

    #[test]
    fn trimmed_defaults_to_empty() {
        let payload = parse(
            &headers("application/x-www-form-urlencoded"),
            b"nome=+Mario+",
        )
        .unwrap();
        assert_eq!(payload.trimmed("nome"), "Mario");
        assert_eq!(payload.trimmed("cognome"), "");
    }
}
