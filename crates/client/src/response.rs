//! HTTP response representation.

/// A completed downstream response.
///
/// The body is parsed as JSON when possible; otherwise the raw text is kept
/// as a JSON string so a malformed body never fails the call.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub status_message: String,
    pub body: serde_json::Value,
}

impl Response {
    /// Build a response from its status and raw body text.
    pub fn from_text(status: u16, status_message: impl Into<String>, text: String) -> Self {
        Self {
            status,
            status_message: status_message.into(),
            body: parse_body(text),
        }
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Consume the response and return its body.
    pub fn into_body(self) -> serde_json::Value {
        self.body
    }
}

/// Parse a body as JSON, falling back to the raw text.
pub fn parse_body(text: String) -> serde_json::Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => serde_json::Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_is_parsed() {
        let response = Response::from_text(201, "Created", r#"{"ID":1,"Title":"E"}"#.into());
        assert!(response.is_success());
        assert_eq!(response.body["Title"], "E");
    }

    #[test]
    fn test_malformed_body_kept_raw() {
        let response = Response::from_text(200, "OK", "{not json".into());
        assert_eq!(response.body, serde_json::Value::String("{not json".into()));

        let response = Response::from_text(204, "No Content", String::new());
        assert_eq!(
            response.into_body(),
            serde_json::Value::String(String::new())
        );
    }

    #[test]
    fn test_is_success() {
        assert!(!Response::from_text(404, "Not Found", String::new()).is_success());
        assert!(Response::from_text(299, "", String::new()).is_success());
    }
}
