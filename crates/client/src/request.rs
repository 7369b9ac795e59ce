//! Request options and resolved request configuration.

use std::collections::BTreeMap;

use restbridge_auth::basic_header;

use crate::error::{Error, ErrorKind, Result};

pub(crate) const CONTENT_TYPE: &str = "Content-Type";
pub(crate) const ACCEPT: &str = "Accept";
pub(crate) const AUTHORIZATION: &str = "Authorization";
const APPLICATION_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header map with case-insensitive replacement.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl std::fmt::Debug for Headers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.0 {
            if is_sensitive(name) {
                map.entry(name, &"[REDACTED]");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

fn is_sensitive(name: &str) -> bool {
    name.eq_ignore_ascii_case(AUTHORIZATION) || name.eq_ignore_ascii_case("Proxy-Authorization")
}

impl Headers {
    /// The default JSON headers every service client starts with.
    pub fn json() -> Self {
        let mut headers = Self::default();
        headers.insert(CONTENT_TYPE, APPLICATION_JSON);
        headers.insert(ACCEPT, APPLICATION_JSON);
        headers
    }

    /// Insert a header, replacing any existing header of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.0.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.0.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    }

    /// Overlay another header map on top of this one.
    pub fn merge(&mut self, other: &BTreeMap<String, String>) {
        for (name, value) in other {
            self.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Per-call options overlaid on the cached client configuration.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) query: Vec<(String, String)>,
    basic_auth: Option<(String, String)>,
}

impl std::fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("query", &self.query)
            .field("basic_auth", &self.basic_auth.as_ref().map(|(u, _)| u))
            .finish()
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Send the body URL-encoded instead of JSON.
    pub fn form(self) -> Self {
        self.header(CONTENT_TYPE, FORM_URLENCODED)
    }

    /// Basic-auth shorthand, turned into an `Authorization` header.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Overlay these options on a header map, consuming the basic-auth
    /// shorthand into an `Authorization` header.
    pub(crate) fn apply_headers(&self, headers: &mut Headers) {
        headers.merge(&self.headers);
        if let Some((user, pass)) = &self.basic_auth {
            headers.insert(AUTHORIZATION, basic_header(user, pass));
        }
    }
}

/// Fully resolved configuration for one HTTP call.
///
/// Always an owned copy: mutating it never touches the cached client.
#[derive(Clone)]
pub struct ResolvedRequest {
    pub method: RequestMethod,
    pub url: url::Url,
    pub headers: Headers,
    pub(crate) http: reqwest::Client,
}

impl std::fmt::Debug for ResolvedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl ResolvedRequest {
    /// True when the body is sent as a URL-encoded form.
    pub fn is_form(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with(FORM_URLENCODED))
    }

    /// Serialize a body according to the content type.
    pub fn encode_body(&self, body: &serde_json::Value) -> Result<Vec<u8>> {
        if !self.is_form() {
            return Ok(serde_json::to_vec(body)?);
        }

        let object = body.as_object().ok_or_else(|| {
            Error::new(ErrorKind::Serialization(
                "form bodies must be JSON objects".to_string(),
            ))
        })?;
        let pairs: Vec<(&str, String)> = object
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.as_str(), value)
            })
            .collect();
        Ok(serde_urlencoded::to_string(pairs)?.into_bytes())
    }
}
