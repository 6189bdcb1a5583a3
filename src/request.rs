use std::collections::HashMap;
use std::fmt;

use http::Method;
use serde::de::DeserializeOwned;

pub const BODY_PRINT_LIMIT: usize = 10_000;

/// Specifies limitations on printing request bodies when reporting unmatched requests. For some
/// mock servers the bodies may be too large to reasonably print and it may be desirable to limit them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyPrintLimit {
    /// Maximum length of a body to print in bytes.
    Limited(usize),
    /// There is no limit to the size of a body that may be printed.
    Unlimited,
}

impl Default for BodyPrintLimit {
    fn default() -> Self {
        BodyPrintLimit::Limited(BODY_PRINT_LIMIT)
    }
}

/// An incoming request to an instance of [`MockServer`], in its canonical shape.
///
/// Every predicate gets an immutable reference to a `Request` in the [`matches`] method
/// defined in the [`Match`] trait, every responder gets one in [`respond`].
///
/// The transport builds a `Request` once per inbound call (see [`normalize`]): the query string
/// is decoded into `url_params`, header names are lower-cased and the body is parsed into
/// `form_fields` according to its declared content type.
/// A `Request` is never mutated afterwards: the registry keeps copies of it in its request log
/// and in the call log of the spy that matched it.
///
/// [`MockServer`]: crate::MockServer
/// [`matches`]: crate::Match::matches
/// [`Match`]: crate::Match
/// [`respond`]: crate::Respond::respond
/// [`normalize`]: crate::normalize
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url_path: String,
    /// Decoded query parameters. When a key is repeated the last occurrence wins.
    pub url_params: HashMap<String, String>,
    /// Fields parsed out of the body; empty when the content type carries no fields.
    pub form_fields: HashMap<String, String>,
    /// Header values keyed by lower-cased header name. Repeated headers are joined with `", "`.
    pub headers: HashMap<String, String>,
    /// The raw body, decoded as (lossy) UTF-8 text.
    pub body: String,
}

impl Request {
    /// Start from an empty request with the given method and path.
    ///
    /// Handy to drive a [`MockRegistry`](crate::MockRegistry) directly, without going through
    /// the network.
    pub fn new<P: Into<String>>(method: Method, url_path: P) -> Self {
        Self {
            method,
            url_path: url_path.into(),
            ..Default::default()
        }
    }

    pub fn with_url_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.url_params.insert(key.into(), value.into());
        self
    }

    pub fn with_form_field<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.form_fields.insert(key.into(), value.into());
        self
    }

    /// Header names are stored lower-cased, whatever the casing of `key`.
    pub fn with_header<K: AsRef<str>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body<B: Into<String>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Look up a header value, ignoring the casing of `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn url_param(&self, name: &str) -> Option<&str> {
        self.url_params.get(name).map(String::as_str)
    }

    pub fn form_field(&self, name: &str) -> Option<&str> {
        self.form_fields.get(name).map(String::as_str)
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub(crate) fn print_with_limit(
        &self,
        mut buffer: impl fmt::Write,
        body_print_limit: BodyPrintLimit,
    ) -> fmt::Result {
        writeln!(buffer, "{} {}", self.method, self.url_path)?;
        for (name, value) in sorted(&self.url_params) {
            writeln!(buffer, "?{}={}", name, value)?;
        }
        for (name, value) in sorted(&self.headers) {
            writeln!(buffer, "{}: {}", name, value)?;
        }
        for (name, value) in sorted(&self.form_fields) {
            writeln!(buffer, "[form] {}={}", name, value)?;
        }

        match body_print_limit {
            BodyPrintLimit::Limited(limit) if self.body.len() > limit => {
                let mut end = limit;
                while !self.body.is_char_boundary(end) {
                    end -= 1;
                }
                writeln!(buffer, "{}", &self.body[..end])?;
                writeln!(
                    buffer,
                    "We truncated the body because it was too large: {} bytes (limit: {} bytes)",
                    self.body.len(),
                    limit
                )?;
                writeln!(
                    buffer,
                    "Increase this limit by setting `SERVER_MOCKER_BODY_PRINT_LIMIT`, or calling `MockServerBuilder::body_print_limit` when building your MockServer instance"
                )
            }
            _ => {
                if self.body.is_empty() {
                    Ok(())
                } else {
                    writeln!(buffer, "{}", self.body)
                }
            }
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_with_limit(f, BodyPrintLimit::Unlimited)
    }
}

fn sorted(map: &HashMap<String, String>) -> Vec<(&String, &String)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort();
    entries
}
