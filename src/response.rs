use std::collections::HashMap;
use std::convert::TryInto;

use http::StatusCode;
use http_body_util::Full;
use hyper::body::Bytes;
use serde::Serialize;

/// The response returned by a [`MockServer`] when a registration matches an incoming request.
///
/// A single canonical record whatever the kind of content: [`text`], [`json`] and [`html`] only
/// serialise the body and set the `content-type` header.
///
/// [`MockServer`]: crate::MockServer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub content: String,
    /// Header values keyed by lower-cased header name.
    pub headers: HashMap<String, String>,
    pub status_code: u16,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            content: String::new(),
            headers: HashMap::new(),
            status_code: 200,
        }
    }
}

// A mock server is a testing tool - an invalid status code is a mistake in the test itself.
// Hence we prefer to panic and provide an easier API than to use `Result`s, like the builders
// below do for values that cannot be serialised.
impl Response {
    /// Start building a `Response` specifying its status code, with an empty body.
    pub fn new<S>(s: S) -> Self
    where
        S: TryInto<StatusCode>,
        <S as TryInto<StatusCode>>::Error: std::fmt::Debug,
    {
        let status_code = s.try_into().expect("Failed to convert into status code.");
        Self {
            status_code: status_code.as_u16(),
            ..Default::default()
        }
    }

    /// Replace the status code, keeping body and headers.
    pub fn with_status<S>(mut self, s: S) -> Self
    where
        S: TryInto<StatusCode>,
        <S as TryInto<StatusCode>>::Error: std::fmt::Debug,
    {
        let status_code = s.try_into().expect("Failed to convert into status code.");
        self.status_code = status_code.as_u16();
        self
    }

    /// Set the response body. Headers are left untouched.
    pub fn set_body_string<T: Into<String>>(mut self, body: T) -> Self {
        self.content = body.into();
        self
    }

    /// Insert a header `value` with `key` as header name, overriding any previous value.
    ///
    /// Header names are case-insensitive: `key` is stored lower-cased, so
    /// `text("hi").insert_header("Content-Type", "text/csv")` replaces the default content type.
    pub fn insert_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Insert multiple header key-value pairs. Later pairs override earlier ones, and all of them
    /// override headers already set on the response.
    pub fn insert_headers<K, V, I>(self, headers: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        headers
            .into_iter()
            .fold(self, |response, (key, value)| response.insert_header(key, value))
    }

    /// Convert into the `hyper` representation written on the wire.
    pub(crate) fn to_hyper(&self) -> Result<http::Response<Full<Bytes>>, http::Error> {
        let mut builder = http::Response::builder().status(self.status_code);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Full::new(Bytes::from(self.content.clone())))
    }
}

/// A `200 OK` response with a plain-text body and `content-type: text/plain`.
///
/// Chain [`Response::insert_header`] to add headers: they win over the default content type
/// when the names collide.
pub fn text<T: Into<String>>(body: T) -> Response {
    Response::default()
        .set_body_string(body)
        .insert_header("content-type", "text/plain")
}

/// A `200 OK` response with `data` serialised as JSON and `content-type: application/json`.
///
/// Panics if `data` cannot be serialised (e.g. a map with non-string keys): use [`try_json`]
/// to get the error back instead.
pub fn json<T: Serialize + ?Sized>(data: &T) -> Response {
    try_json(data).expect("Failed to serialise the response body as JSON.")
}

/// Fallible version of [`json`].
pub fn try_json<T: Serialize + ?Sized>(data: &T) -> Result<Response, serde_json::Error> {
    let body = serde_json::to_string(data)?;
    Ok(Response::default()
        .set_body_string(body)
        .insert_header("content-type", "application/json"))
}

/// A `200 OK` response with an HTML body and `content-type: text/html`.
pub fn html<T: Into<String>>(markup: T) -> Response {
    Response::default()
        .set_body_string(markup)
        .insert_header("content-type", "text/html")
}
