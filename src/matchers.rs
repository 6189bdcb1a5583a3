//! A collection of different matching strategies provided out-of-the-box by `server-mocker`.
//!
//! If the set of matchers provided out-of-the-box is not enough for your specific testing needs
//! you can implement your own thanks to the [`Match`] trait.
//!
//! Furthermore, `Fn` closures that take an immutable [`Request`] reference as input and return a boolean
//! automatically implement [`Match`] and can be used where a matcher is expected.
//!
//! Check [`Match`]'s documentation for examples.
use std::collections::HashMap;
use std::str::FromStr;

use assert_json_diff::{assert_json_matches_no_panic, CompareMode};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use http::Method;
use log::debug;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::{Match, Request};

#[derive(Debug)]
/// Match **exactly** the method of a request. The method name is case-insensitive.
///
/// ### Example:
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::method;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     mock_server.stub(method("get")).returns(text("hello"));
///
///     // Act
///     let status = reqwest::get(mock_server.uri())
///         .await
///         .unwrap()
///         .status();
///
///     // Assert
///     assert_eq!(status, 200);
/// }
/// ```
pub struct MethodExactMatcher(Method);

/// Shorthand for [`MethodExactMatcher::new`].
pub fn method<T>(method: T) -> MethodExactMatcher
where
    T: AsRef<str>,
{
    MethodExactMatcher::new(method)
}

impl MethodExactMatcher {
    pub fn new<T>(method: T) -> Self
    where
        T: AsRef<str>,
    {
        let method = Method::from_str(&method.as_ref().to_ascii_uppercase())
            .expect("Failed to convert to HTTP method.");
        Self(method)
    }
}

impl Match for MethodExactMatcher {
    fn matches(&self, request: &Request) -> bool {
        request.method == self.0
    }
}

#[derive(Debug)]
/// Match all incoming requests, regardless of their method, path, headers or body.
///
/// Registered last, it takes priority over everything registered before it: handy to
/// temporarily answer every request the same way.
pub struct AnyMatcher;

/// Shorthand for [`AnyMatcher`].
pub fn any() -> AnyMatcher {
    AnyMatcher
}

impl Match for AnyMatcher {
    fn matches(&self, _request: &Request) -> bool {
        true
    }
}

#[derive(Debug)]
/// Match **exactly** the path of a request.
///
/// The path matcher ignores query parameters: use [`query_param`] for those.
///
/// ### Example:
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::path;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     mock_server.stub(path("/hello")).returns(text("world"));
///
///     // Act
///     let body = reqwest::get(format!("{}/hello?a_parameter=some_value", mock_server.uri()))
///         .await
///         .unwrap()
///         .text()
///         .await
///         .unwrap();
///
///     // Assert
///     assert_eq!(body, "world");
/// }
/// ```
pub struct PathExactMatcher(String);

/// Shorthand for [`PathExactMatcher::new`].
pub fn path<T>(path: T) -> PathExactMatcher
where
    T: Into<String>,
{
    PathExactMatcher::new(path)
}

impl PathExactMatcher {
    pub fn new<T: Into<String>>(path: T) -> Self {
        let path = path.into();

        if path.contains('?') {
            panic!(
                "server-mocker can't match the path `{}` because it contains a `?`. You must use `server_mocker::matchers::query_param` to match on query parameters (the part of the path after the `?`).",
                path
            );
        }

        if let Ok(url) = Url::parse(&path) {
            if let Some(host) = url.host_str() {
                panic!(
                    "server-mocker can't match the path `{}` because it contains the host `{}`. You don't have to specify the host. Try replacing your path with `path(\"{}\")`",
                    path,
                    host,
                    url.path()
                );
            }
        }

        // Prepend "/" to the path if missing.
        if path.starts_with('/') {
            Self(path)
        } else {
            Self(format!("/{}", path))
        }
    }
}

impl Match for PathExactMatcher {
    fn matches(&self, request: &Request) -> bool {
        request.url_path == self.0
    }
}

#[derive(Debug)]
/// Match the path of a request against a regular expression.
///
/// ### Example:
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::path_regex;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     mock_server
///         .stub(path_regex(r"^/users/[a-z0-9-]+/posts$"))
///         .returns(text("[]"));
///
///     // Act
///     let status = reqwest::get(format!("{}/users/da2854ea-b70f/posts", mock_server.uri()))
///         .await
///         .unwrap()
///         .status();
///
///     // Assert
///     assert_eq!(status, 200);
/// }
/// ```
pub struct PathRegexMatcher(Regex);

/// Shorthand for [`PathRegexMatcher::new`].
pub fn path_regex<T>(path: T) -> PathRegexMatcher
where
    T: Into<String>,
{
    PathRegexMatcher::new(path)
}

impl PathRegexMatcher {
    pub fn new<T: Into<String>>(path: T) -> Self {
        let path = path.into();

        Self(Regex::new(&path).expect("Failed to create regex for path matcher"))
    }
}

impl Match for PathRegexMatcher {
    fn matches(&self, request: &Request) -> bool {
        self.0.is_match(&request.url_path)
    }
}

#[derive(Debug)]
/// Match **exactly** the query parameter of a request.
///
/// When the same key appears more than once in the URL, only its last value is considered.
///
/// ### Example:
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::query_param;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     mock_server.stub(query_param("hello", "world")).returns(text("hi"));
///
///     // Act
///     let status = reqwest::get(format!("{}?hello=world", mock_server.uri()))
///         .await
///         .unwrap()
///         .status();
///
///     // Assert
///     assert_eq!(status, 200);
/// }
/// ```
pub struct QueryParamExactMatcher(String, String);

impl QueryParamExactMatcher {
    /// Specify the expected value for a query parameter.
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        let key = key.into();
        let value = value.into();
        Self(key, value)
    }
}

/// Shorthand for [`QueryParamExactMatcher::new`].
pub fn query_param<K, V>(key: K, value: V) -> QueryParamExactMatcher
where
    K: Into<String>,
    V: Into<String>,
{
    QueryParamExactMatcher::new(key, value)
}

impl Match for QueryParamExactMatcher {
    fn matches(&self, request: &Request) -> bool {
        request.url_param(&self.0) == Some(self.1.as_str())
    }
}

#[derive(Debug)]
/// Match requests carrying **all** the given query parameters with the given values.
/// Other parameters are ignored.
pub struct QueryParamsMatcher(HashMap<String, String>);

impl QueryParamsMatcher {
    pub fn new<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            params
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Shorthand for [`QueryParamsMatcher::new`].
pub fn query_params<I, K, V>(params: I) -> QueryParamsMatcher
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    QueryParamsMatcher::new(params)
}

impl Match for QueryParamsMatcher {
    fn matches(&self, request: &Request) -> bool {
        self.0
            .iter()
            .all(|(key, value)| request.url_param(key) == Some(value.as_str()))
    }
}

#[derive(Debug)]
/// Only match requests that do **not** contain a specified query parameter.
///
/// ### Example:
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::{method, query_param_is_missing};
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::builder()
///         .on_response_not_found(|_| {})
///         .start()
///         .await;
///     mock_server
///         .stub(method("GET"))
///         .and(query_param_is_missing("unexpected"))
///         .returns(text("ok"));
///
///     // Act
///     let ok_status = reqwest::get(mock_server.uri())
///         .await
///         .unwrap()
///         .status();
///     let err_status = reqwest::get(format!("{}?unexpected=foo", mock_server.uri()))
///         .await
///         .unwrap()
///         .status();
///
///     // Assert
///     assert_eq!(ok_status, 200);
///     assert_eq!(err_status, 404);
/// }
/// ```
pub struct QueryParamIsMissingMatcher(String);

impl QueryParamIsMissingMatcher {
    /// Specify the query parameter that is expected to not exist.
    pub fn new<K: Into<String>>(key: K) -> Self {
        let key = key.into();
        Self(key)
    }
}

/// Shorthand for [`QueryParamIsMissingMatcher::new`].
pub fn query_param_is_missing<K>(key: K) -> QueryParamIsMissingMatcher
where
    K: Into<String>,
{
    QueryParamIsMissingMatcher::new(key)
}

impl Match for QueryParamIsMissingMatcher {
    fn matches(&self, request: &Request) -> bool {
        !request.url_params.contains_key(&self.0)
    }
}

#[derive(Debug)]
/// Match **exactly** the value of a header. The header name is case-insensitive.
///
/// Repeated headers are seen joined with `", "`, e.g. `no-cache, no-store`.
///
/// ### Example:
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::header;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     mock_server.stub(header("Custom", "header")).returns(text("hi"));
///
///     // Act
///     let client = reqwest::Client::new();
///     let status = client
///         .get(mock_server.uri())
///         .header("custom", "header")
///         .send()
///         .await
///         .unwrap()
///         .status();
///
///     // Assert
///     assert_eq!(status, 200);
/// }
/// ```
pub struct HeaderExactMatcher(String, String);

/// Shorthand for [`HeaderExactMatcher::new`].
pub fn header<K, V>(key: K, value: V) -> HeaderExactMatcher
where
    K: AsRef<str>,
    V: Into<String>,
{
    HeaderExactMatcher::new(key, value)
}

impl HeaderExactMatcher {
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self(key.as_ref().to_ascii_lowercase(), value.into())
    }
}

impl Match for HeaderExactMatcher {
    fn matches(&self, request: &Request) -> bool {
        request.header(&self.0) == Some(self.1.as_str())
    }
}

#[derive(Debug)]
/// Match requests carrying a header, whatever its value. The header name is case-insensitive.
pub struct HeaderExistsMatcher(String);

/// Shorthand for [`HeaderExistsMatcher::new`].
pub fn header_exists<K>(key: K) -> HeaderExistsMatcher
where
    K: AsRef<str>,
{
    HeaderExistsMatcher::new(key)
}

impl HeaderExistsMatcher {
    pub fn new<K>(key: K) -> Self
    where
        K: AsRef<str>,
    {
        Self(key.as_ref().to_ascii_lowercase())
    }
}

impl Match for HeaderExistsMatcher {
    fn matches(&self, request: &Request) -> bool {
        request.header(&self.0).is_some()
    }
}

#[derive(Debug)]
/// Match **exactly** a field of a form body.
///
/// Form fields come from `multipart/form-data` and `application/x-www-form-urlencoded`
/// bodies, and from the scalar members of a JSON object body.
///
/// ### Example:
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::{form_field, method};
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     mock_server
///         .stub(method("POST"))
///         .and(form_field("test1", "1"))
///         .returns(text("posted"));
///
///     // Act
///     let client = reqwest::Client::new();
///     let body = client
///         .post(mock_server.uri())
///         .form(&[("test1", "1"), ("test2", "2")])
///         .send()
///         .await
///         .unwrap()
///         .text()
///         .await
///         .unwrap();
///
///     // Assert
///     assert_eq!(body, "posted");
/// }
/// ```
pub struct FormFieldExactMatcher(String, String);

impl FormFieldExactMatcher {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self(key.into(), value.into())
    }
}

/// Shorthand for [`FormFieldExactMatcher::new`].
pub fn form_field<K, V>(key: K, value: V) -> FormFieldExactMatcher
where
    K: Into<String>,
    V: Into<String>,
{
    FormFieldExactMatcher::new(key, value)
}

impl Match for FormFieldExactMatcher {
    fn matches(&self, request: &Request) -> bool {
        request.form_field(&self.0) == Some(self.1.as_str())
    }
}

#[derive(Debug)]
/// Match **exactly** the body of a request, as text.
pub struct BodyExactMatcher(String);

impl BodyExactMatcher {
    /// Specify the expected body as a string.
    pub fn string<T: Into<String>>(body: T) -> Self {
        Self(body.into())
    }
}

/// Shorthand for [`BodyExactMatcher::string`].
pub fn body_string<T>(body: T) -> BodyExactMatcher
where
    T: Into<String>,
{
    BodyExactMatcher::string(body)
}

impl Match for BodyExactMatcher {
    fn matches(&self, request: &Request) -> bool {
        request.body == self.0
    }
}

#[derive(Debug)]
/// Match part of the body of a request, as text.
///
/// ### Example:
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::body_string_contains;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     mock_server
///         .stub(body_string_contains("hello world"))
///         .returns(text("found"));
///
///     // Act
///     let client = reqwest::Client::new();
///     let status = client.post(mock_server.uri())
///         .body("this is a hello world example!")
///         .send()
///         .await
///         .unwrap()
///         .status();
///
///     // Assert
///     assert_eq!(status, 200);
/// }
/// ```
pub struct BodyContainsMatcher(String);

impl BodyContainsMatcher {
    /// Specify the part of the body that should be matched as a string.
    pub fn string<T: Into<String>>(body: T) -> Self {
        Self(body.into())
    }
}

/// Shorthand for [`BodyContainsMatcher::string`].
pub fn body_string_contains<T>(body: T) -> BodyContainsMatcher
where
    T: Into<String>,
{
    BodyContainsMatcher::string(body)
}

impl Match for BodyContainsMatcher {
    fn matches(&self, request: &Request) -> bool {
        request.body.contains(&self.0)
    }
}

#[derive(Debug)]
/// Match part of the JSON body of a request: every member of the expected value must be
/// present in the body, extra members are ignored.
///
/// ### Example:
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::body_partial_json;
/// use serde_json::json;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     mock_server
///         .stub(body_partial_json(json!({"hello": "world!"})))
///         .returns(text("matched"));
///
///     // Act
///     let client = reqwest::Client::new();
///     let status = client.post(mock_server.uri())
///         .json(&json!({"hello": "world!", "foo": "bar"}))
///         .send()
///         .await
///         .unwrap()
///         .status();
///
///     // Assert
///     assert_eq!(status, 200);
/// }
/// ```
pub struct BodyPartialJsonMatcher(Value);

impl BodyPartialJsonMatcher {
    /// Specify the part of the body that should be matched as a JSON value.
    pub fn json<T: Serialize>(body: T) -> Self {
        Self(serde_json::to_value(body).expect("Can't serialize to JSON"))
    }
}

/// Shorthand for [`BodyPartialJsonMatcher::json`].
pub fn body_partial_json<T: Serialize>(body: T) -> BodyPartialJsonMatcher {
    BodyPartialJsonMatcher::json(body)
}

impl Match for BodyPartialJsonMatcher {
    fn matches(&self, request: &Request) -> bool {
        match serde_json::from_str::<Value>(&request.body) {
            Ok(body) => {
                let config = assert_json_diff::Config::new(CompareMode::Inclusive);
                assert_json_matches_no_panic(&body, &self.0, config).is_ok()
            }
            Err(err) => {
                debug!("can't parse the request body as JSON: {}", err);
                false
            }
        }
    }
}

#[derive(Debug)]
/// Match an incoming request if it contains the basic authentication header with the username and password
/// as per [RFC 7617](https://datatracker.ietf.org/doc/html/rfc7617).
pub struct BasicAuthMatcher(HeaderExactMatcher);

impl BasicAuthMatcher {
    /// Match basic authentication header using the given username and password.
    pub fn from_credentials(username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        Self::from_token(BASE64_STANDARD.encode(format!(
            "{}:{}",
            username.as_ref(),
            password.as_ref()
        )))
    }

    /// Match basic authentication header with the exact token given.
    pub fn from_token(token: impl AsRef<str>) -> Self {
        Self(header("authorization", format!("Basic {}", token.as_ref())))
    }
}

/// Shorthand for [`BasicAuthMatcher::from_credentials`].
pub fn basic_auth<U, P>(username: U, password: P) -> BasicAuthMatcher
where
    U: AsRef<str>,
    P: AsRef<str>,
{
    BasicAuthMatcher::from_credentials(username, password)
}

impl Match for BasicAuthMatcher {
    fn matches(&self, request: &Request) -> bool {
        self.0.matches(request)
    }
}

#[derive(Debug)]
/// Match an incoming request if it contains the bearer token header
/// as per [RFC 6750](https://datatracker.ietf.org/doc/html/rfc6750).
pub struct BearerTokenMatcher(HeaderExactMatcher);

impl BearerTokenMatcher {
    pub fn from_token(token: impl AsRef<str>) -> Self {
        Self(header("authorization", format!("Bearer {}", token.as_ref())))
    }
}

impl Match for BearerTokenMatcher {
    fn matches(&self, request: &Request) -> bool {
        self.0.matches(request)
    }
}

/// Shorthand for [`BearerTokenMatcher::from_token`].
pub fn bearer_token<T>(token: T) -> BearerTokenMatcher
where
    T: AsRef<str>,
{
    BearerTokenMatcher::from_token(token)
}
