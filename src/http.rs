//! Convenient re-exports of http types that are part of `server-mocker`'s public API.
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
pub use hyper::body::Bytes;
