#![allow(clippy::needless_doctest_main)]
//! `server-mocker` is an embeddable HTTP mock server for black-box testing of Rust applications
//! that interact with third-party APIs.
//!
//! Register predicate-matched responses on a [`MockServer`], point your application at its
//! [`uri`](MockServer::uri) and check what it received.
//!
//! # Table of Contents
//! 1. [Getting started](#getting-started)
//! 2. [Priority](#priority)
//! 3. [Matchers](#matchers)
//! 4. [Spying](#spying)
//! 5. [Unmatched requests](#unmatched-requests)
//! 6. [Test isolation](#test-isolation)
//! 7. [Runtime compatibility](#runtime-compatibility)
//!
//! ## Getting started
//! ```rust
//! use server_mocker::{json, text, MockServer};
//! use server_mocker::matchers::{method, path};
//! use serde_json::json;
//!
//! #[async_std::main]
//! async fn main() {
//!     // Start a background HTTP server on a random local port
//!     let mock_server = MockServer::start().await;
//!
//!     // When it receives a GET request on '/hello' it will respond with `world`.
//!     mock_server
//!         .stub(method("GET"))
//!         .and(path("/hello"))
//!         .returns(text("world"));
//!     mock_server
//!         .stub(path("/user"))
//!         .returns(json(&json!({"name": "Jane"})));
//!
//!     // If we probe the MockServer using any HTTP client it behaves as expected.
//!     let body = reqwest::get(format!("{}/hello", mock_server.uri()))
//!         .await
//!         .unwrap()
//!         .text()
//!         .await
//!         .unwrap();
//!     assert_eq!(body, "world");
//!
//!     // If the request doesn't match any registration a 404 is returned.
//!     let status = reqwest::get(format!("{}/missing", mock_server.uri()))
//!         .await
//!         .unwrap()
//!         .status();
//!     assert_eq!(status, 404);
//!
//!     // Free the port for the next test.
//!     mock_server.close().await;
//! }
//! ```
//!
//! ## Priority
//!
//! The most recent registration wins: when several registrations match a request, the one
//! registered last produces the response. Clearing it uncovers the previous one again.
//!
//! ## Matchers
//!
//! `server-mocker` provides a set of matching strategies out of the box - check the
//! [`matchers`] module for a complete list.
//!
//! You can define your own matchers using the [`Match`] trait, as well as using `Fn` closures.
//! Check [`Match`]'s documentation for more details and examples.
//!
//! ## Spying
//!
//! Registrations made with [`mock`](MockRegistry::mock) return a [`MockGuard`]: ask it whether
//! it was [`called`](MockGuard::called), [`called_once`](MockGuard::called_once) or for its
//! [`call_count`](MockGuard::call_count).
//! Every request the server handled, matched or not, is available through
//! [`requests`](MockRegistry::requests).
//!
//! ## Unmatched requests
//!
//! A request that no registration matches is a test bug: it is logged at `error` level and
//! answered with a `404` describing the request. Configure
//! [`on_response_not_found`](MockServerBuilder::on_response_not_found) to handle it yourself.
//!
//! ## Test isolation
//!
//! Each instance of [`MockServer`] is fully isolated: [`start`](MockServer::start) takes care
//! of finding a random port available on your local machine which is assigned to the new
//! [`MockServer`].
//!
//! [`close`](MockServer::close) shuts the server down and completes once its port is released,
//! so tests can start and stop many servers in a row.
//!
//! ## Runtime compatibility
//!
//! The HTTP server runs on a dedicated thread with its own `tokio` runtime: `server-mocker` can
//! be used (and it is tested to work) with [`async_std`], [`tokio`] and `actix-rt`.
//!
//! [`async_std`]: https://docs.rs/async-std/
//! [`tokio`]: https://docs.rs/tokio/
mod error;
pub mod http;
pub mod matchers;
mod mock;
mod mock_guard;
mod mock_server;
mod mock_set;
mod mounted_mock;
mod normalize;
mod registry;
mod request;
mod respond;
mod response;

pub use error::Error;
pub use mock::{Match, MockBuilder, StubBuilder};
pub use mock_guard::{MockGuard, StubGuard};
#[cfg(feature = "tls")]
pub use mock_server::tls_certs;
pub use mock_server::{MockServer, MockServerBuilder, SHUTDOWN_PATH};
pub use normalize::normalize;
pub use registry::MockRegistry;
pub use request::{BodyPrintLimit, Request};
pub use respond::Respond;
pub use response::{html, json, text, try_json, Response};
#[cfg(feature = "tls")]
pub use tokio_rustls::rustls;
