//! All bits and pieces concerning the HTTP mock server are in this module.
//!
//! `bare_server::BareMockServer` is the "front-end" to drive behaviour for the `hyper` HTTP
//! server running in the background, defined in the `hyper` sub-module.
//!
//! `bare_server::BareMockServer` is not exposed directly: crate users only get to interact with
//! `exposed_server::MockServer`, assembled by `builder::MockServerBuilder`.
mod bare_server;
mod builder;
mod exposed_server;
mod hyper;
#[cfg(feature = "tls")]
pub mod tls_certs;

pub use builder::MockServerBuilder;
pub use exposed_server::MockServer;

/// The path of the administrative shutdown request.
///
/// It is only intercepted when a [`shutdown_hook`](MockServerBuilder::shutdown_hook) is
/// configured; otherwise it is an ordinary path.
pub const SHUTDOWN_PATH: &str = "/__server-mocker/shutdown";
