use std::net::SocketAddr;
use std::ops::Deref;

use log::debug;

use crate::mock_server::bare_server::BareMockServer;
use crate::mock_server::MockServerBuilder;
use crate::MockRegistry;

/// An HTTP web-server running in the background to behave as one of your dependencies
/// for testing purposes.
///
/// Each instance of `MockServer` is fully isolated: [`MockServer::start`] takes care of finding a random port
/// available on your local machine which is assigned to the new `MockServer`.
///
/// You can use [`MockServer::builder`] if you need to specify custom configuration - e.g.
/// run on a specific port, serve HTTPS or tolerate unmatched requests.
///
/// `MockServer` dereferences to its [`MockRegistry`]: `stub`, `mock`, `mock_implementation`,
/// `clear_all` and `requests` are all called directly on the server.
///
/// ## Best practices
///
/// To ensure full isolation and no cross-test interference, `MockServer`s shouldn't be
/// shared between tests. Instead, `MockServer`s should be created in the test where they are used,
/// and [`close`](MockServer::close)d at the end of it: once `close` returns, the port is free again.
///
/// Dropping a `MockServer` shuts it down as well, without waiting for the port to be released.
pub struct MockServer(BareMockServer);

impl MockServer {
    pub(super) fn new(server: BareMockServer) -> Self {
        Self(server)
    }

    /// You can use `MockServer::builder` if you need to specify custom configuration.
    ///
    /// If this is not your case, use [`MockServer::start`].
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    /// Start a new instance of a `MockServer` listening on a random port, with the default
    /// configuration.
    ///
    /// ### Example:
    /// ```rust
    /// use server_mocker::{text, MockServer};
    /// use server_mocker::matchers::method;
    ///
    /// #[async_std::main]
    /// async fn main() {
    ///     // Arrange
    ///     let mock_server_one = MockServer::start().await;
    ///     let mock_server_two = MockServer::builder()
    ///         .on_response_not_found(|_| {})
    ///         .start()
    ///         .await;
    ///
    ///     assert!(mock_server_one.address() != mock_server_two.address());
    ///
    ///     // Registering on the first mock server only.
    ///     mock_server_one.stub(method("GET")).returns(text("hello"));
    ///
    ///     // Act
    ///     let status = reqwest::get(mock_server_one.uri())
    ///         .await
    ///         .unwrap()
    ///         .status();
    ///     assert_eq!(status, 200);
    ///
    ///     // Nothing registered on `mock_server_two`: it answers with a 404.
    ///     let status = reqwest::get(mock_server_two.uri())
    ///         .await
    ///         .unwrap()
    ///         .status();
    ///     assert_eq!(status, 404);
    /// }
    /// ```
    pub async fn start() -> Self {
        Self::builder().start().await
    }

    /// Return the base uri of this running instance of `MockServer`, e.g. `http://127.0.0.1:4372`.
    ///
    /// Use this method to compose uris when interacting with this instance of `MockServer` via
    /// an HTTP client.
    pub fn uri(&self) -> String {
        self.0.uri()
    }

    /// Return the socket address of this running instance of `MockServer`, e.g. `127.0.0.1:4372`.
    ///
    /// Use this method to interact with the `MockServer` using `TcpStream`s.
    ///
    /// ### Example:
    /// ```rust
    /// use server_mocker::MockServer;
    /// use std::net::TcpStream;
    ///
    /// #[async_std::main]
    /// async fn main() {
    ///     // Act - the server is started
    ///     let mock_server = MockServer::start().await;
    ///
    ///     // Assert - we can connect to it
    ///     assert!(TcpStream::connect(mock_server.address()).is_ok());
    /// }
    /// ```
    pub fn address(&self) -> &SocketAddr {
        self.0.address()
    }

    /// The port this instance of `MockServer` listens on.
    pub fn port(&self) -> u16 {
        self.0.address().port()
    }

    /// The registry answering the requests of this `MockServer`.
    ///
    /// `MockRegistry` is a cheap handle: clone it to register responses from elsewhere,
    /// e.g. from inside a response producer.
    pub fn registry(&self) -> &MockRegistry {
        self.0.registry()
    }

    /// Shut the server down.
    ///
    /// Registrations and recorded requests are cleared, the server stops accepting connections,
    /// open connections get the [grace period](MockServerBuilder::shutdown_grace_period) to
    /// finish before being terminated. The returned future completes once the listening port
    /// has been released.
    ///
    /// ### Example:
    /// ```rust
    /// use server_mocker::MockServer;
    ///
    /// #[async_std::main]
    /// async fn main() {
    ///     // Arrange
    ///     let mock_server = MockServer::start().await;
    ///     let address = *mock_server.address();
    ///
    ///     // Act
    ///     mock_server.close().await;
    ///
    ///     // Assert - the port can be bound again
    ///     assert!(std::net::TcpListener::bind(address).is_ok());
    /// }
    /// ```
    pub async fn close(mut self) {
        debug!("Closing the mock server on {}.", self.0.address());
        self.0.shutdown().await;
    }
}

impl Deref for MockServer {
    type Target = MockRegistry;

    fn deref(&self) -> &Self::Target {
        self.0.registry()
    }
}
