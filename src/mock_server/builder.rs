use std::env;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use crate::mock_server::bare_server::{BareMockServer, ServerSettings, ShutdownHook};
use crate::registry::NotFoundHandler;
use crate::request::{BodyPrintLimit, BODY_PRINT_LIMIT};
use crate::{Error, MockRegistry, MockServer, Request};

const BODY_PRINT_LIMIT_VAR: &str = "SERVER_MOCKER_BODY_PRINT_LIMIT";
const DEFAULT_SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// A builder providing a fluent API to assemble a [`MockServer`] step-by-step.
/// Use [`MockServer::builder`] to get started.
pub struct MockServerBuilder {
    listener: Option<TcpListener>,
    port: Option<u16>,
    not_found_handler: Option<NotFoundHandler>,
    body_print_limit: BodyPrintLimit,
    shutdown_grace_period: Duration,
    shutdown_hook: Option<ShutdownHook>,
    #[cfg(feature = "tls")]
    tls: Option<Arc<tokio_rustls::rustls::ServerConfig>>,
}

impl MockServerBuilder {
    pub(super) fn new() -> Self {
        let body_print_limit = match env::var(BODY_PRINT_LIMIT_VAR)
            .ok()
            .and_then(|x| x.parse::<usize>().ok())
        {
            Some(limit) => BodyPrintLimit::Limited(limit),
            None => BodyPrintLimit::Limited(BODY_PRINT_LIMIT),
        };
        Self {
            listener: None,
            port: None,
            not_found_handler: None,
            body_print_limit,
            shutdown_grace_period: DEFAULT_SHUTDOWN_GRACE_PERIOD,
            shutdown_hook: None,
            #[cfg(feature = "tls")]
            tls: None,
        }
    }

    /// Listen on `127.0.0.1:port` instead of a port picked by the operating system.
    ///
    /// Ignored if a [`listener`](MockServerBuilder::listener) is provided.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Each instance of [`MockServer`] is, by default, running on a random
    /// port available on your local machine.
    /// With `MockServerBuilder::listener` you can choose to start the `MockServer`
    /// instance on a specific port you have already bound.
    ///
    /// ### Example:
    /// ```rust
    /// use server_mocker::MockServer;
    ///
    /// #[async_std::main]
    /// async fn main() {
    ///     // Arrange
    ///     let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    ///     let expected_server_address = listener
    ///         .local_addr()
    ///         .expect("Failed to get server address.");
    ///
    ///     // Act
    ///     let mock_server = MockServer::builder().listener(listener).start().await;
    ///
    ///     // Assert
    ///     assert_eq!(&expected_server_address, mock_server.address());
    /// }
    /// ```
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Serve HTTPS with the given `rustls` configuration.
    ///
    /// [`tls_certs::MockTlsCertificates`](crate::tls_certs::MockTlsCertificates) builds one for
    /// `localhost` and `127.0.0.1`.
    #[cfg(feature = "tls")]
    pub fn tls(mut self, config: Arc<tokio_rustls::rustls::ServerConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    /// By default, a request that no registration matches is a hard failure: it is logged at
    /// `error` level and answered with a `404` whose body describes the request.
    ///
    /// With a handler configured, the handler is invoked with the unmatched request instead and
    /// the server answers with an empty `404`.
    ///
    /// ### Example:
    /// ```rust
    /// use std::sync::{Arc, Mutex};
    /// use server_mocker::MockServer;
    ///
    /// #[async_std::main]
    /// async fn main() {
    ///     // Arrange
    ///     let unmatched = Arc::new(Mutex::new(Vec::new()));
    ///     let recorder = unmatched.clone();
    ///     let mock_server = MockServer::builder()
    ///         .on_response_not_found(move |request| {
    ///             recorder.lock().unwrap().push(request.url_path.clone());
    ///         })
    ///         .start()
    ///         .await;
    ///
    ///     // Act
    ///     let status = reqwest::get(format!("{}/nowhere", mock_server.uri()))
    ///         .await
    ///         .unwrap()
    ///         .status();
    ///
    ///     // Assert
    ///     assert_eq!(status, 404);
    ///     assert_eq!(*unmatched.lock().unwrap(), vec!["/nowhere".to_string()]);
    /// }
    /// ```
    pub fn on_response_not_found<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request) + Send + Sync + 'static,
    {
        self.not_found_handler = Some(Arc::new(handler));
        self
    }

    /// The mock server prints unmatched requests in its errors. By default, the size of the
    /// printed body is limited.
    ///
    /// You may want to change this if you're working with services with very large
    /// bodies. The default comes from the `SERVER_MOCKER_BODY_PRINT_LIMIT` environment variable,
    /// falling back to 10 000 bytes.
    pub fn body_print_limit(mut self, limit: BodyPrintLimit) -> Self {
        self.body_print_limit = limit;
        self
    }

    /// How long [`MockServer::close`] waits for open connections to finish before
    /// terminating them. Defaults to one second.
    pub fn shutdown_grace_period(mut self, grace_period: Duration) -> Self {
        self.shutdown_grace_period = grace_period;
        self
    }

    /// Enable the administrative shutdown path.
    ///
    /// A request to [`SHUTDOWN_PATH`](crate::SHUTDOWN_PATH) is then answered with a fixed
    /// acknowledgement, never reaching the registry; the server shuts down and `hook` runs
    /// once it is done.
    pub fn shutdown_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.shutdown_hook = Some(Box::new(hook));
        self
    }

    /// Finalise the builder and launch the [`MockServer`] instance, reporting setup failures.
    pub async fn try_start(self) -> Result<MockServer, Error> {
        let listener = match self.listener {
            Some(listener) => listener,
            None => {
                let address = SocketAddr::from((Ipv4Addr::LOCALHOST, self.port.unwrap_or(0)));
                TcpListener::bind(address).map_err(|e| Error::Bind(address, e))?
            }
        };
        let registry = MockRegistry::new()
            .with_handler(self.not_found_handler)
            .with_body_print_limit(self.body_print_limit);

        let server = BareMockServer::start(ServerSettings {
            listener,
            registry,
            shutdown_grace_period: self.shutdown_grace_period,
            shutdown_hook: self.shutdown_hook,
            #[cfg(feature = "tls")]
            tls: self.tls,
        })?;
        Ok(MockServer::new(server))
    }

    /// Finalise the builder and launch the [`MockServer`] instance!
    ///
    /// Panics if the server cannot be started, e.g. because the requested port is taken.
    /// Use [`try_start`](MockServerBuilder::try_start) to handle the failure yourself.
    pub async fn start(self) -> MockServer {
        self.try_start()
            .await
            .unwrap_or_else(|e| panic!("Failed to start the mock server: {}", e))
    }
}
