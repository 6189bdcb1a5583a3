use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::error;
use tokio::sync::{oneshot, Notify};

use crate::mock_server::hyper::{run_server, ServerState, ShutdownCause};
use crate::{Error, MockRegistry};

pub(super) type ShutdownHook = Box<dyn FnOnce() + Send + 'static>;

/// Everything [`BareMockServer::start`] needs, gathered by the builder.
pub(super) struct ServerSettings {
    pub(super) listener: TcpListener,
    pub(super) registry: MockRegistry,
    pub(super) shutdown_grace_period: Duration,
    pub(super) shutdown_hook: Option<ShutdownHook>,
    #[cfg(feature = "tls")]
    pub(super) tls: Option<Arc<tokio_rustls::rustls::ServerConfig>>,
}

/// An HTTP web-server running in the background, answering requests out of a [`MockRegistry`].
///
/// `BareMockServer` is the actual mock server behind the publicly-exposed `MockServer`. It runs
/// on its own thread with a single-threaded `tokio` runtime, so it can be driven from tests
/// running on any async runtime.
pub(crate) struct BareMockServer {
    registry: MockRegistry,
    server_address: SocketAddr,
    scheme: &'static str,
    // When `shutdown_trigger` is used or dropped the listening server terminates gracefully.
    shutdown_trigger: Option<oneshot::Sender<()>>,
    shutdown_completed: Option<oneshot::Receiver<()>>,
}

impl BareMockServer {
    /// Start serving on the (already bound) listener found in `settings`.
    pub(super) fn start(settings: ServerSettings) -> Result<Self, Error> {
        let ServerSettings {
            listener,
            registry,
            shutdown_grace_period,
            shutdown_hook,
            #[cfg(feature = "tls")]
            tls,
        } = settings;

        listener.set_nonblocking(true)?;
        let server_address = listener.local_addr()?;

        #[cfg(feature = "tls")]
        let scheme = if tls.is_some() { "https" } else { "http" };
        #[cfg(not(feature = "tls"))]
        let scheme = "http";

        let state = Arc::new(ServerState {
            registry: registry.clone(),
            admin_shutdown: shutdown_hook.as_ref().map(|_| Arc::new(Notify::new())),
            #[cfg(feature = "tls")]
            tls: tls.map(tokio_rustls::TlsAcceptor::from),
        });

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (shutdown_trigger, shutdown_receiver) = oneshot::channel();
        let (completion_sender, shutdown_completed) = oneshot::channel();

        thread::Builder::new()
            .name(format!("server-mocker-{}", server_address.port()))
            .spawn(move || {
                let outcome = runtime.block_on(run_server(
                    listener,
                    state,
                    shutdown_grace_period,
                    shutdown_receiver,
                ));
                // Tasks still owned by the runtime go away with it.
                drop(runtime);

                match outcome {
                    Ok(ShutdownCause::Admin) => {
                        if let Some(hook) = shutdown_hook {
                            hook();
                        }
                    }
                    Ok(ShutdownCause::Requested) => {}
                    Err(e) => error!("Mock server on {} failed: {}", server_address, e),
                }
                let _ = completion_sender.send(());
            })?;

        Ok(Self {
            registry,
            server_address,
            scheme,
            shutdown_trigger: Some(shutdown_trigger),
            shutdown_completed: Some(shutdown_completed),
        })
    }

    pub(crate) fn registry(&self) -> &MockRegistry {
        &self.registry
    }

    /// Clear the registry, stop the server and wait until its port is released.
    ///
    /// Calling it more than once is harmless.
    pub(crate) async fn shutdown(&mut self) {
        self.registry.clear_all();
        if let Some(trigger) = self.shutdown_trigger.take() {
            let _ = trigger.send(());
        }
        if let Some(completed) = self.shutdown_completed.take() {
            // An error means the server thread is gone already.
            let _ = completed.await;
        }
    }

    /// Return the base uri of this running instance of `BareMockServer`, e.g. `http://127.0.0.1:4372`.
    pub(crate) fn uri(&self) -> String {
        format!("{}://{}", self.scheme, self.server_address)
    }

    /// Return the socket address of this running instance of `BareMockServer`, e.g. `127.0.0.1:4372`.
    pub(crate) fn address(&self) -> &SocketAddr {
        &self.server_address
    }
}
