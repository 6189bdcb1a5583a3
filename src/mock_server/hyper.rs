use std::any::Any;
use std::convert::Infallible;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ServerBuilder;
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinSet;

use crate::mock_server::SHUTDOWN_PATH;
use crate::{normalize, Error, MockRegistry};

pub(super) const SHUTDOWN_ACKNOWLEDGEMENT: &str = "server-mocker shutting down";

/// What every connection task needs to answer requests.
pub(super) struct ServerState {
    pub(super) registry: MockRegistry,
    /// Present when the administrative shutdown path is enabled.
    pub(super) admin_shutdown: Option<Arc<Notify>>,
    #[cfg(feature = "tls")]
    pub(super) tls: Option<tokio_rustls::TlsAcceptor>,
}

/// Why the accept loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ShutdownCause {
    /// The `MockServer` was closed or dropped.
    Requested,
    /// A request hit [`SHUTDOWN_PATH`].
    Admin,
}

/// The actual HTTP server responding to incoming requests according to the registry.
///
/// Returns once the listener has been dropped and every connection has either finished or been
/// aborted after `grace_period`.
pub(super) async fn run_server(
    listener: std::net::TcpListener,
    state: Arc<ServerState>,
    grace_period: Duration,
    mut shutdown_signal: oneshot::Receiver<()>,
) -> Result<ShutdownCause, Error> {
    let listener = TcpListener::from_std(listener)?;
    let address = listener.local_addr()?;
    let admin_shutdown = state.admin_shutdown.clone();
    let (drain_trigger, drain) = watch::channel(false);
    let mut connections = JoinSet::new();

    info!("Mock server listening on {}.", address);
    let cause = loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {}.", peer);
                    connections.spawn(handle_connection(stream, state.clone(), drain.clone()));
                }
                Err(e) => warn!("Failed to accept a connection: {}", e),
            },
            // Resolves when the trigger is used or dropped.
            _ = &mut shutdown_signal => break ShutdownCause::Requested,
            _ = admin_notified(admin_shutdown.as_deref()) => break ShutdownCause::Admin,
            Some(outcome) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = outcome {
                    warn!("A connection task failed: {}", e);
                }
            }
        }
    };

    drop(listener);
    state.registry.clear_all();
    info!("Mock server on {} stopped listening.", address);

    let _ = drain_trigger.send(true);
    if tokio::time::timeout(grace_period, drain_all(&mut connections))
        .await
        .is_err()
    {
        warn!(
            "{} connection(s) still open on {} after {:?}, terminating them.",
            connections.len(),
            address,
            grace_period
        );
        connections.abort_all();
        drain_all(&mut connections).await;
    }

    Ok(cause)
}

async fn admin_notified(notify: Option<&Notify>) {
    match notify {
        Some(notify) => notify.notified().await,
        None => futures::future::pending().await,
    }
}

async fn drain_all(connections: &mut JoinSet<()>) {
    while connections.join_next().await.is_some() {}
}

#[cfg(feature = "tls")]
async fn handle_connection(
    stream: TcpStream,
    state: Arc<ServerState>,
    drain: watch::Receiver<bool>,
) {
    match state.tls.clone() {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(stream) => serve_connection(stream, state, drain).await,
            Err(e) => warn!("TLS handshake failed: {}", e),
        },
        None => serve_connection(stream, state, drain).await,
    }
}

#[cfg(not(feature = "tls"))]
async fn handle_connection(
    stream: TcpStream,
    state: Arc<ServerState>,
    drain: watch::Receiver<bool>,
) {
    serve_connection(stream, state, drain).await
}

/// Serve HTTP/1.1 or HTTP/2 on `stream` until the client goes away or the server drains.
async fn serve_connection<S>(stream: S, state: Arc<ServerState>, mut drain: watch::Receiver<bool>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let builder = ServerBuilder::new(TokioExecutor::new());
    let connection = builder.serve_connection(
        TokioIo::new(stream),
        service_fn(move |request| handle_request(request, state.clone())),
    );
    tokio::pin!(connection);

    let outcome = tokio::select! {
        outcome = connection.as_mut() => outcome,
        _ = drain.changed() => {
            connection.as_mut().graceful_shutdown();
            connection.as_mut().await
        }
    };
    if let Err(e) = outcome {
        warn!("Connection closed with an error: {}", e);
    }
}

async fn handle_request(
    request: hyper::Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
    if let Some(admin_shutdown) = &state.admin_shutdown {
        if request.uri().path() == SHUTDOWN_PATH {
            info!("Shutdown requested through {}.", SHUTDOWN_PATH);
            admin_shutdown.notify_one();
            return Ok(plain_response(StatusCode::OK, SHUTDOWN_ACKNOWLEDGEMENT));
        }
    }

    Ok(respond(request, &state.registry)
        .await
        .unwrap_or_else(|e| error_response(&e)))
}

async fn respond(
    request: hyper::Request<Incoming>,
    registry: &MockRegistry,
) -> Result<hyper::Response<Full<Bytes>>, Error> {
    let (parts, body) = request.into_parts();
    let body = body.collect().await.map_err(Error::ReadBody)?.to_bytes();
    let request = normalize(parts.method, &parts.uri, &parts.headers, body).await?;

    let response = panic::catch_unwind(AssertUnwindSafe(|| registry.handle(request)))
        .map_err(|payload| Error::HandlerPanicked(panic_message(payload)))??;

    match response {
        Some(response) => Ok(response.to_hyper()?),
        // The not-found handler already ran, there is nothing to write.
        None => Ok(plain_response(StatusCode::NOT_FOUND, "")),
    }
}

fn error_response(error: &Error) -> hyper::Response<Full<Bytes>> {
    let status = match error {
        Error::ResponseNotFound { .. } => StatusCode::NOT_FOUND,
        Error::BodyParse { .. } | Error::ReadBody(_) => {
            warn!("{}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => {
            error!("{}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    plain_response(status, error.to_string())
}

fn plain_response(status: StatusCode, body: impl Into<Bytes>) -> hyper::Response<Full<Bytes>> {
    let mut response = hyper::Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
