use std::io;
use std::net::SocketAddr;

use crate::request::{BodyPrintLimit, Request};

/// Everything that can go wrong while serving mocked responses.
///
/// Engine-level failures ([`ResponseNotFound`], [`HandlerPanicked`]) point at a misconfigured
/// test. Malformed client input ([`BodyParse`], [`ReadBody`])
/// only fails the request that carried it.
///
/// [`ResponseNotFound`]: Error::ResponseNotFound
/// [`HandlerPanicked`]: Error::HandlerPanicked
/// [`BodyParse`]: Error::BodyParse
/// [`ReadBody`]: Error::ReadBody
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("response not found for request\n{rendered}")]
    ResponseNotFound {
        request: Box<Request>,
        rendered: String,
    },
    #[error("cannot parse `{content_type}` request body: {reason}")]
    BodyParse { content_type: String, reason: String },
    #[error("cannot read request body: {0}")]
    ReadBody(#[source] hyper::Error),
    #[error("request handling panicked: {0}")]
    HandlerPanicked(String),
    #[error("cannot build response: {0}")]
    InvalidResponse(#[from] http::Error),
    #[error("cannot bind mock server to {0}: {1}")]
    Bind(SocketAddr, #[source] io::Error),
    #[error("mock server I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn response_not_found(request: Request, body_print_limit: BodyPrintLimit) -> Self {
        let mut rendered = String::new();
        // Writing into a `String` cannot fail.
        let _ = request.print_with_limit(&mut rendered, body_print_limit);
        Error::ResponseNotFound {
            request: Box::new(request),
            rendered,
        }
    }

    pub(crate) fn body_parse(content_type: &str, reason: impl ToString) -> Self {
        Error::BodyParse {
            content_type: content_type.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The request that did not match any registration, if this is a [`Error::ResponseNotFound`].
    pub fn unmatched_request(&self) -> Option<&Request> {
        match self {
            Error::ResponseNotFound { request, .. } => Some(&**request),
            _ => None,
        }
    }
}
