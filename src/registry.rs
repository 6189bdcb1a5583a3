use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, error};

use crate::mock::{MockBuilder, StubBuilder};
use crate::mock_guard::StubGuard;
use crate::mock_set::{MockId, MockSet};
use crate::mounted_mock::MountedMock;
use crate::request::BodyPrintLimit;
use crate::{Error, Match, Request, Respond, Response};

pub(crate) type NotFoundHandler = Arc<dyn Fn(&Request) + Send + Sync>;

/// The registration-matching-and-dispatch engine behind every [`MockServer`].
///
/// A `MockRegistry` holds an ordered list of registrations and the log of every request it
/// handled. It can be driven without any network involved - that's what [`MockServer`] does
/// for each request it receives, calling [`handle`](MockRegistry::handle).
///
/// ## Priority
///
/// The most recent registration wins: when several registrations match the same request,
/// the one registered last produces the response.
///
/// ## Concurrency
///
/// `MockRegistry` is a cheap handle: clones share the same state. Every operation locks that
/// state, so registrations, removals and lookups are atomic with respect to each other even
/// when requests are served concurrently.
///
/// [`MockServer`]: crate::MockServer
#[derive(Clone)]
pub struct MockRegistry {
    mock_set: Arc<RwLock<MockSet>>,
    not_found_handler: Option<NotFoundHandler>,
    body_print_limit: BodyPrintLimit,
}

impl MockRegistry {
    /// An empty registry. Unmatched requests are a hard failure, see
    /// [`handle`](MockRegistry::handle).
    pub fn new() -> Self {
        Self {
            mock_set: Arc::new(RwLock::new(MockSet::new())),
            not_found_handler: None,
            body_print_limit: BodyPrintLimit::default(),
        }
    }

    /// Invoke `handler` with every request that no registration matches, instead of failing.
    pub fn with_not_found_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request) + Send + Sync + 'static,
    {
        self.not_found_handler = Some(Arc::new(handler));
        self
    }

    /// Limit the size of the request body printed in [`Error::ResponseNotFound`].
    pub fn with_body_print_limit(mut self, limit: BodyPrintLimit) -> Self {
        self.body_print_limit = limit;
        self
    }

    pub(crate) fn with_handler(mut self, handler: Option<NotFoundHandler>) -> Self {
        self.not_found_handler = handler;
        self
    }

    /// Start a registration without call tracking, answered with a fixed [`Response`].
    ///
    /// ```rust
    /// use server_mocker::{text, MockRegistry, Request};
    /// use server_mocker::http::Method;
    /// use server_mocker::matchers::method;
    ///
    /// let registry = MockRegistry::new();
    /// let stub = registry.stub(method("GET")).returns(text("hello"));
    ///
    /// let response = registry.handle(Request::new(Method::GET, "/")).unwrap();
    /// assert_eq!(response.unwrap().content, "hello");
    ///
    /// stub.clear();
    /// assert!(registry.handle(Request::new(Method::GET, "/")).is_err());
    /// ```
    pub fn stub<M: Match + 'static>(&self, matcher: M) -> StubBuilder {
        StubBuilder::new(self.clone(), Box::new(matcher))
    }

    /// Start a registration with call tracking, answered with a fixed [`Response`].
    ///
    /// ```rust
    /// use server_mocker::{text, MockRegistry, Request};
    /// use server_mocker::http::Method;
    /// use server_mocker::matchers::query_param;
    ///
    /// let registry = MockRegistry::new();
    /// let ping = registry.mock(query_param("message", "ping")).returns(text("pong"));
    /// assert!(!ping.called());
    ///
    /// let request = Request::new(Method::GET, "/").with_url_param("message", "ping");
    /// registry.handle(request).unwrap();
    ///
    /// assert!(ping.called_once());
    /// assert_eq!(ping.call_count(), 1);
    /// ```
    pub fn mock<M: Match + 'static>(&self, matcher: M) -> MockBuilder {
        MockBuilder::new(self.clone(), Box::new(matcher))
    }

    /// Register a response computed from each matching request.
    ///
    /// No call tracking is attached: capture what you need from inside `implementation`.
    pub fn mock_implementation<M, R>(&self, matcher: M, implementation: R) -> StubGuard
    where
        M: Match + 'static,
        R: Respond + 'static,
    {
        let matcher: Box<dyn Match> = Box::new(matcher);
        let mock_id = self.register(vec![matcher], Arc::new(implementation), false);
        StubGuard::new(mock_id, self.clone())
    }

    /// Answer `request`.
    ///
    /// The request is appended to the request log whatever the outcome. Registrations are then
    /// scanned newest-first and the first one whose predicates all match produces the response.
    ///
    /// When nothing matches:
    /// - with a not-found handler configured, the handler is invoked once with the request and
    ///   `Ok(None)` is returned: there is no response to write;
    /// - otherwise, [`Error::ResponseNotFound`] is returned, carrying the request.
    ///
    /// A panicking predicate or response producer is not caught.
    pub fn handle(&self, request: Request) -> Result<Option<Response>, Error> {
        let responder = self.write().handle_request(&request);

        // The lock is released: producers are free to use the registry themselves.
        match responder {
            Some(responder) => Ok(Some(responder.respond(&request))),
            None => match &self.not_found_handler {
                Some(handler) => {
                    debug!("No registration matched, invoking the not-found handler.");
                    handler(&request);
                    Ok(None)
                }
                None => {
                    let error = Error::response_not_found(request, self.body_print_limit);
                    error!("{}", error);
                    Err(error)
                }
            },
        }
    }

    /// Drop every registration and forget every received request.
    ///
    /// Handles returned by earlier registrations stay valid: clearing them is a no-op.
    pub fn clear_all(&self) {
        self.write().reset();
    }

    /// All the requests handled since the registry was created or last cleared, in arrival
    /// order - matched or not.
    pub fn requests(&self) -> Vec<Request> {
        self.read().received_requests().to_vec()
    }

    pub(crate) fn register(
        &self,
        matchers: Vec<Box<dyn Match>>,
        responder: Arc<dyn Respond>,
        track_calls: bool,
    ) -> MockId {
        self.write()
            .register(MountedMock::new(matchers, responder, track_calls))
    }

    // A predicate that panicked while we were holding the lock has already been reported on its
    // own request. The set is left consistent, so we keep going instead of propagating the poison.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, MockSet> {
        self.mock_set.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, MockSet> {
        self.mock_set.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mock_set = self.read();
        f.debug_struct("MockRegistry")
            .field("registrations", &mock_set.len())
            .field("received_requests", &mock_set.received_requests().len())
            .field("not_found_handler", &self.not_found_handler.is_some())
            .finish()
    }
}
