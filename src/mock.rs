use std::sync::Arc;

use crate::mock_guard::{MockGuard, StubGuard};
use crate::{MockRegistry, Request, Response};

/// Anything that implements `Match` can be used to select the requests a registration
/// responds to.
///
/// `Match` is the extension point of the crate: the [`matchers`] module covers the common
/// cases, and you can write your own criteria.
///
/// Predicates are expected to be free of side effects: the registry may evaluate them on
/// every incoming request, while holding its lock. A predicate that panics fails the request
/// being handled (the server answers with a `500`), it is not retried.
///
/// ```rust
/// use server_mocker::{text, Match, MockServer, Request};
///
/// // Match requests whose `custom` header has an odd length.
/// pub struct OddHeaderMatcher(&'static str);
///
/// impl Match for OddHeaderMatcher {
///     fn matches(&self, request: &Request) -> bool {
///         match request.header(self.0) {
///             Some(value) => value.len() % 2 == 1,
///             None => false,
///         }
///     }
/// }
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::builder()
///         .on_response_not_found(|_| {})
///         .start()
///         .await;
///     mock_server.stub(OddHeaderMatcher("custom")).returns(text("odd"));
///
///     let client = reqwest::Client::new();
///
///     // Even length
///     let status = client.get(mock_server.uri())
///         .header("custom", "even")
///         .send()
///         .await
///         .unwrap()
///         .status();
///     assert_eq!(status, 404);
///
///     // Odd length
///     let status = client.get(mock_server.uri())
///         .header("custom", "odd")
///         .send()
///         .await
///         .unwrap()
///         .status();
///     assert_eq!(status, 200);
/// }
/// ```
///
/// Closures that take a reference to a [`Request`] and return a boolean implement `Match`
/// automatically:
///
/// ```rust
/// use server_mocker::{text, MockRegistry, Request};
/// use server_mocker::http::Method;
///
/// let registry = MockRegistry::new();
/// registry
///     .stub(|request: &Request| request.url_param("message") == Some("ping"))
///     .returns(text("pong"));
///
/// let request = Request::new(Method::GET, "/").with_url_param("message", "ping");
/// let response = registry.handle(request).unwrap().unwrap();
/// assert_eq!(response.content, "pong");
/// ```
///
/// [`matchers`]: crate::matchers
pub trait Match: Send + Sync {
    /// Given a reference to a `Request`, determine if it should match or not given
    /// a specific criterion.
    fn matches(&self, request: &Request) -> bool;
}

/// Implement the `Match` trait for all closures, out of the box,
/// if their signature is compatible.
impl<F> Match for F
where
    F: Fn(&Request) -> bool,
    F: Send + Sync,
{
    fn matches(&self, request: &Request) -> bool {
        // Just call the closure itself!
        self(request)
    }
}

/// Returned by [`MockRegistry::stub`]: add more predicates with [`and`](StubBuilder::and),
/// then register a fixed response with [`returns`](StubBuilder::returns).
pub struct StubBuilder {
    registry: MockRegistry,
    matchers: Vec<Box<dyn Match>>,
}

impl StubBuilder {
    pub(crate) fn new(registry: MockRegistry, matcher: Box<dyn Match>) -> Self {
        Self {
            registry,
            matchers: vec![matcher],
        }
    }

    /// Add another predicate: the registration only matches requests satisfying all of them.
    pub fn and<M: Match + 'static>(mut self, matcher: M) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }

    /// Register `response`, without call tracking. The registration takes priority over every
    /// registration made before it.
    pub fn returns(self, response: Response) -> StubGuard {
        let StubBuilder { registry, matchers } = self;
        let mock_id = registry.register(matchers, Arc::new(response), false);
        StubGuard::new(mock_id, registry)
    }
}

/// Returned by [`MockRegistry::mock`]: add more predicates with [`and`](MockBuilder::and),
/// then register a fixed response with [`returns`](MockBuilder::returns).
pub struct MockBuilder {
    registry: MockRegistry,
    matchers: Vec<Box<dyn Match>>,
}

impl MockBuilder {
    pub(crate) fn new(registry: MockRegistry, matcher: Box<dyn Match>) -> Self {
        Self {
            registry,
            matchers: vec![matcher],
        }
    }

    /// Add another predicate: the registration only matches requests satisfying all of them.
    pub fn and<M: Match + 'static>(mut self, matcher: M) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }

    /// Register `response` with call tracking: the returned [`MockGuard`] answers questions
    /// about the requests it matched.
    pub fn returns(self, response: Response) -> MockGuard {
        let MockBuilder { registry, matchers } = self;
        let mock_id = registry.register(matchers, Arc::new(response), true);
        MockGuard::new(mock_id, registry)
    }
}
