use crate::{Request, Response};

/// Anything that implements `Respond` can produce the reply to a request matched by a
/// registration.
///
/// ## Fixed responses
///
/// The simplest `Respond` is [`Response`] itself: no matter the request, it always returns a
/// copy of itself. That's what [`stub`] and [`mock`] register.
///
/// ## Dynamic responses
///
/// Closures taking a `&Request` and returning a [`Response`] implement `Respond` too, and can
/// be registered with [`mock_implementation`] to compute the reply from the request data:
///
/// ```rust
/// use server_mocker::{text, MockServer, Request};
/// use server_mocker::matchers::path;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     mock_server.mock_implementation(path("/echo"), |request: &Request| {
///         text(request.url_param("message").unwrap_or_default())
///     });
///
///     // Act
///     let body = reqwest::get(format!("{}/echo?message=hello", mock_server.uri()))
///         .await
///         .unwrap()
///         .text()
///         .await
///         .unwrap();
///
///     // Assert
///     assert_eq!(body, "hello");
/// }
/// ```
///
/// Producers run outside of the registry lock, but synchronously on the server task: the server
/// does not provide cancellation nor timeouts for slow producers.
///
/// [`stub`]: crate::MockRegistry::stub
/// [`mock`]: crate::MockRegistry::mock
/// [`mock_implementation`]: crate::MockRegistry::mock_implementation
pub trait Respond: Send + Sync {
    /// Given a reference to a [`Request`] return the [`Response`] that the [`MockServer`]
    /// writes back to the client.
    ///
    /// [`MockServer`]: crate::MockServer
    fn respond(&self, request: &Request) -> Response;
}

impl Respond for Response {
    fn respond(&self, _request: &Request) -> Response {
        self.clone()
    }
}

impl<F> Respond for F
where
    F: Send + Sync + Fn(&Request) -> Response,
{
    fn respond(&self, request: &Request) -> Response {
        (self)(request)
    }
}
