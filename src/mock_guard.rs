use std::fmt;

use crate::mock_set::MockId;
use crate::{MockRegistry, Request};

/// Handle to a registration made with [`stub`] or [`mock_implementation`].
///
/// Dropping the guard does **not** remove the registration: it stays effective until
/// [`clear`](StubGuard::clear) or [`MockRegistry::clear_all`] is called.
///
/// [`stub`]: crate::MockRegistry::stub
/// [`mock_implementation`]: crate::MockRegistry::mock_implementation
pub struct StubGuard {
    mock_id: MockId,
    registry: MockRegistry,
}

impl StubGuard {
    pub(crate) fn new(mock_id: MockId, registry: MockRegistry) -> Self {
        Self { mock_id, registry }
    }

    /// Remove exactly this registration. Calling it again, or after
    /// [`MockRegistry::clear_all`], does nothing.
    pub fn clear(&self) {
        self.registry.write().deactivate(self.mock_id);
    }
}

/// Handle to a registration made with [`mock`]: on top of removing it, you can ask how many
/// requests it matched.
///
/// Only requests that this registration actually answered are counted: a request answered by
/// a more recent registration is not.
/// Once the registration is removed (with [`clear`](MockGuard::clear) or
/// [`MockRegistry::clear_all`]) its call log is gone: the guard reports zero calls.
///
/// ```rust
/// use server_mocker::{text, MockServer};
/// use server_mocker::matchers::query_param;
///
/// #[async_std::main]
/// async fn main() {
///     // Arrange
///     let mock_server = MockServer::start().await;
///     let ping = mock_server.mock(query_param("message", "ping")).returns(text("pong"));
///     let pong = mock_server.mock(query_param("message", "pong")).returns(text("ping"));
///
///     // Act
///     reqwest::get(format!("{}?message=ping", mock_server.uri())).await.unwrap();
///
///     // Assert
///     assert!(ping.called());
///     assert!(!pong.called());
/// }
/// ```
///
/// [`mock`]: crate::MockRegistry::mock
pub struct MockGuard {
    mock_id: MockId,
    registry: MockRegistry,
}

impl MockGuard {
    pub(crate) fn new(mock_id: MockId, registry: MockRegistry) -> Self {
        Self { mock_id, registry }
    }

    /// `true` if at least one request matched this registration.
    pub fn called(&self) -> bool {
        self.call_count() > 0
    }

    /// `true` if exactly one request matched this registration.
    pub fn called_once(&self) -> bool {
        self.call_count() == 1
    }

    /// The number of requests this registration answered.
    pub fn call_count(&self) -> usize {
        self.registry
            .read()
            .get(self.mock_id)
            .map_or(0, |mock| mock.calls().len())
    }

    /// The requests this registration answered, in arrival order.
    pub fn calls(&self) -> Vec<Request> {
        self.registry
            .read()
            .get(self.mock_id)
            .map(|mock| mock.calls().to_vec())
            .unwrap_or_default()
    }

    /// Remove exactly this registration. Calling it again, or after
    /// [`MockRegistry::clear_all`], does nothing.
    pub fn clear(&self) {
        self.registry.write().deactivate(self.mock_id);
    }
}

impl fmt::Debug for StubGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubGuard")
            .field("mock_id", &self.mock_id)
            .finish()
    }
}

impl fmt::Debug for MockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockGuard")
            .field("mock_id", &self.mock_id)
            .field("call_count", &self.call_count())
            .finish()
    }
}
