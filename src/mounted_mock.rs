use std::sync::Arc;

use crate::{Match, Request, Respond};

/// A registration as held by the [`MockSet`](crate::mock_set::MockSet): the predicates that
/// select it, the producer of its response and, for entries created with `mock`, the log of
/// the requests it matched.
pub(crate) struct MountedMock {
    matchers: Vec<Box<dyn Match>>,
    responder: Arc<dyn Respond>,
    spy: Option<Vec<Request>>,
}

impl MountedMock {
    pub(crate) fn new(
        matchers: Vec<Box<dyn Match>>,
        responder: Arc<dyn Respond>,
        track_calls: bool,
    ) -> Self {
        Self {
            matchers,
            responder,
            spy: track_calls.then(Vec::new),
        }
    }

    /// This is NOT the same of `matches` from the `Match` trait!
    /// Key difference: we are taking a mutable reference to `self` in order to record the
    /// matched request in the spy log, if call tracking is enabled for this entry.
    pub(crate) fn matches(&mut self, request: &Request) -> bool {
        let matched = self
            .matchers
            .iter()
            .all(|matcher| matcher.matches(request));

        if matched {
            if let Some(calls) = &mut self.spy {
                calls.push(request.clone());
            }
        }

        matched
    }

    pub(crate) fn responder(&self) -> Arc<dyn Respond> {
        self.responder.clone()
    }

    /// The requests matched so far. Always empty for entries without call tracking.
    pub(crate) fn calls(&self) -> &[Request] {
        self.spy.as_deref().unwrap_or_default()
    }
}
