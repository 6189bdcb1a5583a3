use std::sync::Arc;

use log::debug;

use crate::mounted_mock::MountedMock;
use crate::{Request, Respond};

/// The identity of a registration.
///
/// Ids are never reused within a `MockSet`, even across resets: two registrations with equal
/// predicates and responses are still told apart, and a handle that outlived its entry cannot
/// remove a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MockId(u64);

/// The ordered registry of entries plus the log of every request handled since the last reset.
///
/// Entries are kept in registration order and scanned newest-first: when several entries
/// match the same request, the most recently registered one wins.
pub(crate) struct MockSet {
    mocks: Vec<(MockId, MountedMock)>,
    received_requests: Vec<Request>,
    next_id: u64,
}

impl MockSet {
    /// Create a new instance of MockSet.
    pub(crate) fn new() -> MockSet {
        MockSet {
            mocks: vec![],
            received_requests: vec![],
            next_id: 0,
        }
    }

    /// Log `request` and look for the entry that should produce its response.
    ///
    /// The request is logged before any predicate runs, so a predicate that panics leaves the
    /// set consistent.
    pub(crate) fn handle_request(&mut self, request: &Request) -> Option<Arc<dyn Respond>> {
        debug!("Handling request.");
        self.received_requests.push(request.clone());

        self.mocks
            .iter_mut()
            .rev()
            .find_map(|(id, mock)| {
                if mock.matches(request) {
                    debug!("Request matched entry {:?}.", id);
                    Some(mock.responder())
                } else {
                    None
                }
            })
    }

    pub(crate) fn register(&mut self, mock: MountedMock) -> MockId {
        let id = MockId(self.next_id);
        self.next_id += 1;
        self.mocks.push((id, mock));
        id
    }

    /// Remove the entry with the given identity. Returns `false` if it was already gone.
    pub(crate) fn deactivate(&mut self, id: MockId) -> bool {
        match self.mocks.iter().position(|(mock_id, _)| *mock_id == id) {
            Some(index) => {
                self.mocks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop every entry and forget every received request.
    pub(crate) fn reset(&mut self) {
        self.mocks.clear();
        self.received_requests.clear();
    }

    pub(crate) fn received_requests(&self) -> &[Request] {
        &self.received_requests
    }

    pub(crate) fn get(&self, id: MockId) -> Option<&MountedMock> {
        self.mocks
            .iter()
            .find(|(mock_id, _)| *mock_id == id)
            .map(|(_, mock)| mock)
    }

    pub(crate) fn len(&self) -> usize {
        self.mocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{text, Match, Response};
    use http::Method;

    fn entry<M: Match + 'static>(matcher: M, response: Response, track_calls: bool) -> MountedMock {
        let matcher: Box<dyn Match> = Box::new(matcher);
        MountedMock::new(vec![matcher], Arc::new(response), track_calls)
    }

    fn respond(set: &mut MockSet, request: &Request) -> Option<Response> {
        set.handle_request(request)
            .map(|responder| responder.respond(request))
    }

    fn any_request() -> Request {
        Request::new(Method::GET, "/")
    }

    #[test]
    fn the_most_recent_matching_entry_wins() {
        let mut set = MockSet::new();
        set.register(entry(|_: &Request| true, text("first"), false));
        set.register(entry(|_: &Request| true, text("second"), false));
        set.register(entry(|_: &Request| false, text("never"), false));

        let response = respond(&mut set, &any_request()).unwrap();

        assert_eq!(response.content, "second");
    }

    #[test]
    fn unmatched_requests_are_logged_too() {
        let mut set = MockSet::new();
        set.register(entry(|_: &Request| false, text("never"), false));

        assert!(respond(&mut set, &any_request()).is_none());
        assert!(respond(&mut set, &any_request()).is_none());

        assert_eq!(set.received_requests().len(), 2);
    }

    #[test]
    fn deactivate_removes_exactly_one_of_two_identical_entries() {
        let mut set = MockSet::new();
        let first = set.register(entry(|_: &Request| true, text("same"), false));
        let second = set.register(entry(|_: &Request| true, text("same"), false));

        assert!(set.deactivate(second));

        assert_eq!(set.len(), 1);
        assert!(set.get(first).is_some());
        assert_eq!(respond(&mut set, &any_request()).unwrap().content, "same");
    }

    #[test]
    fn deactivating_a_missing_entry_is_a_no_op() {
        let mut set = MockSet::new();
        let id = set.register(entry(|_: &Request| true, text("hi"), false));
        set.register(entry(|_: &Request| true, text("hello"), false));

        assert!(set.deactivate(id));
        assert!(!set.deactivate(id));

        assert_eq!(set.len(), 1);
        assert_eq!(respond(&mut set, &any_request()).unwrap().content, "hello");
    }

    #[test]
    fn ids_are_not_reused_after_a_reset() {
        let mut set = MockSet::new();
        let stale = set.register(entry(|_: &Request| true, text("old"), false));
        set.reset();
        let fresh = set.register(entry(|_: &Request| true, text("new"), false));

        assert_ne!(stale, fresh);
        assert!(!set.deactivate(stale));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn reset_forgets_entries_and_requests() {
        let mut set = MockSet::new();
        set.register(entry(|_: &Request| true, text("hi"), false));
        respond(&mut set, &any_request());

        set.reset();

        assert_eq!(set.len(), 0);
        assert!(set.received_requests().is_empty());
        assert!(respond(&mut set, &any_request()).is_none());
    }

    #[test]
    fn only_the_selected_entry_records_the_call() {
        let mut set = MockSet::new();
        let older = set.register(entry(|_: &Request| true, text("older"), true));
        let newer = set.register(entry(|_: &Request| true, text("newer"), true));

        respond(&mut set, &any_request());

        assert_eq!(set.get(newer).unwrap().calls().len(), 1);
        assert!(set.get(older).unwrap().calls().is_empty());
    }

    #[test]
    fn entries_without_call_tracking_keep_no_calls() {
        let mut set = MockSet::new();
        let id = set.register(entry(|_: &Request| true, text("hi"), false));

        respond(&mut set, &any_request());

        assert!(set.get(id).unwrap().calls().is_empty());
    }
}
