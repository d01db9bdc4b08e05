use std::collections::HashSet;

use parking_lot::Mutex;

use bidi_core_types::{BrowsingContextId, ProtocolError, ProtocolResult};

/// Liveness oracle for browsing contexts, consumed by the replay logic to
/// reject subscriptions to unknown contexts and to exclude deleted contexts
/// from global replay. The real store lives with the browsingContext domain.
pub trait ContextStore: Send + Sync {
    fn has_context(&self, id: &BrowsingContextId) -> bool;

    /// Assert the context is known; unknown ids referenced explicitly are a
    /// failure, never silently ignored.
    fn expect_context(&self, id: &BrowsingContextId) -> ProtocolResult<()> {
        if self.has_context(id) {
            Ok(())
        } else {
            Err(ProtocolError::no_such_frame(format!(
                "Context {id} not found"
            )))
        }
    }
}

/// Set-backed store for tests and local wiring.
#[derive(Default)]
pub struct InMemoryContextStore {
    contexts: Mutex<HashSet<BrowsingContextId>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_context(&self, id: BrowsingContextId) {
        self.contexts.lock().insert(id);
    }

    pub fn remove_context(&self, id: &BrowsingContextId) {
        self.contexts.lock().remove(id);
    }
}

impl ContextStore for InMemoryContextStore {
    fn has_context(&self, id: &BrowsingContextId) -> bool {
        self.contexts.lock().contains(id)
    }
}
