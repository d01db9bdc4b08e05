use std::sync::Arc;

use serde_json::{json, Value};

use bidi_core_types::{BrowsingContextId, Channel, ProtocolResult};
use bidi_event_router::EventRouter;

use crate::parser::SubscriptionRequest;

/// Session-domain command processor: status plus the subscribe/unsubscribe
/// surface over the event router.
pub struct SessionProcessor {
    router: Arc<EventRouter>,
}

impl SessionProcessor {
    pub fn new(router: Arc<EventRouter>) -> Self {
        Self { router }
    }

    /// The mapper is already attached to a browser, so it cannot accept a
    /// new session.
    pub fn status(&self) -> ProtocolResult<Value> {
        Ok(json!({"ready": false, "message": "already connected"}))
    }

    pub fn subscribe(
        &self,
        request: SubscriptionRequest,
        channel: Option<&Channel>,
    ) -> ProtocolResult<Value> {
        let contexts = unpack_contexts(request.contexts);
        self.router.subscribe(&request.events, &contexts, channel)?;
        Ok(json!({}))
    }

    pub fn unsubscribe(
        &self,
        request: SubscriptionRequest,
        channel: Option<&Channel>,
    ) -> ProtocolResult<Value> {
        let contexts = unpack_contexts(request.contexts);
        self.router.unsubscribe(&request.events, &contexts, channel)?;
        Ok(json!({}))
    }
}

/// Omitted contexts mean "all current and future contexts".
fn unpack_contexts(contexts: Option<Vec<BrowsingContextId>>) -> Vec<Option<BrowsingContextId>> {
    match contexts {
        None => vec![None],
        Some(contexts) => contexts.into_iter().map(Some).collect(),
    }
}
