use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use bidi_core_types::{BrowsingContextId, Channel, Event, ProtocolResult};

use crate::buffer::EventBuffer;
use crate::context::ContextStore;
use crate::names::{buffer_capacity, check_event_name, unroll_event_names};
use crate::outbound::{ready_payload, EventPayload, OutgoingMessage};
use crate::subscription::SubscriptionRegistry;

/// An event plus its global sequence id and the context it belongs to.
/// Internal to the router and its buffers; never crosses the crate boundary.
#[derive(Clone)]
pub(crate) struct EventWrapper {
    pub(crate) seq: u64,
    pub(crate) context: Option<BrowsingContextId>,
    pub(crate) payload: EventPayload,
}

type BufferKey = (String, Option<BrowsingContextId>);
type MarkerKey = (String, Option<BrowsingContextId>, Option<Channel>);

struct RouterState {
    registry: SubscriptionRegistry,
    buffers: HashMap<BufferKey, EventBuffer<EventWrapper>>,
    // Contexts that ever produced a given event class; needed to
    // reconstruct replay for "all contexts" subscriptions.
    event_contexts: HashMap<String, HashSet<Option<BrowsingContextId>>>,
    // Highest sequence id already delivered per (event, context, channel).
    // Monotonically non-decreasing.
    last_sent: HashMap<MarkerKey, u64>,
}

/// Accepts produced events, buffers the buffer-eligible ones, and fans them
/// out to every currently subscribed channel through the outbound queue.
///
/// All mutable state sits behind one mutex and sequence ids are taken while
/// it is held, so ids, buffer insertion order and markers stay linearized no
/// matter how many tasks register events concurrently.
pub struct EventRouter {
    store: Arc<dyn ContextStore>,
    outbound: mpsc::UnboundedSender<OutgoingMessage>,
    next_seq: AtomicU64,
    state: Mutex<RouterState>,
}

impl EventRouter {
    pub fn new(
        store: Arc<dyn ContextStore>,
        outbound: mpsc::UnboundedSender<OutgoingMessage>,
    ) -> Self {
        Self {
            store,
            outbound,
            // Sequence ids start at 1 so an absent marker (0) never masks
            // the first event.
            next_seq: AtomicU64::new(1),
            state: Mutex::new(RouterState {
                registry: SubscriptionRegistry::new(),
                buffers: HashMap::new(),
                event_contexts: HashMap::new(),
                last_sent: HashMap::new(),
            }),
        }
    }

    /// Register an already-resolved event.
    pub fn register_event(&self, event: Event, context: Option<BrowsingContextId>) {
        let event_name = event.method.clone();
        self.register_payload(ready_payload(event), context, &event_name);
    }

    /// Register an event whose payload is still being computed. The sequence
    /// id and the subscription fan-out happen now, synchronously, so ordering
    /// reflects registration order; the payload is awaited only on the
    /// outbound path. A payload that later fails still consumed its slot.
    pub fn register_pending_event(
        &self,
        payload: EventPayload,
        context: Option<BrowsingContextId>,
        event_name: &str,
    ) {
        self.register_payload(payload, context, event_name);
    }

    fn register_payload(
        &self,
        payload: EventPayload,
        context: Option<BrowsingContextId>,
        event_name: &str,
    ) {
        let mut state = self.state.lock();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let wrapper = EventWrapper {
            seq,
            context,
            payload,
        };

        state.buffer_event(&wrapper, event_name);

        let channels = state
            .registry
            .channels_subscribed_to_event(event_name, wrapper.context.as_ref());
        for channel in channels {
            if self
                .outbound
                .send(OutgoingMessage {
                    payload: wrapper.payload.clone(),
                    channel: channel.clone(),
                })
                .is_err()
            {
                debug!(target: "event-router", event_name, "outbound queue closed");
            }
            state.mark_event_sent(&wrapper, channel.as_ref(), event_name);
        }
    }

    /// Subscribe `channel` to the given event classes for the given contexts
    /// (`None` = all current and future contexts), replaying buffered events
    /// the channel has not seen yet, oldest first.
    ///
    /// Validation is all-or-nothing: an unknown event name or an unknown
    /// explicitly-named context fails the whole call before any state change.
    pub fn subscribe(
        &self,
        event_names: &[String],
        contexts: &[Option<BrowsingContextId>],
        channel: Option<&Channel>,
    ) -> ProtocolResult<()> {
        for name in event_names {
            check_event_name(name)?;
        }
        for context in contexts.iter().flatten() {
            self.store.expect_context(context)?;
        }

        let mut state = self.state.lock();
        for name in event_names {
            for event_name in unroll_event_names(name) {
                for context in contexts {
                    state.registry.subscribe(&event_name, context.as_ref(), channel);
                    let replay = state.buffered_events(
                        self.store.as_ref(),
                        &event_name,
                        context.as_ref(),
                        channel,
                    );
                    for wrapper in replay {
                        // The order of replayed events is significant.
                        if self
                            .outbound
                            .send(OutgoingMessage {
                                payload: wrapper.payload.clone(),
                                channel: channel.cloned(),
                            })
                            .is_err()
                        {
                            debug!(target: "event-router", %event_name, "outbound queue closed");
                        }
                        state.mark_event_sent(&wrapper, channel, &event_name);
                    }
                }
            }
        }
        Ok(())
    }

    /// Drop subscriptions. Buffers and markers survive so a later
    /// re-subscribe does not re-deliver already-sent sequence ids.
    pub fn unsubscribe(
        &self,
        event_names: &[String],
        contexts: &[Option<BrowsingContextId>],
        channel: Option<&Channel>,
    ) -> ProtocolResult<()> {
        for name in event_names {
            check_event_name(name)?;
        }
        let unrolled: Vec<String> = event_names
            .iter()
            .flat_map(|name| unroll_event_names(name))
            .collect();
        self.state
            .lock()
            .registry
            .unsubscribe_all(&unrolled, contexts, channel)
    }
}

impl RouterState {
    fn buffer_event(&mut self, wrapper: &EventWrapper, event_name: &str) {
        let Some(capacity) = buffer_capacity(event_name) else {
            return;
        };
        self.buffers
            .entry((event_name.to_string(), wrapper.context.clone()))
            .or_insert_with(|| EventBuffer::new(capacity))
            .add(wrapper.clone());
        self.event_contexts
            .entry(event_name.to_string())
            .or_default()
            .insert(wrapper.context.clone());
    }

    fn mark_event_sent(
        &mut self,
        wrapper: &EventWrapper,
        channel: Option<&Channel>,
        event_name: &str,
    ) {
        if buffer_capacity(event_name).is_none() {
            return;
        }
        let marker = self
            .last_sent
            .entry((
                event_name.to_string(),
                wrapper.context.clone(),
                channel.cloned(),
            ))
            .or_insert(0);
        *marker = (*marker).max(wrapper.seq);
    }

    /// Buffered events for the key that `channel` has not been sent yet, in
    /// ascending sequence order. A global (`None`) key additionally gathers
    /// the buffers of every still-live context that ever emitted the class.
    fn buffered_events(
        &self,
        store: &dyn ContextStore,
        event_name: &str,
        context: Option<&BrowsingContextId>,
        channel: Option<&Channel>,
    ) -> Vec<EventWrapper> {
        let last_sent = self
            .last_sent
            .get(&(
                event_name.to_string(),
                context.cloned(),
                channel.cloned(),
            ))
            .copied()
            .unwrap_or(0);

        let mut result: Vec<EventWrapper> = self
            .buffers
            .get(&(event_name.to_string(), context.cloned()))
            .map(|buffer| {
                buffer
                    .get()
                    .filter(|wrapper| wrapper.seq > last_sent)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if context.is_none() {
            if let Some(contexts) = self.event_contexts.get(event_name) {
                let mut live: Vec<BrowsingContextId> = contexts
                    .iter()
                    .flatten()
                    .filter(|context| store.has_context(context))
                    .cloned()
                    .collect();
                live.sort();
                for context in &live {
                    result.extend(self.buffered_events(
                        store,
                        event_name,
                        Some(context),
                        channel,
                    ));
                }
            }
        }

        result.sort_by_key(|wrapper| wrapper.seq);
        result
    }
}
