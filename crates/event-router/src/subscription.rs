use std::collections::{BTreeMap, HashMap};

use bidi_core_types::{BrowsingContextId, Channel, ProtocolError, ProtocolResult};

use crate::names::raw_module_of;

type EventPriorities = HashMap<String, u64>;
type ContextSubscriptions = HashMap<Option<BrowsingContextId>, EventPriorities>;

/// Tracks which channels are subscribed to which event classes, globally or
/// per browsing context, and resolves delivery ordering.
///
/// Every first-time subscription gets a priority from a monotonic counter;
/// [`SubscriptionRegistry::channels_subscribed_to_event`] orders channels by
/// the best (lowest) priority among their matching subscriptions, which is
/// deterministic for a given subscription state and yields each channel at
/// most once. Event names are stored unrolled to concrete events; the only
/// module key kept verbatim is the raw `cdp` escape hatch.
#[derive(Default)]
pub struct SubscriptionRegistry {
    priority_counter: u64,
    // channel (None = default) -> context (None = global) -> event -> priority
    subscriptions: BTreeMap<Option<Channel>, ContextSubscriptions>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription. Re-subscribing an already-subscribed key is a
    /// no-op and keeps the original priority.
    pub fn subscribe(
        &mut self,
        event_name: &str,
        context: Option<&BrowsingContextId>,
        channel: Option<&Channel>,
    ) {
        let events = self
            .subscriptions
            .entry(channel.cloned())
            .or_default()
            .entry(context.cloned())
            .or_default();
        if !events.contains_key(event_name) {
            let priority = self.priority_counter;
            self.priority_counter += 1;
            events.insert(event_name.to_string(), priority);
        }
    }

    /// Channels that must receive `event_method` emitted in `context`, in
    /// subscription priority order. A global subscription covers every
    /// context; a context-specific one only its own.
    pub fn channels_subscribed_to_event(
        &self,
        event_method: &str,
        context: Option<&BrowsingContextId>,
    ) -> Vec<Option<Channel>> {
        let mut ranked: Vec<(u64, Option<Channel>)> = self
            .subscriptions
            .iter()
            .filter_map(|(channel, contexts)| {
                Self::subscription_priority(contexts, event_method, context)
                    .map(|priority| (priority, channel.clone()))
            })
            .collect();
        ranked.sort_by_key(|(priority, _)| *priority);
        ranked.into_iter().map(|(_, channel)| channel).collect()
    }

    fn subscription_priority(
        contexts: &ContextSubscriptions,
        event_method: &str,
        context: Option<&BrowsingContextId>,
    ) -> Option<u64> {
        let mut relevant: Vec<Option<BrowsingContextId>> = vec![None];
        if let Some(context) = context {
            relevant.push(Some(context.clone()));
        }

        let mut best: Option<u64> = None;
        for key in &relevant {
            let Some(events) = contexts.get(key) else {
                continue;
            };
            for candidate in Self::matching_names(event_method) {
                if let Some(priority) = events.get(candidate).copied() {
                    best = Some(best.map_or(priority, |b: u64| b.min(priority)));
                }
            }
        }
        best
    }

    fn matching_names(event_method: &str) -> impl Iterator<Item = &str> {
        std::iter::once(event_method).chain(raw_module_of(event_method))
    }

    /// Remove a batch of subscriptions, all-or-nothing: every (event,
    /// context) pair must currently be subscribed on `channel`, otherwise
    /// nothing is removed. Buffers and markers are not touched here.
    pub fn unsubscribe_all(
        &mut self,
        event_names: &[String],
        contexts: &[Option<BrowsingContextId>],
        channel: Option<&Channel>,
    ) -> ProtocolResult<()> {
        let channel_key = channel.cloned();
        let mut removals: Vec<(Option<BrowsingContextId>, &String)> = Vec::new();

        for event_name in event_names {
            for context in contexts {
                let subscribed = self
                    .subscriptions
                    .get(&channel_key)
                    .and_then(|contexts_map| contexts_map.get(context))
                    .map_or(false, |events| events.contains_key(event_name));
                if !subscribed {
                    return Err(ProtocolError::invalid_argument(format!(
                        "Cannot unsubscribe from {event_name}: no subscription found"
                    )));
                }
                removals.push((context.clone(), event_name));
            }
        }

        if let Some(contexts_map) = self.subscriptions.get_mut(&channel_key) {
            for (context, event_name) in removals {
                if let Some(events) = contexts_map.get_mut(&context) {
                    events.remove(event_name);
                    if events.is_empty() {
                        contexts_map.remove(&context);
                    }
                }
            }
            if contexts_map.is_empty() {
                self.subscriptions.remove(&channel_key);
            }
        }
        Ok(())
    }
}
