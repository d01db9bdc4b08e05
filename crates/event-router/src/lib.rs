//! Decides, per client channel and per browsing context, which events are
//! delivered, replayed or suppressed, preserving strict ordering.
//!
//! [`EventRouter`] assigns every registered event a globally unique,
//! strictly increasing sequence id at registration time, regardless of
//! whether the payload has resolved yet. Buffer-eligible event classes are
//! kept in bounded per-(class, context) rings for replay to late
//! subscribers; a last-sent marker per (class, context, channel) guarantees
//! a resubscribing channel never sees a sequence id twice.

pub mod buffer;
pub mod context;
pub mod names;
pub mod outbound;
pub mod router;
pub mod subscription;

pub use buffer::EventBuffer;
pub use context::{ContextStore, InMemoryContextStore};
pub use outbound::{
    pending_payload, ready_payload, spawn_outbound_writer, EventPayload, OutboundSink,
    OutgoingMessage,
};
pub use router::EventRouter;
pub use subscription::SubscriptionRegistry;
