use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use bidi_core_types::{Channel, Event, ProtocolResult};

/// An event payload that may still be pending. Shared so one resolution
/// fans out to every subscribed channel; awaited only at transmission time,
/// never at registration.
pub type EventPayload = Shared<BoxFuture<'static, ProtocolResult<Event>>>;

pub fn ready_payload(event: Event) -> EventPayload {
    future::ready(Ok(event)).boxed().shared()
}

pub fn pending_payload<F>(fut: F) -> EventPayload
where
    F: std::future::Future<Output = ProtocolResult<Event>> + Send + 'static,
{
    fut.boxed().shared()
}

/// One entry on the outbound emission queue.
pub struct OutgoingMessage {
    pub payload: EventPayload,
    pub channel: Option<Channel>,
}

/// Where resolved events leave the core, optionally tagged with the channel
/// they were subscribed on. Implemented over the client-facing transport.
#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn send_event(&self, event: Event, channel: Option<Channel>);
}

/// Drains the emission queue in FIFO order, awaiting each payload before
/// moving to the next, which keeps replay-then-live ordering intact per
/// channel. Payloads that resolved to a failure occupied their sequence
/// slot but produce no delivery.
pub fn spawn_outbound_writer(
    mut queue: mpsc::UnboundedReceiver<OutgoingMessage>,
    sink: Arc<dyn OutboundSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            match message.payload.await {
                Ok(event) => sink.send_event(event, message.channel).await,
                Err(err) => {
                    warn!(target: "event-router", %err, "dropping failed event payload");
                }
            }
        }
    })
}
