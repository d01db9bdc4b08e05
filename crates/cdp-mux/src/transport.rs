use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::{MuxError, MuxResult};

/// The physical byte-message boundary consumed by the multiplexer.
///
/// Framing (WebSocket, pipe, stdio) lives behind this trait; the multiplexer
/// only sees serialized CDP messages going out and coming in.
#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn send_message(&self, raw: String) -> MuxResult<()>;
    /// Next inbound message, or `None` once the transport has ended.
    async fn next_message(&self) -> Option<String>;
    /// Tear down the channel. Idempotent.
    async fn close(&self);
}

/// In-memory transport half used by tests and local wiring: everything sent
/// through [`CdpTransport::send_message`] shows up on the paired
/// [`TransportHandle`], and messages injected through the handle are yielded
/// by [`CdpTransport::next_message`].
pub struct PairedTransport {
    incoming: Mutex<mpsc::UnboundedReceiver<String>>,
    outgoing: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
}

/// Peer half of a [`PairedTransport`].
pub struct TransportHandle {
    /// Inject a raw message as if the browser had sent it.
    pub to_mux: mpsc::UnboundedSender<String>,
    /// Everything the multiplexer wrote to the wire, in order.
    pub from_mux: mpsc::UnboundedReceiver<String>,
}

impl PairedTransport {
    pub fn pair() -> (Arc<Self>, TransportHandle) {
        let (to_mux, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_mux) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                incoming: Mutex::new(incoming),
                outgoing,
                closed: AtomicBool::new(false),
            }),
            TransportHandle { to_mux, from_mux },
        )
    }
}

#[async_trait]
impl CdpTransport for PairedTransport {
    async fn send_message(&self, raw: String) -> MuxResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(MuxError::TransportClosed);
        }
        self.outgoing
            .send(raw)
            .map_err(|_| MuxError::TransportClosed)
    }

    async fn next_message(&self) -> Option<String> {
        if self.closed.load(Ordering::Relaxed) {
            return None;
        }
        self.incoming.lock().await.recv().await
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::Relaxed) {
            self.incoming.lock().await.close();
        }
    }
}
