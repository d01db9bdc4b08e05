use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use bidi_core_types::CdpSessionId;

use crate::connection::ConnectionInner;
use crate::error::MuxResult;

/// Per-client listener table and identity. Shared between the connection's
/// routing loop and the public [`CdpClient`] handles.
pub(crate) struct ClientState {
    pub(crate) session_id: Option<CdpSessionId>,
    listeners: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Value>>>>,
}

impl ClientState {
    pub(crate) fn new(session_id: Option<CdpSessionId>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            listeners: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn subscribe(&self, method: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .entry(method.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Invoke every listener registered for `method`, in registration order.
    /// Listeners whose receiver is gone are pruned.
    pub(crate) fn emit(&self, method: &str, params: Value) {
        let mut listeners = self.listeners.lock();
        if let Some(senders) = listeners.get_mut(method) {
            senders.retain(|tx| tx.send(params.clone()).is_ok());
        }
    }
}

/// Virtual client for one CDP target session (or the root browser session
/// when [`CdpClient::session_id`] is `None`). Cheap to clone.
#[derive(Clone)]
pub struct CdpClient {
    pub(crate) state: Arc<ClientState>,
    pub(crate) conn: Arc<ConnectionInner>,
}

impl std::fmt::Debug for CdpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpClient")
            .field("session_id", &self.state.session_id)
            .finish_non_exhaustive()
    }
}

impl CdpClient {
    pub fn session_id(&self) -> Option<&CdpSessionId> {
        self.state.session_id.as_ref()
    }

    /// Register a listener for the exact CDP event name. Returns the stream
    /// of event params routed to this client for that name.
    pub fn on(&self, method: &str) -> mpsc::UnboundedReceiver<Value> {
        self.state.subscribe(method)
    }

    /// Send a CDP command on this client's session and await the correlated
    /// response. A `Value::Null` params payload is omitted from the wire.
    pub async fn send_command(&self, method: &str, params: Value) -> MuxResult<Value> {
        self.conn
            .send_command(self.state.session_id.clone(), method, params)
            .await
    }
}
