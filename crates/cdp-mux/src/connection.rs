use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use bidi_core_types::CdpSessionId;

use crate::client::{CdpClient, ClientState};
use crate::error::{MuxError, MuxResult};
use crate::transport::CdpTransport;

/// Demultiplexes one physical CDP transport into virtual session clients.
///
/// The routing loop runs in a spawned task. Session-table mutations happen
/// inside that loop, so a message is never routed to a session that was
/// already detached, and always routes to one whose attach notification was
/// fully processed.
pub struct CdpConnection {
    inner: Arc<ConnectionInner>,
    reader: JoinHandle<()>,
}

pub(crate) struct ConnectionInner {
    transport: Arc<dyn CdpTransport>,
    root: Arc<ClientState>,
    sessions: Mutex<HashMap<String, Arc<ClientState>>>,
    inflight: Mutex<HashMap<u64, oneshot::Sender<MuxResult<Value>>>>,
    next_call_id: AtomicU64,
    closed: AtomicBool,
}

impl CdpConnection {
    pub fn new(transport: Arc<dyn CdpTransport>) -> Self {
        let inner = Arc::new(ConnectionInner {
            transport,
            root: ClientState::new(None),
            sessions: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            next_call_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        let reader = tokio::spawn(ConnectionInner::run(inner.clone()));
        Self { inner, reader }
    }

    /// The root/browser-level client. Always exists, carries no session id.
    pub fn browser_client(&self) -> CdpClient {
        CdpClient {
            state: self.inner.root.clone(),
            conn: self.inner.clone(),
        }
    }

    /// Look up the virtual client for an attached session. Detached or never
    /// attached ids are a routing error, not a silent drop.
    pub fn get_cdp_client(&self, session_id: &CdpSessionId) -> MuxResult<CdpClient> {
        let state = self
            .inner
            .sessions
            .lock()
            .get(&session_id.0)
            .cloned()
            .ok_or_else(|| MuxError::UnknownSession(session_id.0.clone()))?;
        Ok(CdpClient {
            state,
            conn: self.inner.clone(),
        })
    }

    /// Tear down the transport and every session entry. Idempotent.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.transport.close().await;
        self.inner.sessions.lock().clear();
        self.inner.fail_inflight(MuxError::TransportClosed);
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl ConnectionInner {
    async fn run(inner: Arc<Self>) {
        while let Some(raw) = inner.transport.next_message().await {
            if let Err(err) = inner.route(&raw) {
                warn!(target: "cdp-mux", %err, "failed to route inbound cdp message");
            }
        }
        inner.fail_inflight(MuxError::TransportClosed);
    }

    fn route(&self, raw: &str) -> MuxResult<()> {
        let message: Value =
            serde_json::from_str(raw).map_err(|err| MuxError::Malformed(err.to_string()))?;

        // The session table must be updated before the message itself is
        // dispatched, so listeners registered against a fresh client do not
        // miss messages racing the attach notification.
        match message.get("method").and_then(Value::as_str) {
            Some("Target.attachedToTarget") => self.attach(&message)?,
            Some("Target.detachedFromTarget") => self.detach(&message),
            _ => {}
        }

        if let Some(id) = message.get("id").and_then(Value::as_u64) {
            self.resolve_response(id, &message);
            return Ok(());
        }

        if let Some(method) = message.get("method").and_then(Value::as_str) {
            let params = message.get("params").cloned().unwrap_or_else(|| json!({}));
            let client = match message.get("sessionId").and_then(Value::as_str) {
                Some(session_id) => self
                    .sessions
                    .lock()
                    .get(session_id)
                    .cloned()
                    .ok_or_else(|| MuxError::UnknownSession(session_id.to_string()))?,
                None => self.root.clone(),
            };
            client.emit(method, params);
        }
        Ok(())
    }

    fn attach(&self, message: &Value) -> MuxResult<()> {
        let session_id = message
            .pointer("/params/sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MuxError::Malformed("Target.attachedToTarget without sessionId".into())
            })?;

        let mut sessions = self.sessions.lock();
        if sessions.contains_key(session_id) {
            // Fatal to this attach only; the connection stays up.
            return Err(MuxError::SessionAlreadyAttached(session_id.to_string()));
        }
        debug!(target: "cdp-mux", session_id, "cdp session attached");
        sessions.insert(
            session_id.to_string(),
            ClientState::new(Some(CdpSessionId::new(session_id))),
        );
        Ok(())
    }

    fn detach(&self, message: &Value) {
        let Some(session_id) = message.pointer("/params/sessionId").and_then(Value::as_str)
        else {
            debug!(target: "cdp-mux", "Target.detachedFromTarget without sessionId");
            return;
        };
        if self.sessions.lock().remove(session_id).is_some() {
            debug!(target: "cdp-mux", session_id, "cdp session detached");
        }
    }

    fn resolve_response(&self, id: u64, message: &Value) {
        let Some(sender) = self.inflight.lock().remove(&id) else {
            debug!(target: "cdp-mux", call_id = id, "response for unknown call id");
            return;
        };

        let result = if let Some(error) = message.get("error") {
            Err(MuxError::Cdp {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        } else {
            Ok(message.get("result").cloned().unwrap_or_else(|| json!({})))
        };
        let _ = sender.send(result);
    }

    pub(crate) async fn send_command(
        &self,
        session: Option<CdpSessionId>,
        method: &str,
        params: Value,
    ) -> MuxResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MuxError::TransportClosed);
        }

        let id = self.next_call_id.fetch_add(1, Ordering::SeqCst);

        let mut message = serde_json::Map::new();
        message.insert("id".into(), json!(id));
        message.insert("method".into(), json!(method));
        if !params.is_null() {
            message.insert("params".into(), params);
        }
        if let Some(session) = &session {
            message.insert("sessionId".into(), json!(session.0));
        }
        let raw = Value::Object(message).to_string();

        let (resp_tx, resp_rx) = oneshot::channel();
        self.inflight.lock().insert(id, resp_tx);

        if let Err(err) = self.transport.send_message(raw).await {
            self.inflight.lock().remove(&id);
            return Err(err);
        }

        resp_rx.await.map_err(|_| MuxError::TransportClosed)?
    }

    fn fail_inflight(&self, err: MuxError) {
        for (_, sender) in self.inflight.lock().drain() {
            let _ = sender.send(Err(err.clone()));
        }
    }
}
