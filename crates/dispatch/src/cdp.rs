use std::sync::Arc;

use serde_json::{json, Value};

use bidi_core_types::{BrowsingContextId, CdpSessionId, ProtocolError, ProtocolResult};
use cdp_mux::{CdpConnection, MuxError};

use crate::parser::{GetCdpSessionParams, SendCdpCommandParams};

/// Resolves which CDP session a browsing context is attached through. Owned
/// by the browsingContext domain; consumed here for `cdp.getSession`.
pub trait SessionResolver: Send + Sync {
    /// `Err` for an unknown context, `Ok(None)` for a context without an
    /// attached session.
    fn session_for_context(
        &self,
        context: &BrowsingContextId,
    ) -> ProtocolResult<Option<CdpSessionId>>;
}

/// The raw-CDP escape hatch: expose session lookup and pass-through command
/// sending over the multiplexer.
pub struct CdpProcessor {
    connection: Arc<CdpConnection>,
    sessions: Arc<dyn SessionResolver>,
}

impl CdpProcessor {
    pub fn new(connection: Arc<CdpConnection>, sessions: Arc<dyn SessionResolver>) -> Self {
        Self {
            connection,
            sessions,
        }
    }

    pub fn get_session(&self, params: GetCdpSessionParams) -> ProtocolResult<Value> {
        match self.sessions.session_for_context(&params.context)? {
            Some(session) => Ok(json!({ "cdpSession": session.0 })),
            None => Ok(json!({})),
        }
    }

    pub async fn send_command(&self, params: SendCdpCommandParams) -> ProtocolResult<Value> {
        let client = match &params.cdp_session {
            Some(session) => self
                .connection
                .get_cdp_client(session)
                .map_err(mux_to_protocol)?,
            None => self.connection.browser_client(),
        };
        let result = client
            .send_command(&params.cdp_method, params.cdp_params)
            .await
            .map_err(mux_to_protocol)?;
        Ok(json!({ "result": result }))
    }
}

fn mux_to_protocol(err: MuxError) -> ProtocolError {
    match err {
        MuxError::UnknownSession(session) => {
            ProtocolError::invalid_session_id(format!("Unknown CDP session id '{session}'"))
        }
        other => ProtocolError::unknown_error(other.to_string(), None),
    }
}
