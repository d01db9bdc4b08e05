use async_trait::async_trait;
use serde_json::Value;

use bidi_core_types::{ProtocolError, ProtocolResult};

use crate::method::Method;

/// Opaque seam for the command families implemented outside this crate
/// (browsingContext, script and input). The dispatcher resolves the method
/// and forwards the raw params; the handler owns their semantics.
#[async_trait]
pub trait DomainHandler: Send + Sync {
    async fn handle(&self, method: Method, params: Value) -> ProtocolResult<Value>;
}

/// Default handler for deployments without those domains wired in.
pub struct UnimplementedDomainHandler;

#[async_trait]
impl DomainHandler for UnimplementedDomainHandler {
    async fn handle(&self, method: Method, _params: Value) -> ProtocolResult<Value> {
        Err(ProtocolError::unknown_command(format!(
            "Unknown command '{}'.",
            method.as_str()
        )))
    }
}
