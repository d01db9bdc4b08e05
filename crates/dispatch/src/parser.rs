//! Parameter decoding seam. The dispatcher never interprets raw params
//! itself; it hands them to an injected [`BidiParser`], and parse failures
//! surface as `invalid argument`, a different error kind than an unknown
//! command.

use serde::Deserialize;
use serde_json::Value;

use bidi_core_types::{BrowsingContextId, CdpSessionId, ProtocolError, ProtocolResult};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub events: Vec<String>,
    #[serde(default)]
    pub contexts: Option<Vec<BrowsingContextId>>,
}

/// Request-interception phases an intercept rule can hook.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterceptPhase {
    BeforeRequestSent,
    ResponseStarted,
    AuthRequired,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddInterceptParams {
    #[serde(default)]
    pub url_patterns: Vec<String>,
    #[serde(default)]
    pub phases: Vec<InterceptPhase>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemoveInterceptParams {
    pub intercept: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GetCdpSessionParams {
    pub context: BrowsingContextId,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCdpCommandParams {
    pub cdp_method: String,
    #[serde(default)]
    pub cdp_params: Value,
    #[serde(default)]
    pub cdp_session: Option<CdpSessionId>,
}

/// Decodes raw command params into their typed shapes.
pub trait BidiParser: Send + Sync {
    fn parse_subscribe_params(&self, params: Value) -> ProtocolResult<SubscriptionRequest>;
    fn parse_add_intercept_params(&self, params: Value) -> ProtocolResult<AddInterceptParams>;
    fn parse_remove_intercept_params(&self, params: Value) -> ProtocolResult<RemoveInterceptParams>;
    fn parse_get_cdp_session_params(&self, params: Value) -> ProtocolResult<GetCdpSessionParams>;
    fn parse_send_cdp_command_params(&self, params: Value) -> ProtocolResult<SendCdpCommandParams>;
}

fn decode<T: serde::de::DeserializeOwned>(params: Value) -> ProtocolResult<T> {
    serde_json::from_value(params).map_err(|err| ProtocolError::invalid_argument(err.to_string()))
}

/// Structural serde decoding without schema-level validation. A stricter
/// parser can be injected in its place.
#[derive(Default)]
pub struct DefaultParser;

impl BidiParser for DefaultParser {
    fn parse_subscribe_params(&self, params: Value) -> ProtocolResult<SubscriptionRequest> {
        decode(params)
    }

    fn parse_add_intercept_params(&self, params: Value) -> ProtocolResult<AddInterceptParams> {
        decode(params)
    }

    fn parse_remove_intercept_params(&self, params: Value) -> ProtocolResult<RemoveInterceptParams> {
        decode(params)
    }

    fn parse_get_cdp_session_params(&self, params: Value) -> ProtocolResult<GetCdpSessionParams> {
        decode(params)
    }

    fn parse_send_cdp_command_params(&self, params: Value) -> ProtocolResult<SendCdpCommandParams> {
        decode(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_params_decode_contexts_optionally() {
        let parser = DefaultParser;
        let request = parser
            .parse_subscribe_params(json!({"events": ["log.entryAdded"]}))
            .unwrap();
        assert_eq!(request.events, vec!["log.entryAdded"]);
        assert!(request.contexts.is_none());

        let request = parser
            .parse_subscribe_params(json!({"events": [], "contexts": ["A"]}))
            .unwrap();
        assert_eq!(
            request.contexts,
            Some(vec![BrowsingContextId::new("A")])
        );
    }

    #[test]
    fn malformed_params_are_invalid_argument() {
        let parser = DefaultParser;
        let err = parser
            .parse_add_intercept_params(json!({"urlPatterns": 42}))
            .unwrap_err();
        assert_eq!(err.code, bidi_core_types::ErrorCode::InvalidArgument);
    }

    #[test]
    fn intercept_phases_use_wire_casing() {
        let parser = DefaultParser;
        let params = parser
            .parse_add_intercept_params(
                json!({"urlPatterns": [], "phases": ["beforeRequestSent", "authRequired"]}),
            )
            .unwrap();
        assert_eq!(
            params.phases,
            vec![InterceptPhase::BeforeRequestSent, InterceptPhase::AuthRequired]
        );
    }
}
