use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error};

use bidi_core_types::{Command, CommandResponse, ErrorCode, ProtocolError, ProtocolResult};

use crate::cdp::CdpProcessor;
use crate::handler::DomainHandler;
use crate::method::Method;
use crate::network::NetworkProcessor;
use crate::parser::BidiParser;
use crate::session::SessionProcessor;

/// Resolves each command to its domain handler and converts every outcome
/// into a response envelope.
pub struct CommandDispatcher {
    parser: Arc<dyn BidiParser>,
    session: SessionProcessor,
    network: NetworkProcessor,
    cdp: CdpProcessor,
    domains: Arc<dyn DomainHandler>,
}

impl CommandDispatcher {
    pub fn new(
        parser: Arc<dyn BidiParser>,
        session: SessionProcessor,
        cdp: CdpProcessor,
        domains: Arc<dyn DomainHandler>,
    ) -> Self {
        Self {
            parser,
            session,
            network: NetworkProcessor::new(),
            cdp,
            domains,
        }
    }

    /// The sole entry point. Never fails across this boundary: protocol
    /// failures become protocol error responses, anything else becomes an
    /// `unknown error` response, and the dispatcher survives all of them.
    /// Commands are processed independently; run one call per command.
    pub async fn process(&self, command: Command) -> CommandResponse {
        debug!(target: "dispatch", id = command.id, method = %command.method, "processing command");

        let outcome = match Method::from_name(&command.method) {
            Some(method) => {
                AssertUnwindSafe(self.process_resolved(method, &command))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(ProtocolError::unknown_error(
                            panic_message(panic.as_ref()),
                            None,
                        ))
                    })
            }
            None => Err(ProtocolError::unknown_command(format!(
                "Unknown command '{}'.",
                command.method
            ))),
        };

        match outcome {
            Ok(result) => CommandResponse::success(command.id, result),
            Err(err) => {
                if err.code == ErrorCode::UnknownError {
                    // Diagnostic surface for unexpected internal failures.
                    error!(target: "dispatch", id = command.id, method = %command.method, %err, "command failed unexpectedly");
                }
                err.to_error_response(command.id)
            }
        }
    }

    async fn process_resolved(&self, method: Method, command: &Command) -> ProtocolResult<Value> {
        let params = command.params.clone();
        match method {
            // Recognized but not implemented by the mapper; falls through to
            // the same failure the resolution miss produces.
            Method::BrowserClose | Method::SessionNew | Method::SessionEnd => {
                Err(ProtocolError::unknown_command(format!(
                    "Unknown command '{}'.",
                    method.as_str()
                )))
            }

            Method::SessionStatus => self.session.status(),
            Method::SessionSubscribe => self.session.subscribe(
                self.parser.parse_subscribe_params(params)?,
                command.channel.as_ref(),
            ),
            Method::SessionUnsubscribe => self.session.unsubscribe(
                self.parser.parse_subscribe_params(params)?,
                command.channel.as_ref(),
            ),

            Method::CdpGetSession => self
                .cdp
                .get_session(self.parser.parse_get_cdp_session_params(params)?),
            Method::CdpSendCommand => {
                self.cdp
                    .send_command(self.parser.parse_send_cdp_command_params(params)?)
                    .await
            }

            Method::NetworkAddIntercept => self
                .network
                .add_intercept(self.parser.parse_add_intercept_params(params)?),
            Method::NetworkRemoveIntercept => self
                .network
                .remove_intercept(self.parser.parse_remove_intercept_params(params)?),
            Method::NetworkContinueRequest
            | Method::NetworkContinueResponse
            | Method::NetworkContinueWithAuth
            | Method::NetworkFailRequest
            | Method::NetworkProvideResponse => self.network.not_implemented(),

            Method::BrowsingContextActivate
            | Method::BrowsingContextCaptureScreenshot
            | Method::BrowsingContextClose
            | Method::BrowsingContextCreate
            | Method::BrowsingContextGetTree
            | Method::BrowsingContextHandleUserPrompt
            | Method::BrowsingContextNavigate
            | Method::BrowsingContextPrint
            | Method::BrowsingContextReload
            | Method::BrowsingContextSetViewport
            | Method::InputPerformActions
            | Method::InputReleaseActions
            | Method::ScriptAddPreloadScript
            | Method::ScriptCallFunction
            | Method::ScriptDisown
            | Method::ScriptEvaluate
            | Method::ScriptGetRealms
            | Method::ScriptRemovePreloadScript => self.domains.handle(method, params).await,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "command handler panicked".to_string()
    }
}
