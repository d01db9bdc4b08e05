/// The known command set. Resolution is an exact string match against these
/// names; anything else is an unknown command carrying the literal name.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Method {
    BrowserClose,
    BrowsingContextActivate,
    BrowsingContextCaptureScreenshot,
    BrowsingContextClose,
    BrowsingContextCreate,
    BrowsingContextGetTree,
    BrowsingContextHandleUserPrompt,
    BrowsingContextNavigate,
    BrowsingContextPrint,
    BrowsingContextReload,
    BrowsingContextSetViewport,
    CdpGetSession,
    CdpSendCommand,
    InputPerformActions,
    InputReleaseActions,
    NetworkAddIntercept,
    NetworkContinueRequest,
    NetworkContinueResponse,
    NetworkContinueWithAuth,
    NetworkFailRequest,
    NetworkProvideResponse,
    NetworkRemoveIntercept,
    ScriptAddPreloadScript,
    ScriptCallFunction,
    ScriptDisown,
    ScriptEvaluate,
    ScriptGetRealms,
    ScriptRemovePreloadScript,
    SessionEnd,
    SessionNew,
    SessionStatus,
    SessionSubscribe,
    SessionUnsubscribe,
}

impl Method {
    pub const ALL: &'static [Method] = &[
        Method::BrowserClose,
        Method::BrowsingContextActivate,
        Method::BrowsingContextCaptureScreenshot,
        Method::BrowsingContextClose,
        Method::BrowsingContextCreate,
        Method::BrowsingContextGetTree,
        Method::BrowsingContextHandleUserPrompt,
        Method::BrowsingContextNavigate,
        Method::BrowsingContextPrint,
        Method::BrowsingContextReload,
        Method::BrowsingContextSetViewport,
        Method::CdpGetSession,
        Method::CdpSendCommand,
        Method::InputPerformActions,
        Method::InputReleaseActions,
        Method::NetworkAddIntercept,
        Method::NetworkContinueRequest,
        Method::NetworkContinueResponse,
        Method::NetworkContinueWithAuth,
        Method::NetworkFailRequest,
        Method::NetworkProvideResponse,
        Method::NetworkRemoveIntercept,
        Method::ScriptAddPreloadScript,
        Method::ScriptCallFunction,
        Method::ScriptDisown,
        Method::ScriptEvaluate,
        Method::ScriptGetRealms,
        Method::ScriptRemovePreloadScript,
        Method::SessionEnd,
        Method::SessionNew,
        Method::SessionStatus,
        Method::SessionSubscribe,
        Method::SessionUnsubscribe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::BrowserClose => "browser.close",
            Method::BrowsingContextActivate => "browsingContext.activate",
            Method::BrowsingContextCaptureScreenshot => "browsingContext.captureScreenshot",
            Method::BrowsingContextClose => "browsingContext.close",
            Method::BrowsingContextCreate => "browsingContext.create",
            Method::BrowsingContextGetTree => "browsingContext.getTree",
            Method::BrowsingContextHandleUserPrompt => "browsingContext.handleUserPrompt",
            Method::BrowsingContextNavigate => "browsingContext.navigate",
            Method::BrowsingContextPrint => "browsingContext.print",
            Method::BrowsingContextReload => "browsingContext.reload",
            Method::BrowsingContextSetViewport => "browsingContext.setViewport",
            Method::CdpGetSession => "cdp.getSession",
            Method::CdpSendCommand => "cdp.sendCommand",
            Method::InputPerformActions => "input.performActions",
            Method::InputReleaseActions => "input.releaseActions",
            Method::NetworkAddIntercept => "network.addIntercept",
            Method::NetworkContinueRequest => "network.continueRequest",
            Method::NetworkContinueResponse => "network.continueResponse",
            Method::NetworkContinueWithAuth => "network.continueWithAuth",
            Method::NetworkFailRequest => "network.failRequest",
            Method::NetworkProvideResponse => "network.provideResponse",
            Method::NetworkRemoveIntercept => "network.removeIntercept",
            Method::ScriptAddPreloadScript => "script.addPreloadScript",
            Method::ScriptCallFunction => "script.callFunction",
            Method::ScriptDisown => "script.disown",
            Method::ScriptEvaluate => "script.evaluate",
            Method::ScriptGetRealms => "script.getRealms",
            Method::ScriptRemovePreloadScript => "script.removePreloadScript",
            Method::SessionEnd => "session.end",
            Method::SessionNew => "session.new",
            Method::SessionStatus => "session.status",
            Method::SessionSubscribe => "session.subscribe",
            Method::SessionUnsubscribe => "session.unsubscribe",
        }
    }

    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL.iter().copied().find(|method| method.as_str() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_method_round_trips_through_its_name() {
        for method in Method::ALL {
            assert_eq!(Method::from_name(method.as_str()), Some(*method));
        }
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<&str> = Method::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), Method::ALL.len());
    }

    #[test]
    fn resolution_is_exact_not_prefix() {
        assert_eq!(Method::from_name("session"), None);
        assert_eq!(Method::from_name("session.subscribeX"), None);
        assert_eq!(Method::from_name("Session.subscribe"), None);
    }
}
