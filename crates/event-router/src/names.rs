//! Fixed registry of known protocol event classes.
//!
//! Event names are either a module name (`log`, `network`, ...), a concrete
//! event (`log.entryAdded`), or the raw pass-through escape hatch: `cdp`
//! and anything under the `cdp.` prefix. Everything else fails validation.

use bidi_core_types::{ProtocolError, ProtocolResult};

pub const BROWSING_CONTEXT_EVENTS: &[&str] = &[
    "browsingContext.contextCreated",
    "browsingContext.contextDestroyed",
    "browsingContext.domContentLoaded",
    "browsingContext.fragmentNavigated",
    "browsingContext.load",
    "browsingContext.navigationStarted",
    "browsingContext.userPromptClosed",
    "browsingContext.userPromptOpened",
];

pub const LOG_EVENTS: &[&str] = &["log.entryAdded"];

pub const NETWORK_EVENTS: &[&str] = &[
    "network.authRequired",
    "network.beforeRequestSent",
    "network.fetchError",
    "network.responseCompleted",
    "network.responseStarted",
];

pub const SCRIPT_EVENTS: &[&str] = &[
    "script.message",
    "script.realmCreated",
    "script.realmDestroyed",
];

const MODULES: &[(&str, &[&str])] = &[
    ("browsingContext", BROWSING_CONTEXT_EVENTS),
    ("log", LOG_EVENTS),
    ("network", NETWORK_EVENTS),
    ("script", SCRIPT_EVENTS),
];

/// Capacity table for buffer-eligible event classes. Classes absent here
/// bypass the replay buffer entirely.
pub fn buffer_capacity(event_name: &str) -> Option<usize> {
    match event_name {
        "log.entryAdded" => Some(100),
        _ => None,
    }
}

fn is_raw_cdp(name: &str) -> bool {
    name == "cdp" || name.starts_with("cdp.")
}

/// Validate an event name against the registry. Performed before any
/// subscription state changes so a bad batch applies nothing.
pub fn check_event_name(name: &str) -> ProtocolResult<()> {
    let known = is_raw_cdp(name)
        || MODULES.iter().any(|(module, events)| {
            *module == name || events.contains(&name)
        });
    if known {
        Ok(())
    } else {
        Err(ProtocolError::invalid_argument(format!(
            "Unknown event: {name}"
        )))
    }
}

/// Expand a module-name subscription into that module's concrete events.
/// Concrete names and raw `cdp` names pass through unchanged.
pub fn unroll_event_names(name: &str) -> Vec<String> {
    for (module, events) in MODULES {
        if *module == name {
            return events.iter().map(|event| (*event).to_string()).collect();
        }
    }
    vec![name.to_string()]
}

/// Module key an incoming event method can additionally match on, for raw
/// CDP pass-through subscriptions ("cdp" covers every "cdp.*" event).
pub(crate) fn raw_module_of(method: &str) -> Option<&'static str> {
    method.starts_with("cdp.").then_some("cdp")
}
