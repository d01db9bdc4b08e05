use dashmap::DashMap;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use bidi_core_types::{ProtocolError, ProtocolResult};

use crate::parser::{AddInterceptParams, InterceptPhase, RemoveInterceptParams};

/// A registered request-matching rule, keyed by its generated id.
#[derive(Clone, Debug)]
pub struct InterceptRule {
    pub url_patterns: Vec<String>,
    pub phases: Vec<InterceptPhase>,
}

/// Network-domain command processor. Only the intercept registry lifecycle
/// is implemented; the continue/fail/provide-response family is a stubbed
/// extension point.
#[derive(Default)]
pub struct NetworkProcessor {
    intercepts: DashMap<String, InterceptRule>,
}

impl NetworkProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an intercept rule and return its fresh identifier. An empty
    /// pattern list is valid and matches nothing yet.
    pub fn add_intercept(&self, params: AddInterceptParams) -> ProtocolResult<Value> {
        let intercept = Uuid::new_v4().to_string();
        debug!(target: "dispatch", %intercept, patterns = params.url_patterns.len(), "intercept added");
        self.intercepts.insert(
            intercept.clone(),
            InterceptRule {
                url_patterns: params.url_patterns,
                phases: params.phases,
            },
        );
        Ok(json!({ "intercept": intercept }))
    }

    /// Remove a previously added intercept. Succeeds exactly once per id.
    pub fn remove_intercept(&self, params: RemoveInterceptParams) -> ProtocolResult<Value> {
        if self.intercepts.remove(&params.intercept).is_none() {
            return Err(ProtocolError::no_such_intercept(format!(
                "Intercept {} does not exist.",
                params.intercept
            )));
        }
        debug!(target: "dispatch", intercept = %params.intercept, "intercept removed");
        Ok(json!({}))
    }

    pub fn not_implemented(&self) -> ProtocolResult<Value> {
        Err(ProtocolError::unknown_command("Not implemented yet."))
    }
}
