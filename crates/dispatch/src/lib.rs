//! Maps incoming BiDi commands to domain handlers and shapes every outcome,
//! including panics and internal failures, into a protocol response.
//!
//! [`CommandDispatcher::process`] is the sole entry point; it never fails
//! across its own boundary. Commands are independent: callers run one
//! `process` future per command, concurrently, and a failing or slow command
//! never blocks the others.

pub mod cdp;
pub mod dispatcher;
pub mod handler;
pub mod method;
pub mod network;
pub mod parser;
pub mod session;

pub use cdp::{CdpProcessor, SessionResolver};
pub use dispatcher::CommandDispatcher;
pub use handler::{DomainHandler, UnimplementedDomainHandler};
pub use method::Method;
pub use parser::{
    AddInterceptParams, BidiParser, DefaultParser, GetCdpSessionParams, InterceptPhase,
    RemoveInterceptParams, SendCdpCommandParams, SubscriptionRequest,
};
pub use network::{InterceptRule, NetworkProcessor};
pub use session::SessionProcessor;
