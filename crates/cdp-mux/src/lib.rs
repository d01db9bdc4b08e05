//! Multiplexes one physical CDP transport into per-target virtual sessions.
//!
//! The browser speaks CDP over a single bidirectional byte-message channel.
//! [`CdpConnection`] owns that channel, maintains the session table driven by
//! `Target.attachedToTarget` / `Target.detachedFromTarget` notifications, and
//! routes every inbound message to exactly one virtual client: the session
//! named by its `sessionId` tag, or the root (browser-level) client when the
//! tag is absent. Outbound commands are correlated with responses through a
//! single call-id counter shared by all sessions.

pub mod client;
pub mod connection;
pub mod error;
pub mod transport;

pub use client::CdpClient;
pub use connection::CdpConnection;
pub use error::{MuxError, MuxResult};
pub use transport::{CdpTransport, PairedTransport, TransportHandle};
