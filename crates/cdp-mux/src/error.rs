use thiserror::Error;

/// Failures surfaced by the multiplexer. Routing problems are reported at
/// the call site that attempted the lookup, never swallowed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MuxError {
    #[error("unknown CDP session id '{0}'")]
    UnknownSession(String),
    #[error("CDP session '{0}' is already attached")]
    SessionAlreadyAttached(String),
    #[error("transport closed")]
    TransportClosed,
    #[error("malformed CDP message: {0}")]
    Malformed(String),
    #[error("cdp error {code}: {message}")]
    Cdp { code: i64, message: String },
}

pub type MuxResult<T> = Result<T, MuxError>;
