use std::fmt;
use std::io;

use crate::ids::ConnectionHandle;

/// Errors raised by the control server.
///
/// Routing misses are not errors: they are answered with a 404 and never reach
/// this type. Everything else that can go wrong while serving a request, or while
/// bringing the server up, is one of these variants.
#[derive(Debug)]
pub enum ControlError {
    /// The listening URI could not be parsed or lacks a host or port.
    InvalidUri {
        /// The URI as supplied at start-up
        uri: String,
        /// Why it was rejected
        reason: String,
    },
    /// Binding the listening socket failed.
    Bind {
        /// `host:port` that was requested
        addr: String,
        source: io::Error,
    },
    /// A request carried a body section that is not valid JSON.
    ///
    /// This is a hard per-request failure: the offending connection has already
    /// been closed and evicted when the error is returned.
    MalformedBody {
        handle: ConnectionHandle,
        source: serde_json::Error,
    },
    /// The body decoded as JSON but does not have the shape the handler needs
    /// (a required key is absent or a value has the wrong type).
    InvalidBody {
        /// Handler that rejected the body
        handler: &'static str,
        source: serde_json::Error,
    },
    /// A matched route did not carry the identifier its handler reads.
    MissingCapture { handler: &'static str, index: usize },
    /// Transport level I/O failure outside of a single request.
    Io(io::Error),
    /// A coroutine backing the server could not be spawned.
    Spawn(io::Error),
}

impl ControlError {
    /// Whether this error is a client mistake that should be answered with 400.
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self, ControlError::InvalidBody { .. })
    }
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::InvalidUri { uri, reason } => {
                write!(f, "invalid control URI '{uri}': {reason}")
            }
            ControlError::Bind { addr, source } => {
                write!(f, "failed to bind control listener on {addr}: {source}")
            }
            ControlError::MalformedBody { handle, source } => {
                write!(f, "malformed JSON body on connection {handle}: {source}")
            }
            ControlError::InvalidBody { handler, source } => {
                write!(f, "invalid body for {handler}: {source}")
            }
            ControlError::MissingCapture { handler, index } => {
                write!(f, "route for {handler} has no capture at index {index}")
            }
            ControlError::Io(source) => write!(f, "control transport error: {source}"),
            ControlError::Spawn(source) => {
                write!(f, "failed to spawn control coroutine: {source}")
            }
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControlError::Bind { source, .. } => Some(source),
            ControlError::MalformedBody { source, .. }
            | ControlError::InvalidBody { source, .. } => Some(source),
            ControlError::Io(source) | ControlError::Spawn(source) => Some(source),
            ControlError::InvalidUri { .. }
            | ControlError::MissingCapture { .. } => None,
        }
    }
}

impl From<io::Error> for ControlError {
    fn from(err: io::Error) -> Self {
        ControlError::Io(err)
    }
}
