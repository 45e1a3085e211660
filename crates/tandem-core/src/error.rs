//! Error taxonomy.

use core::fmt;
use std::sync::Arc;

/// Protocol and transport failures surfaced by the dispatch and call paths.
///
/// Every variant encountered inside `dispatch` is fatal for the connection:
/// the session aborts, all outstanding completions fire with the error, and
/// the error is returned to the dispatch caller. The connection is not
/// expected to be reused afterwards.
#[derive(Debug, Clone)]
pub enum RpcError {
    /// Inbound bytes did not decode as an envelope.
    ParseEnvelopeFailed,
    /// The envelope decoded but its payload did not decode under the type
    /// named by `message`.
    ParsePayloadFailed,
    /// The `message` name is not known to the schema set, or no handler is
    /// bound for it.
    UnknownProtocolDescriptor,
    /// A reply names a session at or past the session table's capacity.
    SessionOutOfRange,
    /// A reply names a session whose slot is vacant.
    InvalidSession,
    /// The transport failed underneath the session.
    ///
    /// Shared so one failure can fan out to every outstanding completion.
    Transport(Arc<TransportError>),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseEnvelopeFailed => write!(f, "inbound frame did not parse as an envelope"),
            Self::ParsePayloadFailed => {
                write!(f, "payload did not parse under the named message type")
            }
            Self::UnknownProtocolDescriptor => write!(f, "unknown protocol descriptor"),
            Self::SessionOutOfRange => write!(f, "session id out of range"),
            Self::InvalidSession => write!(f, "session id refers to a vacant slot"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<TransportError> for RpcError {
    fn from(e: TransportError) -> Self {
        Self::Transport(Arc::new(e))
    }
}

/// Transport-level errors.
#[derive(Debug)]
pub enum TransportError {
    /// The connection is gone; no further frames will move.
    Closed,
    /// An I/O error from the underlying stream.
    Io(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "transport closed"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Closed => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
