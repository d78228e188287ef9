//! Unified error types for the bridge.
//!
//! A single [`Error`] enum that every subsystem converts into, so the
//! listener loops and proxy calls handle failures uniformly.
//!
//! Only two categories abort anything: transport faults end the call that
//! was in flight, and protocol desynchronisation ends the whole channel.
//! A failure reported by the remote object itself is *not* an error here;
//! it travels as a [`TResult`](crate::interfaces::TResult) inside a
//! successfully decoded response.

use core::fmt;
use std::io;

use crate::interfaces::InstanceId;

// ---------------------------------------------------------------------------
// Top-level bridge error
// ---------------------------------------------------------------------------

/// Every fallible bridge operation funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// The channel failed underneath an in-flight call.
    Transport(TransportError),
    /// The byte stream no longer lines up with the protocol.
    Protocol(ProtocolError),
    /// No object or dedicated channel is registered under this id.
    UnknownInstance(InstanceId),
    /// The proxy was already torn down.
    Destructed(InstanceId),
    /// Configuration is invalid.
    Config(&'static str),
}

impl Error {
    /// Whether this error means the channel it happened on can no longer be
    /// used.
    pub fn is_fatal_to_channel(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Transport(TransportError::Closed))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::UnknownInstance(id) => write!(f, "unknown instance id {id}"),
            Self::Destructed(id) => write!(f, "instance {id} was already destructed"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(ProtocolError::Malformed(e)) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The peer hung up, or the channel was closed locally.
    Closed,
    /// `send()` was called before `connect()`.
    NotConnected,
    /// Any other socket failure.
    Io(io::ErrorKind),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "channel closed"),
            Self::NotConnected => write!(f, "channel not connected"),
            Self::Io(kind) => write!(f, "socket error: {kind}"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => Self::Closed,
            kind => Self::Io(kind),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Transport(e.into())
    }
}

// ---------------------------------------------------------------------------
// Protocol desynchronisation
// ---------------------------------------------------------------------------

/// Decoding failures. None of these can be recovered from locally; the
/// channel they happened on has to be torn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The length prefix exceeds the maximum frame size.
    FrameTooLarge { len: usize, max: usize },
    /// The payload does not decode as the expected type.
    Malformed(postcard::Error),
    /// The payload decoded but left this many bytes unread.
    TrailingBytes(usize),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameTooLarge { len, max } => {
                write!(f, "frame of {len} bytes exceeds the {max} byte limit")
            }
            Self::Malformed(e) => write!(f, "malformed payload: {e}"),
            Self::TrailingBytes(n) => write!(f, "{n} trailing bytes after payload"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Self::Protocol(ProtocolError::Malformed(e))
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
