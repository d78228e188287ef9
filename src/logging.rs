//! Message logging hooks.
//!
//! The router asks a [`MessageLogger`] whether each request should be
//! recorded before dispatching it, and records the matching response only
//! when the request was. Responses are not filtered on their own because
//! most response kinds are a bare result code with nothing to filter on.
//!
//! [`LogMessageLogger`] is the default adapter and writes through the `log`
//! facade under the `bridgework::messages` target.

use core::fmt;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

/// Target used for all message traffic log lines.
pub const MESSAGE_TARGET: &str = "bridgework::messages";

/// Which way a message travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Native host to the plugin side (control and dedicated channels).
    HostToPlugin,
    /// Plugin side back to the native host (callbacks).
    PluginToHost,
}

impl Direction {
    /// The direction the response to a request travels in.
    pub const fn reversed(self) -> Self {
        match self {
            Self::HostToPlugin => Self::PluginToHost,
            Self::PluginToHost => Self::HostToPlugin,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostToPlugin => write!(f, "[host -> plugin]"),
            Self::PluginToHost => write!(f, "[plugin -> host]"),
        }
    }
}

/// Static description of a request kind, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestMeta {
    /// Name of the traffic class union the request belongs to.
    pub union: &'static str,
    /// Name of the request kind.
    pub name: &'static str,
    /// Whether the traffic class is called from the real-time audio path.
    pub high_frequency: bool,
}

/// How much message traffic gets recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verbosity {
    /// No per-message logging.
    Basic,
    /// Everything except the high-frequency audio traffic.
    MostEvents,
    /// Everything.
    AllEvents,
}

impl Verbosity {
    /// Map a numeric debug level (0, 1, 2) to a verbosity.
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Basic),
            1 => Some(Self::MostEvents),
            2 => Some(Self::AllEvents),
            _ => None,
        }
    }
}

/// Collaborator deciding which exchanges get recorded.
pub trait MessageLogger: Send + Sync {
    /// Record `request` if wanted. Returns whether its response should be
    /// recorded too.
    fn log_request(&self, direction: Direction, meta: RequestMeta, request: &dyn fmt::Debug)
    -> bool;

    /// Record the response to a request that was recorded.
    fn log_response(&self, direction: Direction, meta: RequestMeta, response: &dyn fmt::Debug);
}

/// A logger plus the direction requests on one channel travel in.
#[derive(Clone)]
pub struct Logging {
    pub logger: Arc<dyn MessageLogger>,
    pub direction: Direction,
}

impl Logging {
    pub fn new(logger: Arc<dyn MessageLogger>, direction: Direction) -> Self {
        Self { logger, direction }
    }

    /// Ask the logger about a request travelling in this channel's direction.
    pub fn request(&self, meta: RequestMeta, request: &dyn fmt::Debug) -> bool {
        self.logger.log_request(self.direction, meta, request)
    }

    /// Record a response, which travels in the reverse direction.
    pub fn response(&self, meta: RequestMeta, response: &dyn fmt::Debug) {
        self.logger
            .log_response(self.direction.reversed(), meta, response);
    }
}

/// Adapter that writes message traffic to the `log` facade.
pub struct LogMessageLogger {
    verbosity: Verbosity,
}

impl LogMessageLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn wants(&self, meta: RequestMeta) -> bool {
        match self.verbosity {
            Verbosity::Basic => false,
            Verbosity::MostEvents => !meta.high_frequency,
            Verbosity::AllEvents => true,
        }
    }
}

/// The `log`-backed logger for `verbosity`, or nothing when per-message
/// logging is off.
pub fn default_logger(verbosity: Verbosity) -> Option<Arc<dyn MessageLogger>> {
    (verbosity != Verbosity::Basic)
        .then(|| Arc::new(LogMessageLogger::new(verbosity)) as Arc<dyn MessageLogger>)
}

impl MessageLogger for LogMessageLogger {
    fn log_request(
        &self,
        direction: Direction,
        meta: RequestMeta,
        request: &dyn fmt::Debug,
    ) -> bool {
        if !self.wants(meta) {
            return false;
        }
        info!(target: MESSAGE_TARGET, "{direction} >> {}::{} {:?}", meta.union, meta.name, request);
        true
    }

    fn log_response(&self, direction: Direction, meta: RequestMeta, response: &dyn fmt::Debug) {
        info!(target: MESSAGE_TARGET, "{direction}    {}::{} => {:?}", meta.union, meta.name, response);
    }
}
