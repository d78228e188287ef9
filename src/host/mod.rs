//! Owning side of the bridge.
//!
//! Holds the real plugin objects. Connects to the endpoints the native side
//! bound, serves control requests on the calling thread and one dedicated
//! audio channel per object that needs it:
//!
//! ```text
//!  PluginHost::connect ── control + callback
//!        │
//!        ▼
//!  PluginHost::run ── ControlDispatcher
//!        │  Construct ──▶ PluginFactory ──▶ InstanceRegistry
//!        │                      │
//!        │                      └──▶ bind audio[id] ──▶ AudioDispatcher thread
//!        ▼
//!  native side hangs up ──▶ close ──▶ every object dropped
//! ```

mod dispatch;
pub mod registry;

use std::sync::Arc;

use log::info;

pub use registry::InstanceRegistry;

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::interfaces::{ClassId, ConstructInterface, PluginObject, TResult};
use crate::logging::{Direction, Logging, MessageLogger, default_logger};
use crate::messages::ControlHandler;
use crate::rpc::Sockets;
use crate::transport::Endpoints;
use dispatch::ControlDispatcher;

/// Creates the real objects the native side asks for.
pub trait PluginFactory: Send + Sync {
    fn create_instance(
        &self,
        class_id: &ClassId,
        requested_interface: ConstructInterface,
    ) -> core::result::Result<Arc<dyn PluginObject>, TResult>;
}

pub(crate) struct HostShared {
    pub(crate) sockets: Arc<Sockets>,
    pub(crate) registry: InstanceRegistry,
    pub(crate) factory: Arc<dyn PluginFactory>,
    /// For requests arriving from the native side.
    pub(crate) logging: Option<Logging>,
    /// For callbacks into the native side.
    pub(crate) callback_logging: Option<Logging>,
}

pub struct PluginHost {
    shared: Arc<HostShared>,
}

impl PluginHost {
    /// Connect to a native side listening on `endpoints`.
    pub fn connect(
        endpoints: Endpoints,
        factory: Arc<dyn PluginFactory>,
        config: &BridgeConfig,
    ) -> Result<Self> {
        Self::with_logger(endpoints, factory, config, default_logger(config.verbosity))
    }

    /// Like [`connect`](Self::connect) with a custom message logger.
    pub fn with_logger(
        endpoints: Endpoints,
        factory: Arc<dyn PluginFactory>,
        config: &BridgeConfig,
        logger: Option<Arc<dyn MessageLogger>>,
    ) -> Result<Self> {
        config.validate()?;
        let sockets = Sockets::new(endpoints, false, config.buffer_capacity)?;
        sockets.connect()?;
        info!("connected to {}", sockets.endpoints().base_dir().display());

        let logging = logger
            .clone()
            .map(|logger| Logging::new(logger, Direction::HostToPlugin));
        let callback_logging = logger.map(|logger| Logging::new(logger, Direction::PluginToHost));
        Ok(Self {
            shared: Arc::new(HostShared {
                sockets: Arc::new(sockets),
                registry: InstanceRegistry::new(),
                factory,
                logging,
                callback_logging,
            }),
        })
    }

    /// Serve control requests until the native side hangs up or
    /// [`close`](Self::close) is called, then release every object.
    pub fn run(&self) -> Result<()> {
        let dispatcher: Arc<dyn ControlHandler> = Arc::new(ControlDispatcher {
            shared: Arc::clone(&self.shared),
        });
        let served = self
            .shared
            .sockets
            .control
            .receive_messages(self.shared.logging.clone(), false, dispatcher);
        self.close();
        served
    }

    /// Number of live objects.
    pub fn instance_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Close every channel and drop every object. Idempotent.
    pub fn close(&self) {
        self.shared.sockets.close();
        let released = self.shared.registry.clear();
        if released > 0 {
            info!("released {released} objects on shutdown");
        }
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        self.close();
    }
}
