//! Native side of the bridge.
//!
//! Owns the listening end of every endpoint, creates [`PluginProxy`]
//! objects for instances the owning side constructs, and serves callbacks
//! from plugin objects into the host contexts registered for them.
//!
//! ```text
//!  NativeBridge::new ── bind control + callback
//!        │
//!        ▼  (launch the owning side with `endpoints()`)
//!  NativeBridge::connect ── accept both, spawn the callback listener
//!        │
//!        ▼
//!  create_instance ── Construct ──▶ CapabilitySet ──▶ PluginProxy
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::interfaces::host_context::{
    BeginEdit, EndEdit, HostGetName, PerformEdit, RestartComponent,
};
use crate::interfaces::{ClassId, ConstructInterface, HostContext, InstanceId, TResult, Unavailable};
use crate::logging::{Direction, Logging, MessageLogger, default_logger};
use crate::messages::{CallbackHandler, Construct, ControlRequest};
use crate::proxy::PluginProxy;
use crate::rpc::{MessageHandler, Sockets};
use crate::transport::{Endpoints, lock};

/// Host objects registered for one proxied instance.
#[derive(Default)]
pub(crate) struct HostCallbacks {
    /// Passed to `initialize`.
    pub(crate) context: Option<Arc<dyn HostContext>>,
    /// Passed to `set_component_handler`.
    pub(crate) component_handler: Option<Arc<dyn HostContext>>,
}

/// State shared by the bridge, its proxies and the callback listener.
pub(crate) struct NativeShared {
    pub(crate) sockets: Sockets,
    /// For requests towards the owning side.
    pub(crate) logging: Option<Logging>,
    pub(crate) host_callbacks: Mutex<HashMap<InstanceId, HostCallbacks>>,
}

pub struct NativeBridge {
    shared: Arc<NativeShared>,
    callback_logging: Option<Logging>,
    callback_listener: Mutex<Option<JoinHandle<()>>>,
}

impl NativeBridge {
    /// Bind all endpoints, logging message traffic at the configured
    /// verbosity.
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        Self::with_logger(config, default_logger(config.verbosity))
    }

    /// Like [`new`](Self::new) with a custom message logger.
    pub fn with_logger(config: &BridgeConfig, logger: Option<Arc<dyn MessageLogger>>) -> Result<Self> {
        config.validate()?;
        let endpoints = config
            .endpoint_base_dir
            .clone()
            .map_or_else(Endpoints::generate, Endpoints::new);
        let sockets = Sockets::new(endpoints, true, config.buffer_capacity)?;
        info!("listening on {}", sockets.endpoints().base_dir().display());

        let logging = logger
            .clone()
            .map(|logger| Logging::new(logger, Direction::HostToPlugin));
        let callback_logging = logger.map(|logger| Logging::new(logger, Direction::PluginToHost));
        Ok(Self {
            shared: Arc::new(NativeShared {
                sockets,
                logging,
                host_callbacks: Mutex::new(HashMap::new()),
            }),
            callback_logging,
            callback_listener: Mutex::new(None),
        })
    }

    /// Where the owning side has to connect.
    pub fn endpoints(&self) -> &Endpoints {
        self.shared.sockets.endpoints()
    }

    /// Wait for the owning side to connect, then start serving callbacks.
    pub fn connect(&self) -> Result<()> {
        self.shared.sockets.connect()?;

        let shared = Arc::clone(&self.shared);
        let logging = self.callback_logging.clone();
        let handle = thread::Builder::new()
            .name("bridgework-callbacks".into())
            .spawn(move || {
                let dispatcher: Arc<dyn CallbackHandler> = Arc::new(CallbackDispatcher {
                    shared: Arc::clone(&shared),
                });
                if let Err(e) = shared
                    .sockets
                    .callback
                    .receive_messages(logging, false, dispatcher)
                {
                    error!("callback listener stopped: {e}");
                }
            })?;
        *lock(&self.callback_listener) = Some(handle);
        Ok(())
    }

    /// Ask the owning side's factory for a new object. A factory failure is
    /// returned as its result code.
    pub fn create_instance(
        &self,
        class_id: ClassId,
        requested_interface: ConstructInterface,
    ) -> Result<core::result::Result<PluginProxy, TResult>> {
        let response = self.shared.sockets.control.send_message(
            &Construct {
                class_id,
                requested_interface,
            },
            self.shared.logging.as_ref(),
        )?;
        match response {
            Ok(capabilities) => Ok(Ok(PluginProxy::new(Arc::clone(&self.shared), capabilities)?)),
            Err(code) => Ok(Err(code)),
        }
    }

    /// Raw access to the control channel.
    pub fn control(&self) -> &MessageHandler<ControlRequest> {
        &self.shared.sockets.control
    }

    /// Close every channel and wait for the callback listener. Idempotent.
    pub fn close(&self) {
        self.shared.sockets.close();
        let listener = lock(&self.callback_listener).take();
        if let Some(handle) = listener {
            if handle.join().is_err() {
                warn!("callback listener panicked");
            }
        }
    }
}

impl Drop for NativeBridge {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Callback dispatch ────────────────────────────────────────

struct CallbackDispatcher {
    shared: Arc<NativeShared>,
}

impl CallbackDispatcher {
    /// Run `call` against a registered host object. The registry lock is
    /// released first so the host may call back into the bridge.
    fn with<R: Unavailable>(
        &self,
        owner: InstanceId,
        pick: impl FnOnce(&HostCallbacks) -> Option<&Arc<dyn HostContext>>,
        call: impl FnOnce(&dyn HostContext) -> Option<R>,
    ) -> R {
        let target = lock(&self.shared.host_callbacks)
            .get(&owner)
            .and_then(pick)
            .cloned();
        match target {
            Some(target) => call(&*target).unwrap_or_else(|| R::unavailable(TResult::NO_INTERFACE)),
            None => {
                warn!("callback for instance {owner}, which has no host object registered");
                R::unavailable(TResult::INTERNAL_ERROR)
            }
        }
    }
}

impl CallbackHandler for CallbackDispatcher {
    fn host_get_name(&self, request: HostGetName) -> core::result::Result<String, TResult> {
        self.with(
            request.owner_instance_id,
            |c| c.context.as_ref(),
            |context| context.host_application().map(|host| host.name()),
        )
    }

    fn begin_edit(&self, request: BeginEdit) -> TResult {
        self.with(
            request.owner_instance_id,
            |c| c.component_handler.as_ref(),
            |handler| handler.component_handler().map(|h| h.begin_edit(request.id)),
        )
    }

    fn perform_edit(&self, request: PerformEdit) -> TResult {
        self.with(
            request.owner_instance_id,
            |c| c.component_handler.as_ref(),
            |handler| {
                handler
                    .component_handler()
                    .map(|h| h.perform_edit(request.id, request.value_normalized))
            },
        )
    }

    fn end_edit(&self, request: EndEdit) -> TResult {
        self.with(
            request.owner_instance_id,
            |c| c.component_handler.as_ref(),
            |handler| handler.component_handler().map(|h| h.end_edit(request.id)),
        )
    }

    fn restart_component(&self, request: RestartComponent) -> TResult {
        self.with(
            request.owner_instance_id,
            |c| c.component_handler.as_ref(),
            |handler| handler.component_handler().map(|h| h.restart_component(request.flags)),
        )
    }
}
