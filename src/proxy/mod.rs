//! Proxy objects.
//!
//! A [`PluginProxy`] stands in for one real object on the other side of the
//! bridge. It holds the object's [`CapabilitySet`] and answers interface
//! casts from it without any I/O:
//!
//! ```text
//!   proxy.cast::<kinds::AudioProcessor>()
//!        │
//!        ├── not in capability set ──▶ None
//!        │
//!        └── supported ──▶ Capability<'_, kinds::AudioProcessor>
//!                              │ .process(&mut data)
//!                              ▼
//!                        dedicated channel ──▶ real object
//! ```
//!
//! Each [`Capability`] handle is the capability module for one interface
//! kind; its methods live next to the interface definitions in
//! [`crate::interfaces`]. Calls return the remote result code verbatim;
//! only transport and protocol failures come back as [`Error`].
//!
//! Lifecycle: `Active` from construction until [`PluginProxy::destruct`]
//! or until the last clone is dropped, whichever comes first. The remote
//! object is released exactly once.

pub mod host_context;

use core::fmt;
use core::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};

pub use host_context::HostContextProxy;

use crate::discovery::CapabilitySet;
use crate::error::{Error, Result, TransportError};
use crate::interfaces::audio_processor::Process;
use crate::interfaces::edit_controller::SetComponentHandler;
use crate::interfaces::plugin_base::Initialize;
use crate::interfaces::{
    HostContext, HostContextArgs, InstanceId, Interface, InterfaceArgs, InterfaceKind,
    ProcessData, ProcessResponse, TResult,
};
use crate::messages::{AudioProcessorRequest, ControlRequest, Destruct, Rediscover};
use crate::native::NativeShared;
use crate::rpc::Request;
use crate::transport::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Active,
    Destructed,
}

/// Local stand-in for a remote plugin object. Clones share the same
/// remote object.
#[derive(Clone)]
pub struct PluginProxy {
    inner: Arc<ProxyInner>,
}

pub(crate) struct ProxyInner {
    instance_id: InstanceId,
    /// Replaced as a whole on re-discovery.
    capabilities: RwLock<Arc<CapabilitySet>>,
    bridge: Arc<NativeShared>,
    destructed: AtomicBool,
    /// Reused response for `process()`.
    process_response: Mutex<ProcessResponse>,
}

impl PluginProxy {
    /// Wrap a freshly constructed remote object. Connects its dedicated
    /// channel when the capability set needs one; if that fails the proxy
    /// is dropped, which releases the remote object again.
    pub(crate) fn new(bridge: Arc<NativeShared>, capabilities: CapabilitySet) -> Result<Self> {
        let proxy = Self {
            inner: Arc::new(ProxyInner {
                instance_id: capabilities.instance_id,
                capabilities: RwLock::new(Arc::new(CapabilitySet::empty(capabilities.instance_id))),
                bridge,
                destructed: AtomicBool::new(false),
                process_response: Mutex::new(ProcessResponse::default()),
            }),
        };
        proxy.inner.apply_capabilities(capabilities)?;
        Ok(proxy)
    }

    pub fn instance_id(&self) -> InstanceId {
        self.inner.instance_id
    }

    pub fn state(&self) -> ProxyState {
        if self.inner.destructed.load(Ordering::SeqCst) {
            ProxyState::Destructed
        } else {
            ProxyState::Active
        }
    }

    /// Current capability record.
    pub fn capabilities(&self) -> Arc<CapabilitySet> {
        self.inner.capabilities()
    }

    pub fn supports(&self, kind: InterfaceKind) -> bool {
        self.state() == ProxyState::Active && self.inner.capabilities().supports(kind)
    }

    /// Interface-cast query with plugin result-code semantics.
    pub fn query_interface(&self, kind: InterfaceKind) -> TResult {
        if self.supports(kind) {
            TResult::OK
        } else {
            TResult::NO_INTERFACE
        }
    }

    /// View the proxy as interface `K`, if the remote object implements it.
    pub fn cast<K: Interface>(&self) -> Option<Capability<'_, K>> {
        self.supports(K::KIND).then(|| Capability {
            inner: self.inner.as_ref(),
            _kind: PhantomData,
        })
    }

    /// Probe the remote object again and swap in the result. For objects
    /// that change their interfaces after some lifecycle call other than
    /// `initialize`, which does this on its own.
    pub fn refresh_capabilities(&self) -> Result<TResult> {
        let response = self.inner.control(&Rediscover {
            instance_id: self.instance_id(),
        })?;
        match response {
            Ok(capabilities) => {
                self.inner.apply_capabilities(capabilities)?;
                Ok(TResult::OK)
            }
            Err(code) => Ok(code),
        }
    }

    /// Release the remote object now instead of on the last drop.
    /// Idempotent; later calls through any clone fail with
    /// [`Error::Destructed`].
    pub fn destruct(&self) -> Result<()> {
        self.inner.release()
    }
}

impl fmt::Debug for PluginProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginProxy")
            .field("instance_id", &self.inner.instance_id)
            .field("state", &self.state())
            .field("interfaces", &self.inner.capabilities().kinds().collect::<Vec<_>>())
            .finish()
    }
}

/// A proxy viewed as one interface kind.
pub struct Capability<'a, K> {
    pub(crate) inner: &'a ProxyInner,
    _kind: PhantomData<fn() -> K>,
}

impl<K: Interface> Capability<'_, K> {
    pub fn instance_id(&self) -> InstanceId {
        self.inner.instance_id
    }

    pub fn kind(&self) -> InterfaceKind {
        K::KIND
    }
}

impl ProxyInner {
    fn capabilities(&self) -> Arc<CapabilitySet> {
        Arc::clone(&self.capabilities.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn args(&self, kind: InterfaceKind) -> Option<InterfaceArgs> {
        self.capabilities().args(kind).cloned()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.destructed.load(Ordering::SeqCst) {
            Err(Error::Destructed(self.instance_id))
        } else {
            Ok(())
        }
    }

    pub(crate) fn control<T>(&self, request: &T) -> Result<T::Response>
    where
        T: Request<Union = ControlRequest>,
    {
        self.ensure_active()?;
        self.bridge
            .sockets
            .control
            .send_message(request, self.bridge.logging.as_ref())
    }

    pub(crate) fn audio<T>(&self, request: &T) -> Result<T::Response>
    where
        T: Request<Union = AudioProcessorRequest>,
    {
        self.ensure_active()?;
        self.bridge.sockets.send_audio_processor_message(
            self.instance_id,
            request,
            self.bridge.logging.as_ref(),
        )
    }

    pub(crate) fn process(&self, data: &mut ProcessData) -> Result<TResult> {
        self.ensure_active()?;
        let request = Process {
            instance_id: self.instance_id,
            data: std::mem::take(data),
        };
        let mut response = lock(&self.process_response);
        let sent = self.bridge.sockets.receive_audio_processor_into(
            self.instance_id,
            &request,
            &mut *response,
            self.bridge.logging.as_ref(),
        );
        *data = request.data;
        sent?;

        response.write_back(data);
        Ok(response.result)
    }

    pub(crate) fn initialize(&self, context: Arc<dyn HostContext>) -> Result<TResult> {
        self.ensure_active()?;
        let host_context = HostContextArgs::discover(&*context, self.instance_id);
        lock(&self.bridge.host_callbacks)
            .entry(self.instance_id)
            .or_default()
            .context = Some(context);

        let response = self.control(&Initialize {
            instance_id: self.instance_id,
            host_context,
        })?;
        if let Some(capabilities) = response.updated_capabilities {
            if *self.capabilities() != capabilities {
                info!(
                    "instance {} changed its interfaces during initialize",
                    self.instance_id
                );
            }
            self.apply_capabilities(capabilities)?;
        }
        Ok(response.result)
    }

    pub(crate) fn set_component_handler(&self, handler: Option<Arc<dyn HostContext>>) -> Result<TResult> {
        self.ensure_active()?;
        let args = handler
            .as_deref()
            .map(|handler| HostContextArgs::discover(handler, self.instance_id));
        lock(&self.bridge.host_callbacks)
            .entry(self.instance_id)
            .or_default()
            .component_handler = handler;

        self.control(&SetComponentHandler {
            instance_id: self.instance_id,
            handler: args,
        })
    }

    /// Swap in a new capability record, connecting the dedicated channel if
    /// the object now needs one.
    fn apply_capabilities(&self, capabilities: CapabilitySet) -> Result<()> {
        if capabilities.instance_id != self.instance_id {
            warn!(
                "capability record for instance {} applied to instance {}",
                capabilities.instance_id, self.instance_id
            );
        }
        // Casts must never hand out a capability whose channel is missing,
        // so the old record stays in place if connecting fails.
        let sockets = &self.bridge.sockets;
        if capabilities.needs_dedicated_channel() && !sockets.has_audio_processor(self.instance_id) {
            sockets.add_audio_processor_and_connect(self.instance_id)?;
        }

        *self
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(capabilities);
        Ok(())
    }

    /// Tear down the remote object. Runs at most once.
    fn release(&self) -> Result<()> {
        if self.destructed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.bridge.sockets.remove_audio_processor(self.instance_id);
        lock(&self.bridge.host_callbacks).remove(&self.instance_id);

        self.bridge.sockets.control.send_message(
            &Destruct {
                instance_id: self.instance_id,
            },
            self.bridge.logging.as_ref(),
        )?;
        debug!("destructed instance {}", self.instance_id);
        Ok(())
    }
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        match self.release() {
            Ok(()) => {}
            Err(Error::Transport(TransportError::Closed)) => {
                debug!("bridge closed before instance {} was released", self.instance_id);
            }
            Err(e) => warn!("releasing instance {} failed: {e}", self.instance_id),
        }
    }
}
