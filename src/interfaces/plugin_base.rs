//! Object initialization and teardown.
//!
//! `Initialize` is the one lifecycle call after which an object may expose
//! a different set of interfaces, so its response carries a fresh
//! capability record that the proxy swaps in.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::host_context::{HostContext, HostContextArgs};
use super::{InstanceId, TResult, Unavailable, kinds};
use crate::discovery::CapabilitySet;
use crate::error::Result;
use crate::proxy::Capability;

pub trait PluginBase: Send + Sync {
    fn initialize(&self, context: Arc<dyn HostContext>) -> TResult;
    fn terminate(&self) -> TResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initialize {
    pub instance_id: InstanceId,
    /// Capabilities of the host context passed to the call.
    pub host_context: HostContextArgs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub result: TResult,
    /// The object's interfaces as discovered after the call.
    pub updated_capabilities: Option<CapabilitySet>,
}

impl Unavailable for InitializeResponse {
    fn unavailable(code: TResult) -> Self {
        Self {
            result: code,
            updated_capabilities: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminate {
    pub instance_id: InstanceId,
}

impl Capability<'_, kinds::PluginBase> {
    /// Initialize the remote object with `context`. Callbacks the object
    /// makes into the context are routed back to it; afterwards the proxy's
    /// capability set reflects whatever the object exposes now.
    pub fn initialize(&self, context: Arc<dyn HostContext>) -> Result<TResult> {
        self.inner.initialize(context)
    }

    pub fn terminate(&self) -> Result<TResult> {
        self.inner.control(&Terminate {
            instance_id: self.instance_id(),
        })
    }
}
