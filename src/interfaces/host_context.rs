//! Host-side objects handed to plugin objects, and the callback requests
//! that reach them.
//!
//! The host passes a context to `initialize` and a component handler to
//! `set_component_handler`. Both are probed the same way plugin objects
//! are, and the owning side gets a
//! [`HostContextProxy`](crate::proxy::HostContextProxy) whose calls travel
//! back over the callback channel, addressed by the instance id of the
//! plugin object that received the context.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{InstanceId, TResult};

/// An object the host passed into the plugin.
pub trait HostContext: Send + Sync {
    fn host_application(&self) -> Option<&dyn HostApplication> {
        None
    }
    fn component_handler(&self) -> Option<&dyn ComponentHandler> {
        None
    }
}

pub trait HostApplication: Send + Sync {
    fn name(&self) -> core::result::Result<String, TResult>;
}

pub trait ComponentHandler: Send + Sync {
    fn begin_edit(&self, id: u32) -> TResult;
    fn perform_edit(&self, id: u32, value_normalized: f64) -> TResult;
    fn end_edit(&self, id: u32) -> TResult;
    fn restart_component(&self, flags: i32) -> TResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HostInterfaceKind {
    HostApplication,
    ComponentHandler,
}

impl HostInterfaceKind {
    pub const ALL: [Self; 2] = [Self::HostApplication, Self::ComponentHandler];
}

/// Discovered capabilities of a host context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostContextArgs {
    /// The plugin object the context was handed to.
    pub owner_instance_id: InstanceId,
    pub interfaces: BTreeSet<HostInterfaceKind>,
}

impl HostContextArgs {
    pub fn discover(context: &dyn HostContext, owner_instance_id: InstanceId) -> Self {
        let interfaces = HostInterfaceKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                HostInterfaceKind::HostApplication => context.host_application().is_some(),
                HostInterfaceKind::ComponentHandler => context.component_handler().is_some(),
            })
            .collect();
        Self {
            owner_instance_id,
            interfaces,
        }
    }

    pub fn supports(&self, kind: HostInterfaceKind) -> bool {
        self.interfaces.contains(&kind)
    }
}

// ── Callback requests ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGetName {
    pub owner_instance_id: InstanceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginEdit {
    pub owner_instance_id: InstanceId,
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformEdit {
    pub owner_instance_id: InstanceId,
    pub id: u32,
    pub value_normalized: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndEdit {
    pub owner_instance_id: InstanceId,
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartComponent {
    pub owner_instance_id: InstanceId,
    pub flags: i32,
}
