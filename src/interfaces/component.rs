//! The processing component: buses, activation and state.
//!
//! Bus and activation calls share the dedicated per-instance channel with
//! the audio processor because hosts make them from the audio setup path.
//! State save and load can be large and go over control.

use serde::{Deserialize, Serialize};

use super::{ClassId, InstanceId, InterfaceArgs, InterfaceKind, TResult, kinds};
use crate::error::Result;
use crate::proxy::Capability;

pub trait Component: Send + Sync {
    /// Class id of the edit controller that belongs to this component.
    /// Fixed for the object's lifetime.
    fn controller_class_id(&self) -> Option<ClassId>;
    fn set_io_mode(&self, mode: i32) -> TResult;
    fn bus_count(&self, media_type: i32, direction: i32) -> i32;
    fn bus_info(&self, media_type: i32, direction: i32, index: i32) -> core::result::Result<BusInfo, TResult>;
    fn activate_bus(&self, media_type: i32, direction: i32, index: i32, state: bool) -> TResult;
    fn set_active(&self, state: bool) -> TResult;
    fn set_state(&self, state: &[u8]) -> TResult;
    fn get_state(&self) -> core::result::Result<Vec<u8>, TResult>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusInfo {
    pub media_type: i32,
    pub direction: i32,
    pub channel_count: i32,
    pub name: String,
    pub bus_type: i32,
    pub flags: u32,
}

// ── Requests ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetState {
    pub instance_id: InstanceId,
    pub state: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetState {
    pub instance_id: InstanceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetIoMode {
    pub instance_id: InstanceId,
    pub mode: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBusCount {
    pub instance_id: InstanceId,
    pub media_type: i32,
    pub direction: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBusInfo {
    pub instance_id: InstanceId,
    pub media_type: i32,
    pub direction: i32,
    pub index: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateBus {
    pub instance_id: InstanceId,
    pub media_type: i32,
    pub direction: i32,
    pub index: i32,
    pub state: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetActive {
    pub instance_id: InstanceId,
    pub state: bool,
}

// ── Capability module ────────────────────────────────────────

impl Capability<'_, kinds::Component> {
    /// Answered locally from the record captured at discovery time.
    pub fn controller_class_id(&self) -> core::result::Result<ClassId, TResult> {
        match self.inner.args(InterfaceKind::Component) {
            Some(InterfaceArgs::Component {
                controller_class_id: Some(class_id),
            }) => Ok(class_id),
            _ => Err(TResult::NOT_IMPLEMENTED),
        }
    }

    pub fn set_io_mode(&self, mode: i32) -> Result<TResult> {
        self.inner.audio(&SetIoMode {
            instance_id: self.instance_id(),
            mode,
        })
    }

    pub fn bus_count(&self, media_type: i32, direction: i32) -> Result<i32> {
        self.inner.audio(&GetBusCount {
            instance_id: self.instance_id(),
            media_type,
            direction,
        })
    }

    pub fn bus_info(
        &self,
        media_type: i32,
        direction: i32,
        index: i32,
    ) -> Result<core::result::Result<BusInfo, TResult>> {
        self.inner.audio(&GetBusInfo {
            instance_id: self.instance_id(),
            media_type,
            direction,
            index,
        })
    }

    pub fn activate_bus(&self, media_type: i32, direction: i32, index: i32, state: bool) -> Result<TResult> {
        self.inner.audio(&ActivateBus {
            instance_id: self.instance_id(),
            media_type,
            direction,
            index,
            state,
        })
    }

    pub fn set_active(&self, state: bool) -> Result<TResult> {
        self.inner.audio(&SetActive {
            instance_id: self.instance_id(),
            state,
        })
    }

    pub fn set_state(&self, state: &[u8]) -> Result<TResult> {
        self.inner.control(&SetState {
            instance_id: self.instance_id(),
            state: state.to_vec(),
        })
    }

    pub fn get_state(&self) -> Result<core::result::Result<Vec<u8>, TResult>> {
        self.inner.control(&GetState {
            instance_id: self.instance_id(),
        })
    }
}
