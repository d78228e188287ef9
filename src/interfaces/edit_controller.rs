//! Parameters and the edit controller family: knob modes, host-driven
//! edits and MIDI mapping.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::host_context::{HostContext, HostContextArgs};
use super::{InstanceId, TResult, kinds};
use crate::error::Result;
use crate::proxy::Capability;

pub trait EditController: Send + Sync {
    fn set_component_state(&self, state: &[u8]) -> TResult;
    fn parameter_count(&self) -> i32;
    fn parameter_info(&self, index: i32) -> core::result::Result<ParameterInfo, TResult>;
    fn normalized_param_value(&self, id: u32) -> f64;
    fn set_param_normalized(&self, id: u32, value: f64) -> TResult;
    fn plain_param_to_normalized(&self, id: u32, plain: f64) -> f64;
    /// `None` clears a previously set handler.
    fn set_component_handler(&self, handler: Option<Arc<dyn HostContext>>) -> TResult;
}

pub trait EditController2: Send + Sync {
    fn set_knob_mode(&self, mode: i32) -> TResult;
    fn open_help(&self, only_check: bool) -> TResult;
}

pub trait EditControllerHostEditing: Send + Sync {
    fn begin_edit_from_host(&self, id: u32) -> TResult;
    fn end_edit_from_host(&self, id: u32) -> TResult;
}

pub trait MidiMapping: Send + Sync {
    fn midi_controller_assignment(&self, bus_index: i32, channel: i16, midi_cc: i16) -> core::result::Result<u32, TResult>;
}

pub trait MidiLearn: Send + Sync {
    fn on_live_midi_controller_input(&self, bus_index: i32, channel: i16, midi_cc: i16) -> TResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub id: u32,
    pub title: String,
    pub short_title: String,
    pub units: String,
    pub step_count: i32,
    pub default_normalized_value: f64,
    pub unit_id: i32,
    pub flags: i32,
}

// ── Requests ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetComponentState {
    pub instance_id: InstanceId,
    pub state: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetParameterCount {
    pub instance_id: InstanceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetParameterInfo {
    pub instance_id: InstanceId,
    pub index: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetParamNormalized {
    pub instance_id: InstanceId,
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetParamNormalized {
    pub instance_id: InstanceId,
    pub id: u32,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlainParamToNormalized {
    pub instance_id: InstanceId,
    pub id: u32,
    pub plain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetComponentHandler {
    pub instance_id: InstanceId,
    /// Capabilities of the handler, `None` to clear it.
    pub handler: Option<HostContextArgs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetKnobMode {
    pub instance_id: InstanceId,
    pub mode: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenHelp {
    pub instance_id: InstanceId,
    pub only_check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginEditFromHost {
    pub instance_id: InstanceId,
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndEditFromHost {
    pub instance_id: InstanceId,
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMidiControllerAssignment {
    pub instance_id: InstanceId,
    pub bus_index: i32,
    pub channel: i16,
    pub midi_cc: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnLiveMidiControllerInput {
    pub instance_id: InstanceId,
    pub bus_index: i32,
    pub channel: i16,
    pub midi_cc: i16,
}

// ── Capability modules ───────────────────────────────────────

impl Capability<'_, kinds::EditController> {
    pub fn set_component_state(&self, state: &[u8]) -> Result<TResult> {
        self.inner.control(&SetComponentState {
            instance_id: self.instance_id(),
            state: state.to_vec(),
        })
    }

    pub fn parameter_count(&self) -> Result<i32> {
        self.inner.control(&GetParameterCount {
            instance_id: self.instance_id(),
        })
    }

    pub fn parameter_info(&self, index: i32) -> Result<core::result::Result<ParameterInfo, TResult>> {
        self.inner.control(&GetParameterInfo {
            instance_id: self.instance_id(),
            index,
        })
    }

    pub fn normalized_param_value(&self, id: u32) -> Result<f64> {
        self.inner.control(&GetParamNormalized {
            instance_id: self.instance_id(),
            id,
        })
    }

    pub fn set_param_normalized(&self, id: u32, value: f64) -> Result<TResult> {
        self.inner.control(&SetParamNormalized {
            instance_id: self.instance_id(),
            id,
            value,
        })
    }

    pub fn plain_param_to_normalized(&self, id: u32, plain: f64) -> Result<f64> {
        self.inner.control(&PlainParamToNormalized {
            instance_id: self.instance_id(),
            id,
            plain,
        })
    }

    /// Hand the object a component handler. Its callbacks are routed back
    /// to `handler` on this side.
    pub fn set_component_handler(&self, handler: Option<Arc<dyn HostContext>>) -> Result<TResult> {
        self.inner.set_component_handler(handler)
    }
}

impl Capability<'_, kinds::EditController2> {
    pub fn set_knob_mode(&self, mode: i32) -> Result<TResult> {
        self.inner.control(&SetKnobMode {
            instance_id: self.instance_id(),
            mode,
        })
    }

    pub fn open_help(&self, only_check: bool) -> Result<TResult> {
        self.inner.control(&OpenHelp {
            instance_id: self.instance_id(),
            only_check,
        })
    }
}

impl Capability<'_, kinds::EditControllerHostEditing> {
    pub fn begin_edit_from_host(&self, id: u32) -> Result<TResult> {
        self.inner.control(&BeginEditFromHost {
            instance_id: self.instance_id(),
            id,
        })
    }

    pub fn end_edit_from_host(&self, id: u32) -> Result<TResult> {
        self.inner.control(&EndEditFromHost {
            instance_id: self.instance_id(),
            id,
        })
    }
}

impl Capability<'_, kinds::MidiMapping> {
    pub fn midi_controller_assignment(
        &self,
        bus_index: i32,
        channel: i16,
        midi_cc: i16,
    ) -> Result<core::result::Result<u32, TResult>> {
        self.inner.control(&GetMidiControllerAssignment {
            instance_id: self.instance_id(),
            bus_index,
            channel,
            midi_cc,
        })
    }
}

impl Capability<'_, kinds::MidiLearn> {
    pub fn on_live_midi_controller_input(&self, bus_index: i32, channel: i16, midi_cc: i16) -> Result<TResult> {
        self.inner.control(&OnLiveMidiControllerInput {
            instance_id: self.instance_id(),
            bus_index,
            channel,
            midi_cc,
        })
    }
}
