//! The three traffic classes and their request kinds.
//!
//! | Class | Direction | Channel |
//! |---|---|---|
//! | [`ControlRequest`] | native → owning side | control, ad-hoc |
//! | [`CallbackRequest`] | owning side → native | callback, ad-hoc |
//! | [`AudioProcessorRequest`] | native → owning side | one per instance, dedicated |
//!
//! Adding a request kind means adding a line here and a method to the
//! generated handler trait; the compiler points at every handler that
//! still needs it.

use serde::{Deserialize, Serialize};

use crate::discovery::CapabilitySet;
use crate::interfaces::audio_processor::{
    CanProcessSampleSize, GetLatencySamples, GetProcessContextRequirements, GetTailSamples, Process,
    SetAudioPresentationLatencySamples, SetBusArrangements, SetProcessing, SetupProcessing,
};
use crate::interfaces::component::{
    ActivateBus, GetBusCount, GetBusInfo, GetState, SetActive, SetIoMode, SetState,
};
use crate::interfaces::connection_point::{Connect, Disconnect, Notify};
use crate::interfaces::edit_controller::{
    BeginEditFromHost, EndEditFromHost, GetMidiControllerAssignment, GetParamNormalized,
    GetParameterCount, GetParameterInfo, OnLiveMidiControllerInput, OpenHelp,
    PlainParamToNormalized, SetComponentHandler, SetComponentState, SetKnobMode,
    SetParamNormalized,
};
use crate::interfaces::host_context::{
    BeginEdit, EndEdit, HostGetName, PerformEdit, RestartComponent,
};
use crate::interfaces::misc::{
    GetParameterIdFromFunctionName, GetPrefetchableSupport, GetXmlRepresentationStream,
    SetAutomationState,
};
use crate::interfaces::plugin_base::{Initialize, InitializeResponse, Terminate};
use crate::interfaces::unit_info::{
    GetProgramData, GetSelectedUnit, GetUnitCount, GetUnitInfo, ProgramDataSupported,
    SelectUnit, SetProgramData,
};
use crate::interfaces::{
    BusInfo, ClassId, ConstructInterface, InstanceId, ParameterInfo, ProcessResponse, TResult,
    UnitDescription,
};

/// Empty acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ack;

/// A capability record for a freshly created or re-probed object, or the
/// factory's failure code.
pub type ConstructResponse = core::result::Result<CapabilitySet, TResult>;

// ── Lifecycle requests ───────────────────────────────────────

/// Create an object through the plugin factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Construct {
    pub class_id: ClassId,
    pub requested_interface: ConstructInterface,
}

/// Release the real object behind a proxy. One-way in spirit: the response
/// is an empty acknowledgement, sent even for ids that are already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destruct {
    pub instance_id: InstanceId,
}

/// Probe an existing object again and return its current capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rediscover {
    pub instance_id: InstanceId,
}

// ── Traffic classes ──────────────────────────────────────────

crate::request_union! {
    /// Calls from the native side to the owning side, outside the audio
    /// path.
    pub enum ControlRequest in ControlHandler, high_frequency = false {
        Construct: construct -> ConstructResponse,
        Destruct: destruct -> Ack,
        Rediscover: rediscover -> ConstructResponse,
        Initialize: initialize -> InitializeResponse,
        Terminate: terminate -> TResult,
        SetState: set_state -> TResult,
        GetState: get_state -> core::result::Result<Vec<u8>, TResult>,
        Connect: connect -> TResult,
        Disconnect: disconnect -> TResult,
        Notify: notify -> TResult,
        SetComponentState: set_component_state -> TResult,
        GetParameterCount: get_parameter_count -> i32,
        GetParameterInfo: get_parameter_info -> core::result::Result<ParameterInfo, TResult>,
        GetParamNormalized: get_param_normalized -> f64,
        SetParamNormalized: set_param_normalized -> TResult,
        PlainParamToNormalized: plain_param_to_normalized -> f64,
        SetComponentHandler: set_component_handler -> TResult,
        SetKnobMode: set_knob_mode -> TResult,
        OpenHelp: open_help -> TResult,
        BeginEditFromHost: begin_edit_from_host -> TResult,
        EndEditFromHost: end_edit_from_host -> TResult,
        GetMidiControllerAssignment: get_midi_controller_assignment -> core::result::Result<u32, TResult>,
        OnLiveMidiControllerInput: on_live_midi_controller_input -> TResult,
        GetUnitCount: get_unit_count -> i32,
        GetUnitInfo: get_unit_info -> core::result::Result<UnitDescription, TResult>,
        GetSelectedUnit: get_selected_unit -> i32,
        SelectUnit: select_unit -> TResult,
        ProgramDataSupported: program_data_supported -> TResult,
        GetProgramData: get_program_data -> core::result::Result<Vec<u8>, TResult>,
        SetProgramData: set_program_data -> TResult,
        GetParameterIdFromFunctionName: get_parameter_id_from_function_name -> core::result::Result<u32, TResult>,
        SetAutomationState: set_automation_state -> TResult,
        GetXmlRepresentationStream: get_xml_representation_stream -> core::result::Result<Vec<u8>, TResult>,
    }
}

crate::request_union! {
    /// Calls from plugin objects back into host contexts on the native
    /// side.
    pub enum CallbackRequest in CallbackHandler, high_frequency = false {
        HostGetName: host_get_name -> core::result::Result<String, TResult>,
        BeginEdit: begin_edit -> TResult,
        PerformEdit: perform_edit -> TResult,
        EndEdit: end_edit -> TResult,
        RestartComponent: restart_component -> TResult,
    }
}

crate::request_union! {
    /// Calls made from the host's audio setup and processing path, each
    /// instance on its own dedicated channel.
    pub enum AudioProcessorRequest in AudioProcessorHandler, high_frequency = true {
        SetIoMode: set_io_mode -> TResult,
        GetBusCount: get_bus_count -> i32,
        GetBusInfo: get_bus_info -> core::result::Result<BusInfo, TResult>,
        ActivateBus: activate_bus -> TResult,
        SetActive: set_active -> TResult,
        SetBusArrangements: set_bus_arrangements -> TResult,
        CanProcessSampleSize: can_process_sample_size -> TResult,
        GetLatencySamples: get_latency_samples -> u32,
        SetupProcessing: setup_processing -> TResult,
        SetProcessing: set_processing -> TResult,
        Process: process -> ProcessResponse,
        GetTailSamples: get_tail_samples -> u32,
        SetAudioPresentationLatencySamples: set_audio_presentation_latency_samples -> TResult,
        GetProcessContextRequirements: get_process_context_requirements -> u32,
        GetPrefetchableSupport: get_prefetchable_support -> core::result::Result<u32, TResult>,
    }
}
