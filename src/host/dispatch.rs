//! Request handlers on the owning side.
//!
//! Every handler looks the target object up by instance id, casts it to the
//! interface the request belongs to and makes the real call. A missing
//! object or interface is answered with a result code, never with a
//! transport error, so the other side always gets a response.

use std::mem;
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::HostShared;
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
    BusInfo, HostContext, HostContextArgs, InstanceId, ParameterInfo, PluginObject,
    ProcessResponse, TResult, UnitDescription, Unavailable,
};
use crate::messages::{
    Ack, AudioProcessorHandler, Construct, ConstructResponse, ControlHandler, Destruct,
    Rediscover,
};
use crate::proxy::HostContextProxy;

type Outcome<T> = core::result::Result<T, TResult>;

impl HostShared {
    /// Run `call` against the live object `instance_id`. `call` returns
    /// `None` when the object lacks the interface it needs.
    fn call<R: Unavailable>(
        &self,
        instance_id: InstanceId,
        call: impl FnOnce(&dyn PluginObject) -> Option<R>,
    ) -> R {
        let Some(object) = self.registry.get(instance_id) else {
            warn!("request for unknown instance {instance_id}");
            return R::unavailable(TResult::INTERNAL_ERROR);
        };
        call(&*object).unwrap_or_else(|| R::unavailable(TResult::NO_INTERFACE))
    }

    /// Probe `object` again and make sure its dedicated channel exists if
    /// it needs one. The channel is bound before this returns.
    fn rediscover(self: &Arc<Self>, instance_id: InstanceId, object: &dyn PluginObject) -> CapabilitySet {
        let capabilities = CapabilitySet::discover(object, instance_id);
        if capabilities.needs_dedicated_channel() && !self.sockets.has_audio_processor(instance_id) {
            if let Err(e) = self.listen_audio_processor(instance_id) {
                error!("could not set up the audio processor channel for instance {instance_id}: {e}");
            }
        }
        capabilities
    }

    fn listen_audio_processor(self: &Arc<Self>, instance_id: InstanceId) -> crate::error::Result<()> {
        let handler: Arc<dyn AudioProcessorHandler> = Arc::new(AudioDispatcher {
            shared: Arc::clone(self),
        });
        self.sockets
            .add_audio_processor_and_listen(instance_id, self.logging.clone(), handler)
    }

    fn host_context(&self, args: HostContextArgs) -> Arc<dyn HostContext> {
        Arc::new(HostContextProxy::new(
            args,
            &self.sockets,
            self.callback_logging.clone(),
        ))
    }
}

// ── Control ──────────────────────────────────────────────────

pub(crate) struct ControlDispatcher {
    pub(crate) shared: Arc<HostShared>,
}

impl ControlHandler for ControlDispatcher {
    fn construct(&self, request: Construct) -> ConstructResponse {
        let object = self
            .shared
            .factory
            .create_instance(&request.class_id, request.requested_interface)?;
        let instance_id = self.shared.registry.next_id();
        let capabilities = CapabilitySet::discover(&*object, instance_id);
        self.shared.registry.insert(instance_id, object);

        if capabilities.needs_dedicated_channel() {
            if let Err(e) = self.shared.listen_audio_processor(instance_id) {
                error!("could not set up the audio processor channel for instance {instance_id}: {e}");
                self.shared.registry.remove(instance_id);
                return Err(TResult::INTERNAL_ERROR);
            }
        }
        info!(
            "created instance {instance_id} ({:?}) with {} interfaces",
            request.requested_interface,
            capabilities.interfaces.len()
        );
        Ok(capabilities)
    }

    fn destruct(&self, request: Destruct) -> Ack {
        let instance_id = request.instance_id;
        self.shared.sockets.remove_audio_processor(instance_id);
        match self.shared.registry.remove(instance_id) {
            Some(_) => debug!("destructed instance {instance_id}"),
            None => warn!("destruct for unknown instance {instance_id}"),
        }
        Ack
    }

    fn rediscover(&self, request: Rediscover) -> ConstructResponse {
        self.shared.call(request.instance_id, |object| {
            Some(Ok(self.shared.rediscover(request.instance_id, object)))
        })
    }

    fn initialize(&self, request: Initialize) -> InitializeResponse {
        let context = self.shared.host_context(request.host_context);
        self.shared.call(request.instance_id, |object| {
            let result = object.plugin_base()?.initialize(context);
            Some(InitializeResponse {
                result,
                updated_capabilities: Some(self.shared.rediscover(request.instance_id, object)),
            })
        })
    }

    fn terminate(&self, request: Terminate) -> TResult {
        self.shared
            .call(request.instance_id, |o| o.plugin_base().map(|p| p.terminate()))
    }

    fn set_state(&self, request: SetState) -> TResult {
        self.shared
            .call(request.instance_id, |o| o.component().map(|c| c.set_state(&request.state)))
    }

    fn get_state(&self, request: GetState) -> Outcome<Vec<u8>> {
        self.shared
            .call(request.instance_id, |o| o.component().map(|c| c.get_state()))
    }

    fn connect(&self, request: Connect) -> TResult {
        let Some(other) = self.shared.registry.get(request.other_instance_id) else {
            warn!("connect to unknown instance {}", request.other_instance_id);
            return TResult::INVALID_ARGUMENT;
        };
        self.shared.call(request.instance_id, |o| {
            o.connection_point().map(|c| c.connect(other))
        })
    }

    fn disconnect(&self, request: Disconnect) -> TResult {
        let Some(other) = self.shared.registry.get(request.other_instance_id) else {
            warn!("disconnect from unknown instance {}", request.other_instance_id);
            return TResult::INVALID_ARGUMENT;
        };
        self.shared.call(request.instance_id, |o| {
            o.connection_point().map(|c| c.disconnect(other))
        })
    }

    fn notify(&self, request: Notify) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.connection_point().map(|c| c.notify(&request.message))
        })
    }

    fn set_component_state(&self, request: SetComponentState) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.edit_controller().map(|c| c.set_component_state(&request.state))
        })
    }

    fn get_parameter_count(&self, request: GetParameterCount) -> i32 {
        self.shared
            .call(request.instance_id, |o| o.edit_controller().map(|c| c.parameter_count()))
    }

    fn get_parameter_info(&self, request: GetParameterInfo) -> Outcome<ParameterInfo> {
        self.shared.call(request.instance_id, |o| {
            o.edit_controller().map(|c| c.parameter_info(request.index))
        })
    }

    fn get_param_normalized(&self, request: GetParamNormalized) -> f64 {
        self.shared.call(request.instance_id, |o| {
            o.edit_controller().map(|c| c.normalized_param_value(request.id))
        })
    }

    fn set_param_normalized(&self, request: SetParamNormalized) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.edit_controller()
                .map(|c| c.set_param_normalized(request.id, request.value))
        })
    }

    fn plain_param_to_normalized(&self, request: PlainParamToNormalized) -> f64 {
        self.shared.call(request.instance_id, |o| {
            o.edit_controller()
                .map(|c| c.plain_param_to_normalized(request.id, request.plain))
        })
    }

    fn set_component_handler(&self, request: SetComponentHandler) -> TResult {
        let handler = request.handler.map(|args| self.shared.host_context(args));
        self.shared.call(request.instance_id, |o| {
            o.edit_controller().map(|c| c.set_component_handler(handler))
        })
    }

    fn set_knob_mode(&self, request: SetKnobMode) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.edit_controller_2().map(|c| c.set_knob_mode(request.mode))
        })
    }

    fn open_help(&self, request: OpenHelp) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.edit_controller_2().map(|c| c.open_help(request.only_check))
        })
    }

    fn begin_edit_from_host(&self, request: BeginEditFromHost) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.edit_controller_host_editing()
                .map(|c| c.begin_edit_from_host(request.id))
        })
    }

    fn end_edit_from_host(&self, request: EndEditFromHost) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.edit_controller_host_editing()
                .map(|c| c.end_edit_from_host(request.id))
        })
    }

    fn get_midi_controller_assignment(&self, request: GetMidiControllerAssignment) -> Outcome<u32> {
        self.shared.call(request.instance_id, |o| {
            o.midi_mapping().map(|m| {
                m.midi_controller_assignment(request.bus_index, request.channel, request.midi_cc)
            })
        })
    }

    fn on_live_midi_controller_input(&self, request: OnLiveMidiControllerInput) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.midi_learn().map(|m| {
                m.on_live_midi_controller_input(request.bus_index, request.channel, request.midi_cc)
            })
        })
    }

    fn get_unit_count(&self, request: GetUnitCount) -> i32 {
        self.shared
            .call(request.instance_id, |o| o.unit_info().map(|u| u.unit_count()))
    }

    fn get_unit_info(&self, request: GetUnitInfo) -> Outcome<UnitDescription> {
        self.shared.call(request.instance_id, |o| {
            o.unit_info().map(|u| u.unit_info(request.index))
        })
    }

    fn get_selected_unit(&self, request: GetSelectedUnit) -> i32 {
        self.shared
            .call(request.instance_id, |o| o.unit_info().map(|u| u.selected_unit()))
    }

    fn select_unit(&self, request: SelectUnit) -> TResult {
        self.shared
            .call(request.instance_id, |o| o.unit_info().map(|u| u.select_unit(request.id)))
    }

    fn program_data_supported(&self, request: ProgramDataSupported) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.program_list_data()
                .map(|p| p.program_data_supported(request.list_id))
        })
    }

    fn get_program_data(&self, request: GetProgramData) -> Outcome<Vec<u8>> {
        self.shared.call(request.instance_id, |o| {
            o.program_list_data()
                .map(|p| p.get_program_data(request.list_id, request.program_index))
        })
    }

    fn set_program_data(&self, request: SetProgramData) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.program_list_data().map(|p| {
                p.set_program_data(request.list_id, request.program_index, &request.data)
            })
        })
    }

    fn get_parameter_id_from_function_name(
        &self,
        request: GetParameterIdFromFunctionName,
    ) -> Outcome<u32> {
        self.shared.call(request.instance_id, |o| {
            o.parameter_function_name().map(|p| {
                p.parameter_id_from_function_name(request.unit_id, &request.function_name)
            })
        })
    }

    fn set_automation_state(&self, request: SetAutomationState) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.automation_state()
                .map(|a| a.set_automation_state(request.state))
        })
    }

    fn get_xml_representation_stream(&self, request: GetXmlRepresentationStream) -> Outcome<Vec<u8>> {
        self.shared.call(request.instance_id, |o| {
            o.xml_representation_controller()
                .map(|x| x.xml_representation_stream(request.unit_id, &request.name))
        })
    }
}

// ── Dedicated audio channel ──────────────────────────────────

pub(crate) struct AudioDispatcher {
    pub(crate) shared: Arc<HostShared>,
}

impl AudioProcessorHandler for AudioDispatcher {
    fn set_io_mode(&self, request: SetIoMode) -> TResult {
        self.shared
            .call(request.instance_id, |o| o.component().map(|c| c.set_io_mode(request.mode)))
    }

    fn get_bus_count(&self, request: GetBusCount) -> i32 {
        self.shared.call(request.instance_id, |o| {
            o.component()
                .map(|c| c.bus_count(request.media_type, request.direction))
        })
    }

    fn get_bus_info(&self, request: GetBusInfo) -> Outcome<BusInfo> {
        self.shared.call(request.instance_id, |o| {
            o.component()
                .map(|c| c.bus_info(request.media_type, request.direction, request.index))
        })
    }

    fn activate_bus(&self, request: ActivateBus) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.component().map(|c| {
                c.activate_bus(request.media_type, request.direction, request.index, request.state)
            })
        })
    }

    fn set_active(&self, request: SetActive) -> TResult {
        self.shared
            .call(request.instance_id, |o| o.component().map(|c| c.set_active(request.state)))
    }

    fn set_bus_arrangements(&self, request: SetBusArrangements) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.audio_processor()
                .map(|p| p.set_bus_arrangements(&request.inputs, &request.outputs))
        })
    }

    fn can_process_sample_size(&self, request: CanProcessSampleSize) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.audio_processor()
                .map(|p| p.can_process_sample_size(request.symbolic_sample_size))
        })
    }

    fn get_latency_samples(&self, request: GetLatencySamples) -> u32 {
        self.shared
            .call(request.instance_id, |o| o.audio_processor().map(|p| p.latency_samples()))
    }

    fn setup_processing(&self, request: SetupProcessing) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.audio_processor().map(|p| p.setup_processing(&request.setup))
        })
    }

    fn set_processing(&self, request: SetProcessing) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.audio_processor().map(|p| p.set_processing(request.state))
        })
    }

    fn process(&self, request: Process) -> ProcessResponse {
        let mut data = request.data;
        self.shared.call(request.instance_id, |o| {
            o.audio_processor().map(|p| {
                let result = p.process(&mut data);
                ProcessResponse {
                    result,
                    outputs: mem::take(&mut data.outputs),
                    output_parameter_changes: mem::take(&mut data.output_parameter_changes),
                }
            })
        })
    }

    fn get_tail_samples(&self, request: GetTailSamples) -> u32 {
        self.shared
            .call(request.instance_id, |o| o.audio_processor().map(|p| p.tail_samples()))
    }

    fn set_audio_presentation_latency_samples(
        &self,
        request: SetAudioPresentationLatencySamples,
    ) -> TResult {
        self.shared.call(request.instance_id, |o| {
            o.audio_presentation_latency().map(|l| {
                l.set_audio_presentation_latency_samples(
                    request.direction,
                    request.bus_index,
                    request.latency,
                )
            })
        })
    }

    fn get_process_context_requirements(&self, request: GetProcessContextRequirements) -> u32 {
        self.shared.call(request.instance_id, |o| {
            o.process_context_requirements()
                .map(|r| r.process_context_requirements())
        })
    }

    fn get_prefetchable_support(&self, request: GetPrefetchableSupport) -> Outcome<u32> {
        self.shared.call(request.instance_id, |o| {
            o.prefetchable_support().map(|p| p.prefetchable_support())
        })
    }
}
