//! Mock plugin objects and host contexts for integration tests.
//!
//! The factory keeps a handle to every object it creates so tests can
//! inspect the real objects behind a proxy, and starts a bridge pair in a
//! temporary directory.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use bridgework::interfaces::{
    AudioProcessor, BusInfo, ClassId, Component, ComponentHandler, ConnectionPoint,
    ConstructInterface, EditController, HostApplication, HostContext, Message, ParameterInfo,
    PluginBase, PluginObject, ProcessData, ProcessSetup, TResult, UnitDescription, UnitInfo,
};
use bridgework::{BridgeConfig, NativeBridge, PluginFactory, PluginHost};
use tempfile::TempDir;

pub const PROCESSOR_CLASS: ClassId = [1; 16];
pub const CONTROLLER_CLASS: ClassId = [2; 16];
/// A processor that only exposes `UnitInfo` once initialized.
pub const LATE_UNITS_CLASS: ClassId = [3; 16];
/// A processor whose audio interfaces only show up once initialized.
pub const LATE_AUDIO_CLASS: ClassId = [4; 16];
pub const UNKNOWN_CLASS: ClassId = [9; 16];

// ── Plugin object ─────────────────────────────────────────────

#[derive(Default)]
pub struct MockState {
    pub initialized: bool,
    pub active: bool,
    pub gain: f32,
    pub state: Vec<u8>,
    pub params: Vec<(u32, f64)>,
    pub peer: Option<Arc<dyn PluginObject>>,
    pub notifications: Vec<Message>,
    pub context: Option<Arc<dyn HostContext>>,
    pub component_handler: Option<Arc<dyn HostContext>>,
}

pub struct MockPlugin {
    pub class_id: ClassId,
    processor: bool,
    late_units: bool,
    late_audio: bool,
    pub state: Mutex<MockState>,
}

#[allow(dead_code)]
impl MockPlugin {
    pub fn new(class_id: ClassId) -> Self {
        Self {
            class_id,
            processor: class_id != CONTROLLER_CLASS,
            late_units: class_id == LATE_UNITS_CLASS,
            late_audio: class_id == LATE_AUDIO_CLASS,
            state: Mutex::new(MockState {
                gain: 2.0,
                ..MockState::default()
            }),
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn exposes_audio(&self) -> bool {
        self.processor && (!self.late_audio || self.with_state(|s| s.initialized))
    }
}

impl PluginObject for MockPlugin {
    fn plugin_base(&self) -> Option<&dyn PluginBase> {
        Some(self)
    }
    fn component(&self) -> Option<&dyn Component> {
        self.exposes_audio().then_some(self as &dyn Component)
    }
    fn audio_processor(&self) -> Option<&dyn AudioProcessor> {
        self.exposes_audio().then_some(self as &dyn AudioProcessor)
    }
    fn connection_point(&self) -> Option<&dyn ConnectionPoint> {
        Some(self)
    }
    fn edit_controller(&self) -> Option<&dyn EditController> {
        (!self.processor).then_some(self as &dyn EditController)
    }
    fn unit_info(&self) -> Option<&dyn UnitInfo> {
        let exposed = self.late_units && self.with_state(|s| s.initialized);
        exposed.then_some(self as &dyn UnitInfo)
    }
}

impl PluginBase for MockPlugin {
    fn initialize(&self, context: Arc<dyn HostContext>) -> TResult {
        self.with_state(|s| {
            if s.initialized {
                return TResult::FALSE;
            }
            s.initialized = true;
            s.context = Some(context);
            TResult::OK
        })
    }

    fn terminate(&self) -> TResult {
        self.with_state(|s| {
            s.initialized = false;
            s.context = None;
        });
        TResult::OK
    }
}

impl Component for MockPlugin {
    fn controller_class_id(&self) -> Option<ClassId> {
        Some(CONTROLLER_CLASS)
    }
    fn set_io_mode(&self, _mode: i32) -> TResult {
        TResult::NOT_IMPLEMENTED
    }
    fn bus_count(&self, _media_type: i32, _direction: i32) -> i32 {
        1
    }
    fn bus_info(&self, media_type: i32, direction: i32, index: i32) -> Result<BusInfo, TResult> {
        if index != 0 {
            return Err(TResult::INVALID_ARGUMENT);
        }
        Ok(BusInfo {
            media_type,
            direction,
            channel_count: 2,
            name: "Main".into(),
            bus_type: 0,
            flags: 1,
        })
    }
    fn activate_bus(&self, _: i32, _: i32, _: i32, _: bool) -> TResult {
        TResult::OK
    }
    fn set_active(&self, state: bool) -> TResult {
        self.with_state(|s| s.active = state);
        TResult::OK
    }
    fn set_state(&self, state: &[u8]) -> TResult {
        self.with_state(|s| s.state = state.to_vec());
        TResult::OK
    }
    fn get_state(&self) -> Result<Vec<u8>, TResult> {
        Ok(self.with_state(|s| s.state.clone()))
    }
}

impl AudioProcessor for MockPlugin {
    fn set_bus_arrangements(&self, inputs: &[u64], outputs: &[u64]) -> TResult {
        TResult::from(inputs.len() == outputs.len())
    }
    fn can_process_sample_size(&self, symbolic_sample_size: i32) -> TResult {
        TResult::from(symbolic_sample_size == 0)
    }
    fn latency_samples(&self) -> u32 {
        64
    }
    fn setup_processing(&self, _setup: &ProcessSetup) -> TResult {
        TResult::OK
    }
    fn set_processing(&self, _state: bool) -> TResult {
        TResult::OK
    }

    /// Outputs are the inputs times the gain.
    fn process(&self, data: &mut ProcessData) -> TResult {
        let gain = self.with_state(|s| s.gain);
        data.outputs.clone_from(&data.inputs);
        for bus in &mut data.outputs {
            for channel in &mut bus.channels {
                for sample in channel.iter_mut() {
                    *sample *= gain;
                }
            }
        }
        data.output_parameter_changes = data.input_parameter_changes.clone();
        TResult::OK
    }

    fn tail_samples(&self) -> u32 {
        0
    }
}

impl ConnectionPoint for MockPlugin {
    fn connect(&self, other: Arc<dyn PluginObject>) -> TResult {
        self.with_state(|s| s.peer = Some(other));
        TResult::OK
    }
    fn disconnect(&self, _other: Arc<dyn PluginObject>) -> TResult {
        self.with_state(|s| s.peer = None);
        TResult::OK
    }
    fn notify(&self, message: &Message) -> TResult {
        self.with_state(|s| s.notifications.push(message.clone()));
        TResult::OK
    }
}

impl EditController for MockPlugin {
    fn set_component_state(&self, state: &[u8]) -> TResult {
        self.with_state(|s| s.state = state.to_vec());
        TResult::OK
    }
    fn parameter_count(&self) -> i32 {
        1
    }
    fn parameter_info(&self, index: i32) -> Result<ParameterInfo, TResult> {
        if index != 0 {
            return Err(TResult::INVALID_ARGUMENT);
        }
        Ok(ParameterInfo {
            id: 100,
            title: "Gain".into(),
            short_title: "Gn".into(),
            units: "dB".into(),
            step_count: 0,
            default_normalized_value: 0.5,
            unit_id: 0,
            flags: 1,
        })
    }
    fn normalized_param_value(&self, id: u32) -> f64 {
        self.with_state(|s| {
            s.params
                .iter()
                .rev()
                .find(|(param, _)| *param == id)
                .map_or(0.0, |(_, value)| *value)
        })
    }
    fn set_param_normalized(&self, id: u32, value: f64) -> TResult {
        self.with_state(|s| s.params.push((id, value)));
        TResult::OK
    }
    fn plain_param_to_normalized(&self, _id: u32, plain: f64) -> f64 {
        plain / 10.0
    }
    fn set_component_handler(&self, handler: Option<Arc<dyn HostContext>>) -> TResult {
        self.with_state(|s| s.component_handler = handler);
        TResult::OK
    }
}

impl UnitInfo for MockPlugin {
    fn unit_count(&self) -> i32 {
        1
    }
    fn unit_info(&self, index: i32) -> Result<UnitDescription, TResult> {
        if index != 0 {
            return Err(TResult::INVALID_ARGUMENT);
        }
        Ok(UnitDescription {
            id: 0,
            parent_unit_id: -1,
            name: "Root".into(),
            program_list_id: -1,
        })
    }
    fn selected_unit(&self) -> i32 {
        0
    }
    fn select_unit(&self, _id: i32) -> TResult {
        TResult::OK
    }
}

// ── Factory ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockFactory {
    pub created: Mutex<Vec<Arc<MockPlugin>>>,
}

#[allow(dead_code)]
impl MockFactory {
    /// The `n`th object created so far.
    pub fn object(&self, n: usize) -> Arc<MockPlugin> {
        Arc::clone(&self.created.lock().unwrap()[n])
    }
}

impl PluginFactory for MockFactory {
    fn create_instance(
        &self,
        class_id: &ClassId,
        _requested_interface: ConstructInterface,
    ) -> Result<Arc<dyn PluginObject>, TResult> {
        if ![PROCESSOR_CLASS, CONTROLLER_CLASS, LATE_UNITS_CLASS, LATE_AUDIO_CLASS].contains(class_id) {
            return Err(TResult::INVALID_ARGUMENT);
        }
        let object = Arc::new(MockPlugin::new(*class_id));
        self.created.lock().unwrap().push(Arc::clone(&object));
        Ok(object)
    }
}

// ── Host context ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    BeginEdit(u32),
    PerformEdit(u32, f64),
    EndEdit(u32),
    Restart(i32),
}

/// Native-side host context. The component handler part can be switched
/// off to check that only implemented interfaces are exposed.
pub struct MockHost {
    pub handles_edits: bool,
    pub calls: Mutex<Vec<HostCall>>,
}

#[allow(dead_code)]
impl MockHost {
    pub fn new(handles_edits: bool) -> Arc<Self> {
        Arc::new(Self {
            handles_edits,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl HostContext for MockHost {
    fn host_application(&self) -> Option<&dyn HostApplication> {
        Some(self)
    }
    fn component_handler(&self) -> Option<&dyn ComponentHandler> {
        self.handles_edits.then_some(self as &dyn ComponentHandler)
    }
}

impl HostApplication for MockHost {
    fn name(&self) -> Result<String, TResult> {
        Ok("Mock Host".into())
    }
}

impl ComponentHandler for MockHost {
    fn begin_edit(&self, id: u32) -> TResult {
        self.calls.lock().unwrap().push(HostCall::BeginEdit(id));
        TResult::OK
    }
    fn perform_edit(&self, id: u32, value_normalized: f64) -> TResult {
        self.calls
            .lock()
            .unwrap()
            .push(HostCall::PerformEdit(id, value_normalized));
        TResult::OK
    }
    fn end_edit(&self, id: u32) -> TResult {
        self.calls.lock().unwrap().push(HostCall::EndEdit(id));
        TResult::OK
    }
    fn restart_component(&self, flags: i32) -> TResult {
        self.calls.lock().unwrap().push(HostCall::Restart(flags));
        TResult::OK
    }
}

// ── Bridge pair ───────────────────────────────────────────────

/// Both ends of a bridge in one process.
pub struct Bridge {
    pub native: NativeBridge,
    pub factory: Arc<MockFactory>,
    pub host: Arc<PluginHost>,
    serving: Option<JoinHandle<bridgework::Result<()>>>,
    _dir: TempDir,
}

#[allow(dead_code)]
impl Bridge {
    pub fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            endpoint_base_dir: Some(dir.path().join("bridge")),
            ..BridgeConfig::default()
        };
        let native = NativeBridge::new(&config).unwrap();
        let endpoints = native.endpoints().clone();
        let factory = Arc::new(MockFactory::default());

        let connecting = {
            let factory = Arc::clone(&factory) as Arc<dyn PluginFactory>;
            thread::spawn(move || PluginHost::connect(endpoints, factory, &config).map(Arc::new))
        };
        native.connect().unwrap();
        let host = connecting.join().unwrap().unwrap();

        let serving = {
            let host = Arc::clone(&host);
            thread::spawn(move || host.run())
        };
        Self {
            native,
            factory,
            host,
            serving: Some(serving),
            _dir: dir,
        }
    }

    /// Shut the native side down and wait for the owning side to notice.
    pub fn shutdown(mut self) -> bridgework::Result<()> {
        self.native.close();
        self.serving.take().unwrap().join().unwrap()
    }
}
