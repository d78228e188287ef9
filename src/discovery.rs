//! Capability discovery.
//!
//! Probes a real object for every [`InterfaceKind`] and records the ones it
//! answers, together with the static per-interface data that cannot change
//! over the object's lifetime. The resulting [`CapabilitySet`] is what the
//! construct response carries, so the native side can build a matching
//! proxy without probing anything itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::interfaces::{InstanceId, InterfaceArgs, InterfaceKind, PluginObject};

/// Supported interfaces of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub instance_id: InstanceId,
    /// Only supported kinds are present.
    pub interfaces: BTreeMap<InterfaceKind, InterfaceArgs>,
}

impl CapabilitySet {
    /// A set supporting nothing.
    pub fn empty(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            interfaces: BTreeMap::new(),
        }
    }

    /// Probe `object` against every known interface kind.
    pub fn discover(object: &dyn PluginObject, instance_id: InstanceId) -> Self {
        let interfaces = InterfaceKind::ALL
            .into_iter()
            .filter_map(|kind| probe(object, kind).map(|args| (kind, args)))
            .collect();
        Self {
            instance_id,
            interfaces,
        }
    }

    pub fn supports(&self, kind: InterfaceKind) -> bool {
        self.interfaces.contains_key(&kind)
    }

    pub fn args(&self, kind: InterfaceKind) -> Option<&InterfaceArgs> {
        self.interfaces.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = InterfaceKind> + '_ {
        self.interfaces.keys().copied()
    }

    /// Whether calls on this object need a dedicated audio channel.
    pub fn needs_dedicated_channel(&self) -> bool {
        self.kinds().any(InterfaceKind::uses_dedicated_channel)
    }
}

/// Cast-probe `object` for one interface kind.
fn probe(object: &dyn PluginObject, kind: InterfaceKind) -> Option<InterfaceArgs> {
    let supported = match kind {
        InterfaceKind::Component => {
            return object.component().map(|component| InterfaceArgs::Component {
                controller_class_id: component.controller_class_id(),
            });
        }
        InterfaceKind::PluginBase => object.plugin_base().is_some(),
        InterfaceKind::AudioProcessor => object.audio_processor().is_some(),
        InterfaceKind::AudioPresentationLatency => object.audio_presentation_latency().is_some(),
        InterfaceKind::ProcessContextRequirements => {
            object.process_context_requirements().is_some()
        }
        InterfaceKind::ConnectionPoint => object.connection_point().is_some(),
        InterfaceKind::EditController => object.edit_controller().is_some(),
        InterfaceKind::EditController2 => object.edit_controller_2().is_some(),
        InterfaceKind::EditControllerHostEditing => {
            object.edit_controller_host_editing().is_some()
        }
        InterfaceKind::MidiMapping => object.midi_mapping().is_some(),
        InterfaceKind::MidiLearn => object.midi_learn().is_some(),
        InterfaceKind::UnitInfo => object.unit_info().is_some(),
        InterfaceKind::ProgramListData => object.program_list_data().is_some(),
        InterfaceKind::ParameterFunctionName => object.parameter_function_name().is_some(),
        InterfaceKind::AutomationState => object.automation_state().is_some(),
        InterfaceKind::PrefetchableSupport => object.prefetchable_support().is_some(),
        InterfaceKind::XmlRepresentationController => {
            object.xml_representation_controller().is_some()
        }
    };
    supported.then_some(InterfaceArgs::None)
}
