//! Plugin interface kinds.
//!
//! A plugin object optionally implements any subset of the interface kinds
//! listed in [`InterfaceKind`]. Each kind has its own module with:
//!
//! - the trait the real object implements on the owning side,
//! - the request kinds that carry its calls across the process boundary,
//! - the capability-module methods on the proxy
//!   ([`Capability`](crate::proxy::Capability)`<'_, kinds::X>`).
//!
//! Only a representative subset of every interface's methods is carried;
//! each one follows the same pattern.

pub mod audio_processor;
pub mod component;
pub mod connection_point;
pub mod edit_controller;
pub mod host_context;
pub mod misc;
pub mod plugin_base;
pub mod unit_info;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use audio_processor::{
    AudioBusBuffers, AudioPresentationLatency, AudioProcessor, ParameterChange, ProcessContext,
    ProcessContextRequirements, ProcessData, ProcessResponse, ProcessSetup,
};
pub use component::{BusInfo, Component};
pub use connection_point::{AttributeValue, ConnectionPoint, Message};
pub use edit_controller::{
    EditController, EditController2, EditControllerHostEditing, MidiLearn, MidiMapping,
    ParameterInfo,
};
pub use host_context::{
    ComponentHandler, HostApplication, HostContext, HostContextArgs, HostInterfaceKind,
};
pub use misc::{
    AutomationState, ParameterFunctionName, PrefetchableSupport, XmlRepresentationController,
};
pub use plugin_base::PluginBase;
pub use unit_info::{ProgramListData, UnitDescription, UnitInfo};

/// Process-wide object id, assigned by the side owning the real object.
pub type InstanceId = u64;

/// 16-byte class identifier.
pub type ClassId = [u8; 16];

// ---------------------------------------------------------------------------
// Result codes
// ---------------------------------------------------------------------------

/// Result code returned by every plugin call, carried verbatim across the
/// boundary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TResult(pub i32);

impl TResult {
    pub const OK: Self = Self(0);
    pub const FALSE: Self = Self(1);
    pub const NO_INTERFACE: Self = Self(-1);
    pub const INVALID_ARGUMENT: Self = Self(2);
    pub const NOT_IMPLEMENTED: Self = Self(3);
    pub const INTERNAL_ERROR: Self = Self(4);
    pub const NOT_INITIALIZED: Self = Self(5);
    pub const OUT_OF_MEMORY: Self = Self(6);

    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }

    const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "kResultOk",
            1 => "kResultFalse",
            -1 => "kNoInterface",
            2 => "kInvalidArgument",
            3 => "kNotImplemented",
            4 => "kInternalError",
            5 => "kNotInitialized",
            6 => "kOutOfMemory",
            _ => return None,
        })
    }
}

impl fmt::Debug for TResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "TResult({})", self.0),
        }
    }
}

impl fmt::Display for TResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Default for TResult {
    fn default() -> Self {
        Self::OK
    }
}

impl From<bool> for TResult {
    fn from(ok: bool) -> Self {
        if ok { Self::OK } else { Self::FALSE }
    }
}

/// Response value to use when a call cannot reach the real object (unknown
/// instance, interface not implemented).
pub trait Unavailable {
    fn unavailable(code: TResult) -> Self;
}

impl Unavailable for TResult {
    fn unavailable(code: TResult) -> Self {
        code
    }
}

impl<T> Unavailable for core::result::Result<T, TResult> {
    fn unavailable(code: TResult) -> Self {
        Err(code)
    }
}

macro_rules! unavailable_as_zero {
    ($($ty:ty),+) => {
        $(
            impl Unavailable for $ty {
                fn unavailable(_: TResult) -> Self {
                    <$ty>::default()
                }
            }
        )+
    };
}

unavailable_as_zero!(i32, u32, f64);

// ---------------------------------------------------------------------------
// Interface kinds
// ---------------------------------------------------------------------------

/// Every optional interface a plugin object may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InterfaceKind {
    PluginBase,
    Component,
    AudioProcessor,
    AudioPresentationLatency,
    ProcessContextRequirements,
    ConnectionPoint,
    EditController,
    EditController2,
    EditControllerHostEditing,
    MidiMapping,
    MidiLearn,
    UnitInfo,
    ProgramListData,
    ParameterFunctionName,
    AutomationState,
    PrefetchableSupport,
    XmlRepresentationController,
}

impl InterfaceKind {
    pub const ALL: [Self; 17] = [
        Self::PluginBase,
        Self::Component,
        Self::AudioProcessor,
        Self::AudioPresentationLatency,
        Self::ProcessContextRequirements,
        Self::ConnectionPoint,
        Self::EditController,
        Self::EditController2,
        Self::EditControllerHostEditing,
        Self::MidiMapping,
        Self::MidiLearn,
        Self::UnitInfo,
        Self::ProgramListData,
        Self::ParameterFunctionName,
        Self::AutomationState,
        Self::PrefetchableSupport,
        Self::XmlRepresentationController,
    ];

    /// Whether calls on this interface travel over the dedicated
    /// per-instance channel.
    pub const fn uses_dedicated_channel(self) -> bool {
        matches!(
            self,
            Self::Component
                | Self::AudioProcessor
                | Self::AudioPresentationLatency
                | Self::ProcessContextRequirements
                | Self::PrefetchableSupport
        )
    }
}

/// Static per-interface data captured at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceArgs {
    None,
    Component {
        /// Class id of the matching edit controller, if the component
        /// reports one.
        controller_class_id: Option<ClassId>,
    },
}

/// Interface a host asked the factory to create an object for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructInterface {
    Component,
    EditController,
}

/// Compile-time tags naming one interface kind, used to type
/// [`Capability`](crate::proxy::Capability) handles.
pub trait Interface {
    const KIND: InterfaceKind;
}

pub mod kinds {
    //! Marker types, one per [`InterfaceKind`](super::InterfaceKind).

    macro_rules! markers {
        ($($kind:ident),+ $(,)?) => {
            $(
                #[derive(Debug, Clone, Copy)]
                pub enum $kind {}

                impl super::Interface for $kind {
                    const KIND: super::InterfaceKind = super::InterfaceKind::$kind;
                }
            )+
        };
    }

    markers!(
        PluginBase,
        Component,
        AudioProcessor,
        AudioPresentationLatency,
        ProcessContextRequirements,
        ConnectionPoint,
        EditController,
        EditController2,
        EditControllerHostEditing,
        MidiMapping,
        MidiLearn,
        UnitInfo,
        ProgramListData,
        ParameterFunctionName,
        AutomationState,
        PrefetchableSupport,
        XmlRepresentationController,
    );
}

// ---------------------------------------------------------------------------
// Real objects
// ---------------------------------------------------------------------------

/// A real plugin object on the owning side. Each accessor is the
/// equivalent of an interface-cast probe: it returns the object viewed as
/// that interface, or `None` when the object does not implement it.
pub trait PluginObject: Send + Sync {
    fn plugin_base(&self) -> Option<&dyn PluginBase> {
        None
    }
    fn component(&self) -> Option<&dyn Component> {
        None
    }
    fn audio_processor(&self) -> Option<&dyn AudioProcessor> {
        None
    }
    fn audio_presentation_latency(&self) -> Option<&dyn AudioPresentationLatency> {
        None
    }
    fn process_context_requirements(&self) -> Option<&dyn ProcessContextRequirements> {
        None
    }
    fn connection_point(&self) -> Option<&dyn ConnectionPoint> {
        None
    }
    fn edit_controller(&self) -> Option<&dyn EditController> {
        None
    }
    fn edit_controller_2(&self) -> Option<&dyn EditController2> {
        None
    }
    fn edit_controller_host_editing(&self) -> Option<&dyn EditControllerHostEditing> {
        None
    }
    fn midi_mapping(&self) -> Option<&dyn MidiMapping> {
        None
    }
    fn midi_learn(&self) -> Option<&dyn MidiLearn> {
        None
    }
    fn unit_info(&self) -> Option<&dyn UnitInfo> {
        None
    }
    fn program_list_data(&self) -> Option<&dyn ProgramListData> {
        None
    }
    fn parameter_function_name(&self) -> Option<&dyn ParameterFunctionName> {
        None
    }
    fn automation_state(&self) -> Option<&dyn AutomationState> {
        None
    }
    fn prefetchable_support(&self) -> Option<&dyn PrefetchableSupport> {
        None
    }
    fn xml_representation_controller(&self) -> Option<&dyn XmlRepresentationController> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_every_kind_once_in_order() {
        let mut sorted = InterfaceKind::ALL;
        sorted.sort();
        assert_eq!(sorted, InterfaceKind::ALL);
        for pair in InterfaceKind::ALL.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn result_codes_print_their_names() {
        assert_eq!(format!("{:?}", TResult::NO_INTERFACE), "kNoInterface");
        assert_eq!(format!("{:?}", TResult(42)), "TResult(42)");
        assert!(TResult::from(true).is_ok());
        assert_eq!(TResult::from(false), TResult::FALSE);
    }

    #[test]
    fn unavailable_values() {
        assert_eq!(TResult::unavailable(TResult::INTERNAL_ERROR), TResult::INTERNAL_ERROR);
        assert_eq!(
            core::result::Result::<u32, TResult>::unavailable(TResult::NO_INTERFACE),
            Err(TResult::NO_INTERFACE)
        );
        assert_eq!(u32::unavailable(TResult::INTERNAL_ERROR), 0);
    }

    #[test]
    fn markers_name_their_kind() {
        assert_eq!(<kinds::MidiLearn as Interface>::KIND, InterfaceKind::MidiLearn);
        assert_eq!(<kinds::Component as Interface>::KIND, InterfaceKind::Component);
    }
}
