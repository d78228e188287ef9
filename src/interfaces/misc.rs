//! Small single-purpose interfaces.

use serde::{Deserialize, Serialize};

use super::{InstanceId, TResult, kinds};
use crate::error::Result;
use crate::proxy::Capability;

pub trait ParameterFunctionName: Send + Sync {
    fn parameter_id_from_function_name(&self, unit_id: i32, function_name: &str) -> core::result::Result<u32, TResult>;
}

pub trait AutomationState: Send + Sync {
    fn set_automation_state(&self, state: i32) -> TResult;
}

pub trait PrefetchableSupport: Send + Sync {
    fn prefetchable_support(&self) -> core::result::Result<u32, TResult>;
}

pub trait XmlRepresentationController: Send + Sync {
    fn xml_representation_stream(&self, unit_id: i32, name: &str) -> core::result::Result<Vec<u8>, TResult>;
}

// ── Requests ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetParameterIdFromFunctionName {
    pub instance_id: InstanceId,
    pub unit_id: i32,
    pub function_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAutomationState {
    pub instance_id: InstanceId,
    pub state: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPrefetchableSupport {
    pub instance_id: InstanceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetXmlRepresentationStream {
    pub instance_id: InstanceId,
    pub unit_id: i32,
    pub name: String,
}

// ── Capability modules ───────────────────────────────────────

impl Capability<'_, kinds::ParameterFunctionName> {
    pub fn parameter_id_from_function_name(
        &self,
        unit_id: i32,
        function_name: &str,
    ) -> Result<core::result::Result<u32, TResult>> {
        self.inner.control(&GetParameterIdFromFunctionName {
            instance_id: self.instance_id(),
            unit_id,
            function_name: function_name.to_owned(),
        })
    }
}

impl Capability<'_, kinds::AutomationState> {
    pub fn set_automation_state(&self, state: i32) -> Result<TResult> {
        self.inner.control(&SetAutomationState {
            instance_id: self.instance_id(),
            state,
        })
    }
}

impl Capability<'_, kinds::PrefetchableSupport> {
    pub fn prefetchable_support(&self) -> Result<core::result::Result<u32, TResult>> {
        self.inner.audio(&GetPrefetchableSupport {
            instance_id: self.instance_id(),
        })
    }
}

impl Capability<'_, kinds::XmlRepresentationController> {
    pub fn xml_representation_stream(&self, unit_id: i32, name: &str) -> Result<core::result::Result<Vec<u8>, TResult>> {
        self.inner.control(&GetXmlRepresentationStream {
            instance_id: self.instance_id(),
            unit_id,
            name: name.to_owned(),
        })
    }
}
