//! Units (parameter groups) and program lists.

use serde::{Deserialize, Serialize};

use super::{InstanceId, TResult, kinds};
use crate::error::Result;
use crate::proxy::Capability;

pub trait UnitInfo: Send + Sync {
    fn unit_count(&self) -> i32;
    fn unit_info(&self, index: i32) -> core::result::Result<UnitDescription, TResult>;
    fn selected_unit(&self) -> i32;
    fn select_unit(&self, id: i32) -> TResult;
}

pub trait ProgramListData: Send + Sync {
    fn program_data_supported(&self, list_id: i32) -> TResult;
    fn get_program_data(&self, list_id: i32, program_index: i32) -> core::result::Result<Vec<u8>, TResult>;
    fn set_program_data(&self, list_id: i32, program_index: i32, data: &[u8]) -> TResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDescription {
    pub id: i32,
    pub parent_unit_id: i32,
    pub name: String,
    pub program_list_id: i32,
}

// ── Requests ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUnitCount {
    pub instance_id: InstanceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUnitInfo {
    pub instance_id: InstanceId,
    pub index: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSelectedUnit {
    pub instance_id: InstanceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectUnit {
    pub instance_id: InstanceId,
    pub id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDataSupported {
    pub instance_id: InstanceId,
    pub list_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProgramData {
    pub instance_id: InstanceId,
    pub list_id: i32,
    pub program_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetProgramData {
    pub instance_id: InstanceId,
    pub list_id: i32,
    pub program_index: i32,
    pub data: Vec<u8>,
}

// ── Capability modules ───────────────────────────────────────

impl Capability<'_, kinds::UnitInfo> {
    pub fn unit_count(&self) -> Result<i32> {
        self.inner.control(&GetUnitCount {
            instance_id: self.instance_id(),
        })
    }

    pub fn unit_info(&self, index: i32) -> Result<core::result::Result<UnitDescription, TResult>> {
        self.inner.control(&GetUnitInfo {
            instance_id: self.instance_id(),
            index,
        })
    }

    pub fn selected_unit(&self) -> Result<i32> {
        self.inner.control(&GetSelectedUnit {
            instance_id: self.instance_id(),
        })
    }

    pub fn select_unit(&self, id: i32) -> Result<TResult> {
        self.inner.control(&SelectUnit {
            instance_id: self.instance_id(),
            id,
        })
    }
}

impl Capability<'_, kinds::ProgramListData> {
    pub fn program_data_supported(&self, list_id: i32) -> Result<TResult> {
        self.inner.control(&ProgramDataSupported {
            instance_id: self.instance_id(),
            list_id,
        })
    }

    pub fn get_program_data(&self, list_id: i32, program_index: i32) -> Result<core::result::Result<Vec<u8>, TResult>> {
        self.inner.control(&GetProgramData {
            instance_id: self.instance_id(),
            list_id,
            program_index,
        })
    }

    pub fn set_program_data(&self, list_id: i32, program_index: i32, data: &[u8]) -> Result<TResult> {
        self.inner.control(&SetProgramData {
            instance_id: self.instance_id(),
            list_id,
            program_index,
            data: data.to_vec(),
        })
    }
}
