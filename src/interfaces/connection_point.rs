//! Connection points between objects.
//!
//! Hosts connect a component to its edit controller so the two can message
//! each other. When both ends are proxies the owning side connects the two
//! real objects directly, and their messages never cross the process
//! boundary again.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{InstanceId, PluginObject, TResult, kinds};
use crate::error::Result;
use crate::proxy::{Capability, PluginProxy};

pub trait ConnectionPoint: Send + Sync {
    fn connect(&self, other: Arc<dyn PluginObject>) -> TResult;
    fn disconnect(&self, other: Arc<dyn PluginObject>) -> TResult;
    fn notify(&self, message: &Message) -> TResult;
}

/// A message passed between connected objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Message {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
}

// ── Requests ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connect {
    pub instance_id: InstanceId,
    pub other_instance_id: InstanceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disconnect {
    pub instance_id: InstanceId,
    pub other_instance_id: InstanceId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notify {
    pub instance_id: InstanceId,
    pub message: Message,
}

// ── Capability module ────────────────────────────────────────

impl Capability<'_, kinds::ConnectionPoint> {
    /// Connect to another proxied object from the same bridge.
    pub fn connect(&self, other: &PluginProxy) -> Result<TResult> {
        self.inner.control(&Connect {
            instance_id: self.instance_id(),
            other_instance_id: other.instance_id(),
        })
    }

    pub fn disconnect(&self, other: &PluginProxy) -> Result<TResult> {
        self.inner.control(&Disconnect {
            instance_id: self.instance_id(),
            other_instance_id: other.instance_id(),
        })
    }

    pub fn notify(&self, message: Message) -> Result<TResult> {
        self.inner.control(&Notify {
            instance_id: self.instance_id(),
            message,
        })
    }
}
