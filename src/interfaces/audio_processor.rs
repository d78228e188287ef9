//! Audio processing, the hot path.
//!
//! Every request here goes over the object's dedicated channel. `Process`
//! is the only call made per audio block: the proxy keeps one
//! [`ProcessResponse`] per object and decodes each reply into it, so output
//! buffers are reused from block to block.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::{InstanceId, TResult, Unavailable, kinds};
use crate::error::Result;
use crate::proxy::Capability;

pub trait AudioProcessor: Send + Sync {
    fn set_bus_arrangements(&self, inputs: &[u64], outputs: &[u64]) -> TResult;
    fn can_process_sample_size(&self, symbolic_sample_size: i32) -> TResult;
    fn latency_samples(&self) -> u32;
    fn setup_processing(&self, setup: &ProcessSetup) -> TResult;
    fn set_processing(&self, state: bool) -> TResult;
    /// Process one block, writing into `data.outputs` and
    /// `data.output_parameter_changes`.
    fn process(&self, data: &mut ProcessData) -> TResult;
    fn tail_samples(&self) -> u32;
}

pub trait AudioPresentationLatency: Send + Sync {
    fn set_audio_presentation_latency_samples(&self, direction: i32, bus_index: i32, latency: u32) -> TResult;
}

pub trait ProcessContextRequirements: Send + Sync {
    fn process_context_requirements(&self) -> u32;
}

// ── Data ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessSetup {
    pub process_mode: i32,
    pub symbolic_sample_size: i32,
    pub max_samples_per_block: i32,
    pub sample_rate: f64,
}

/// One bus worth of audio, channel by channel.
#[derive(Default, PartialEq, Serialize, Deserialize)]
pub struct AudioBusBuffers {
    pub silence_flags: u64,
    pub channels: Vec<Vec<f32>>,
}

impl Clone for AudioBusBuffers {
    fn clone(&self) -> Self {
        Self {
            silence_flags: self.silence_flags,
            channels: self.channels.clone(),
        }
    }

    // Keeps the destination's sample buffers when shapes match.
    fn clone_from(&mut self, source: &Self) {
        self.silence_flags = source.silence_flags;
        self.channels.clone_from(&source.channels);
    }
}

impl fmt::Debug for AudioBusBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let samples = self.channels.first().map_or(0, Vec::len);
        write!(
            f,
            "<{} channels x {} samples, silence {:#x}>",
            self.channels.len(),
            samples,
            self.silence_flags
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub id: u32,
    pub sample_offset: i32,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessContext {
    pub state: u32,
    pub sample_rate: f64,
    pub project_time_samples: i64,
    pub tempo: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessData {
    pub process_mode: i32,
    pub symbolic_sample_size: i32,
    pub num_samples: i32,
    pub inputs: Vec<AudioBusBuffers>,
    pub outputs: Vec<AudioBusBuffers>,
    pub input_parameter_changes: Vec<ParameterChange>,
    pub output_parameter_changes: Vec<ParameterChange>,
    pub context: Option<ProcessContext>,
}

impl fmt::Debug for ProcessData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessData")
            .field("num_samples", &self.num_samples)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("input_parameter_changes", &self.input_parameter_changes.len())
            .field("context", &self.context.is_some())
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub result: TResult,
    pub outputs: Vec<AudioBusBuffers>,
    pub output_parameter_changes: Vec<ParameterChange>,
}

impl ProcessResponse {
    /// Copy the processed outputs back into the caller's block, reusing its
    /// buffers.
    pub fn write_back(&self, data: &mut ProcessData) {
        data.outputs.clone_from(&self.outputs);
        data.output_parameter_changes
            .clone_from(&self.output_parameter_changes);
    }
}

impl fmt::Debug for ProcessResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessResponse")
            .field("result", &self.result)
            .field("outputs", &self.outputs)
            .field("output_parameter_changes", &self.output_parameter_changes.len())
            .finish()
    }
}

impl Unavailable for ProcessResponse {
    fn unavailable(code: TResult) -> Self {
        Self {
            result: code,
            ..Self::default()
        }
    }
}

// ── Requests ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBusArrangements {
    pub instance_id: InstanceId,
    pub inputs: Vec<u64>,
    pub outputs: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanProcessSampleSize {
    pub instance_id: InstanceId,
    pub symbolic_sample_size: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLatencySamples {
    pub instance_id: InstanceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetupProcessing {
    pub instance_id: InstanceId,
    pub setup: ProcessSetup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetProcessing {
    pub instance_id: InstanceId,
    pub state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub instance_id: InstanceId,
    pub data: ProcessData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTailSamples {
    pub instance_id: InstanceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAudioPresentationLatencySamples {
    pub instance_id: InstanceId,
    pub direction: i32,
    pub bus_index: i32,
    pub latency: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProcessContextRequirements {
    pub instance_id: InstanceId,
}

// ── Capability modules ───────────────────────────────────────

impl Capability<'_, kinds::AudioProcessor> {
    pub fn set_bus_arrangements(&self, inputs: &[u64], outputs: &[u64]) -> Result<TResult> {
        self.inner.audio(&SetBusArrangements {
            instance_id: self.instance_id(),
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        })
    }

    pub fn can_process_sample_size(&self, symbolic_sample_size: i32) -> Result<TResult> {
        self.inner.audio(&CanProcessSampleSize {
            instance_id: self.instance_id(),
            symbolic_sample_size,
        })
    }

    pub fn latency_samples(&self) -> Result<u32> {
        self.inner.audio(&GetLatencySamples {
            instance_id: self.instance_id(),
        })
    }

    pub fn setup_processing(&self, setup: ProcessSetup) -> Result<TResult> {
        self.inner.audio(&SetupProcessing {
            instance_id: self.instance_id(),
            setup,
        })
    }

    pub fn set_processing(&self, state: bool) -> Result<TResult> {
        self.inner.audio(&SetProcessing {
            instance_id: self.instance_id(),
            state,
        })
    }

    /// Process one block remotely. The remote outputs are copied back into
    /// `data.outputs`.
    pub fn process(&self, data: &mut ProcessData) -> Result<TResult> {
        self.inner.process(data)
    }

    pub fn tail_samples(&self) -> Result<u32> {
        self.inner.audio(&GetTailSamples {
            instance_id: self.instance_id(),
        })
    }
}

impl Capability<'_, kinds::AudioPresentationLatency> {
    pub fn set_audio_presentation_latency_samples(
        &self,
        direction: i32,
        bus_index: i32,
        latency: u32,
    ) -> Result<TResult> {
        self.inner.audio(&SetAudioPresentationLatencySamples {
            instance_id: self.instance_id(),
            direction,
            bus_index,
            latency,
        })
    }
}

impl Capability<'_, kinds::ProcessContextRequirements> {
    pub fn process_context_requirements(&self) -> Result<u32> {
        self.inner.audio(&GetProcessContextRequirements {
            instance_id: self.instance_id(),
        })
    }
}
