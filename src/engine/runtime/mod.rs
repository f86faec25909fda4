// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Engine runtime abstraction.
//!
//! A runtime is the concrete neural-network library behind an adapter. It
//! builds a model from bytes, optionally creates a hardware delegate, and
//! builds an interpreter that owns the input/output tensors.
//!
//! Build order is model, delegate, interpreter, delegate application,
//! dynamic-shape resize, allocation. Release order is the reverse of use:
//! see [`crate::engine::EngineHandle::release`].

pub mod mock;
#[cfg(feature = "onnx")]
pub mod onnx;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::handle::ModelBuffer;
use super::tensor::{Tensor, TensorSpec};

pub use mock::{MockBehavior, MockOutput, MockRuntime, MockStats};
#[cfg(feature = "onnx")]
pub use onnx::OnnxRuntime;

/// Hardware behind a delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceleratorKind {
    Gpu,
    Nnapi,
    Npu,
}

impl fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceleratorKind::Gpu => write!(f, "GPU"),
            AcceleratorKind::Nnapi => write!(f, "NNAPI"),
            AcceleratorKind::Npu => write!(f, "NPU"),
        }
    }
}

/// What the delegate should optimize for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferencePreference {
    /// One-shot answers; lowest first-result latency.
    FastSingleAnswer,
    /// Repeated invocations on the same interpreter.
    SustainedSpeed,
}

/// Ranked optimization goal for the delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferencePriority {
    Auto,
    MinLatency,
    MinMemoryUsage,
    MaxPrecision,
}

/// Delegate creation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateOptions {
    pub preference: InferencePreference,
    pub priorities: [InferencePriority; 3],
    /// Allow quantized models to run on the delegate.
    pub enable_quantized: bool,
}

impl Default for DelegateOptions {
    fn default() -> Self {
        Self {
            preference: InferencePreference::FastSingleAnswer,
            priorities: [
                InferencePriority::MinLatency,
                InferencePriority::Auto,
                InferencePriority::Auto,
            ],
            enable_quantized: true,
        }
    }
}

/// A model parsed from a [`ModelBuffer`].
///
/// Implementations may keep views into the buffer; they receive it by
/// reference count so it cannot be freed under them.
pub trait ModelGraph: Send + Sync {
    fn size_bytes(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
}

/// A hardware acceleration attachment.
pub trait Delegate: Send + Sync {
    fn accelerator(&self) -> AcceleratorKind;
    fn name(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

/// Executes a model. Owns its input and output tensors.
pub trait Interpreter: Send {
    /// Hand graph execution to `delegate`. On error the interpreter stays
    /// usable on CPU.
    fn apply_delegate(&mut self, delegate: &dyn Delegate) -> Result<(), EngineError>;

    fn input_count(&self) -> usize;
    fn output_count(&self) -> usize;
    fn input_spec(&self, index: usize) -> Option<TensorSpec>;
    fn output_spec(&self, index: usize) -> Option<TensorSpec>;

    /// Change an input shape. Only valid before [`Interpreter::allocate_tensors`].
    fn resize_input(&mut self, index: usize, shape: &[usize]) -> Result<(), EngineError>;

    fn allocate_tensors(&mut self) -> Result<(), EngineError>;

    /// Writable input buffer; `None` before allocation.
    fn input_tensor_mut(&mut self, index: usize) -> Option<&mut Tensor>;

    fn invoke(&mut self) -> Result<(), EngineError>;

    /// Output of the last successful invoke.
    fn output_tensor(&self, index: usize) -> Option<&Tensor>;
}

/// Factory for models, delegates and interpreters of one library.
pub trait EngineRuntime: Send + Sync {
    fn name(&self) -> &str;

    fn load_model(&self, buffer: Arc<ModelBuffer>) -> Result<Box<dyn ModelGraph>, EngineError>;

    fn create_delegate(&self, options: &DelegateOptions) -> Result<Box<dyn Delegate>, EngineError>;

    fn build_interpreter(
        &self,
        model: &dyn ModelGraph,
        num_threads: usize,
    ) -> Result<Box<dyn Interpreter>, EngineError>;

    /// Whether the hardware path exists on this device. Cheap, no side effects.
    fn accelerator_available(&self) -> bool;
}
