// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! ONNX Runtime engine with a hardware execution provider.
//!
//! Each runtime drives one accelerator: the GPU provider (CoreML on Apple
//! targets, CUDA elsewhere) or NNAPI. The interpreter first commits a CPU
//! session so tensor specs can be read. Applying the delegate rebuilds the
//! session with the provider registered and failing hard, so a missing
//! provider surfaces as a degradable error.
//!
//! Int64 model inputs and outputs are exposed as Int32 host tensors and
//! converted at invoke.

use std::any::Any;
use std::sync::Arc;

#[cfg(not(target_vendor = "apple"))]
use ort::execution_providers::CUDAExecutionProvider;
#[cfg(target_vendor = "apple")]
use ort::execution_providers::CoreMLExecutionProvider;
use ort::execution_providers::{
    ExecutionProvider, ExecutionProviderDispatch, NNAPIExecutionProvider,
};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::{Session, SessionInputValue};
use ort::tensor::TensorElementType;
use ort::value::{DynValue, ValueType};
use tracing::debug;

use super::{
    AcceleratorKind, Delegate, DelegateOptions, EngineRuntime, InferencePriority, Interpreter,
    ModelGraph,
};
use crate::engine::error::EngineError;
use crate::engine::handle::ModelBuffer;
use crate::engine::tensor::{ElementType, Tensor, TensorData, TensorSpec};

/// [`EngineRuntime`] over ONNX Runtime, bound to one accelerator.
#[derive(Debug, Clone, Copy)]
pub struct OnnxRuntime {
    accelerator: AcceleratorKind,
}

impl OnnxRuntime {
    pub fn new(accelerator: AcceleratorKind) -> Self {
        Self { accelerator }
    }

    /// Runtime for the primary engine.
    pub fn gpu() -> Self {
        Self::new(AcceleratorKind::Gpu)
    }

    /// Runtime for the fallback engine.
    pub fn nnapi() -> Self {
        Self::new(AcceleratorKind::Nnapi)
    }

    pub fn accelerator(&self) -> AcceleratorKind {
        self.accelerator
    }
}

#[cfg(target_vendor = "apple")]
fn gpu_provider_available() -> bool {
    CoreMLExecutionProvider::default().is_available().unwrap_or(false)
}

#[cfg(not(target_vendor = "apple"))]
fn gpu_provider_available() -> bool {
    CUDAExecutionProvider::default().is_available().unwrap_or(false)
}

#[cfg(target_vendor = "apple")]
fn gpu_provider() -> ExecutionProviderDispatch {
    CoreMLExecutionProvider::default().build()
}

#[cfg(not(target_vendor = "apple"))]
fn gpu_provider() -> ExecutionProviderDispatch {
    CUDAExecutionProvider::default().build()
}

struct OnnxModel {
    buffer: Arc<ModelBuffer>,
}

impl ModelGraph for OnnxModel {
    fn size_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ProviderDelegate {
    accelerator: AcceleratorKind,
    fp16: bool,
}

impl ProviderDelegate {
    fn provider(&self) -> ExecutionProviderDispatch {
        match self.accelerator {
            AcceleratorKind::Gpu => gpu_provider(),
            AcceleratorKind::Nnapi | AcceleratorKind::Npu => {
                NNAPIExecutionProvider::default().with_fp16(self.fp16).build()
            }
        }
    }
}

impl Delegate for ProviderDelegate {
    fn accelerator(&self) -> AcceleratorKind {
        self.accelerator
    }

    fn name(&self) -> &str {
        match self.accelerator {
            AcceleratorKind::Gpu if cfg!(target_vendor = "apple") => "CoreMLExecutionProvider",
            AcceleratorKind::Gpu => "CUDAExecutionProvider",
            AcceleratorKind::Nnapi | AcceleratorKind::Npu => "NNAPIExecutionProvider",
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Model tensor type and the host type it is bound as.
#[derive(Debug, Clone, Copy)]
struct IoType {
    model: TensorElementType,
    host: ElementType,
}

struct OnnxInterpreter {
    buffer: Arc<ModelBuffer>,
    num_threads: usize,
    session: Session,
    input_names: Vec<String>,
    input_types: Vec<IoType>,
    input_specs: Vec<TensorSpec>,
    output_specs: Vec<TensorSpec>,
    inputs: Vec<Tensor>,
    outputs: Vec<Tensor>,
}

fn build_err(e: ort::Error) -> EngineError {
    EngineError::InterpreterBuild(e.to_string())
}

fn session_builder(num_threads: usize) -> Result<SessionBuilder, EngineError> {
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(num_threads.max(1)))
        .map_err(build_err)
}

fn host_type(ty: TensorElementType) -> ElementType {
    match ty {
        TensorElementType::Int32 | TensorElementType::Int64 => ElementType::Int32,
        TensorElementType::Float32 => ElementType::Float32,
        TensorElementType::Uint8 => ElementType::UInt8,
        TensorElementType::Float16 => ElementType::Float16,
        _ => ElementType::UInt8,
    }
}

fn spec_from_value_type(name: &str, value_type: &ValueType) -> Result<(TensorSpec, IoType), EngineError> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        return Err(EngineError::InterpreterBuild(format!("'{name}' is not a tensor")));
    };
    let dims = shape.iter().map(|&d| if d < 0 { 0 } else { d as usize }).collect();
    let io = IoType { model: *ty, host: host_type(*ty) };
    Ok((TensorSpec::new(name, io.host, dims), io))
}

impl OnnxInterpreter {
    fn new(buffer: Arc<ModelBuffer>, num_threads: usize, session: Session) -> Result<Self, EngineError> {
        let mut input_names = Vec::new();
        let mut input_types = Vec::new();
        let mut input_specs = Vec::new();
        for input in &session.inputs {
            let (spec, io) = spec_from_value_type(&input.name, &input.input_type)?;
            input_names.push(input.name.clone());
            input_types.push(io);
            input_specs.push(spec);
        }
        let output_specs = session
            .outputs
            .iter()
            .map(|o| spec_from_value_type(&o.name, &o.output_type).map(|(spec, _)| spec))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            buffer,
            num_threads,
            session,
            input_names,
            input_types,
            input_specs,
            output_specs,
            inputs: Vec::new(),
            outputs: Vec::new(),
        })
    }

    fn to_value(tensor: &Tensor, io: IoType) -> Result<DynValue, EngineError> {
        let shape = tensor.shape().to_vec();
        let invoke_err = |e: ort::Error| EngineError::Invoke(e.to_string());
        let value = match (tensor.data(), io.model) {
            (TensorData::Int32(v), TensorElementType::Int64) => {
                let wide: Vec<i64> = v.iter().map(|&x| i64::from(x)).collect();
                ort::value::Tensor::from_array((shape, wide)).map_err(invoke_err)?.into_dyn()
            }
            (TensorData::Int32(v), _) => {
                ort::value::Tensor::from_array((shape, v.clone())).map_err(invoke_err)?.into_dyn()
            }
            (TensorData::Float32(v), _) => {
                ort::value::Tensor::from_array((shape, v.clone())).map_err(invoke_err)?.into_dyn()
            }
            (TensorData::Raw(_), _) => return Err(EngineError::UnsupportedTensorType(io.host)),
        };
        Ok(value)
    }

    fn from_value(name: &str, value: &ort::value::ValueRef<'_>) -> Result<Tensor, EngineError> {
        let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
            return Err(EngineError::Invoke(format!("output '{name}' is not a tensor")));
        };
        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let invoke_err = |e: ort::Error| EngineError::Invoke(e.to_string());

        let tensor = match *ty {
            TensorElementType::Float32 => {
                let (_, data) = value.try_extract_tensor::<f32>().map_err(invoke_err)?;
                Tensor::from_f32(name, dims, data.to_vec())
            }
            TensorElementType::Int32 => {
                let (_, data) = value.try_extract_tensor::<i32>().map_err(invoke_err)?;
                Tensor::from_i32(name, dims, data.to_vec())
            }
            TensorElementType::Int64 => {
                let (_, data) = value.try_extract_tensor::<i64>().map_err(invoke_err)?;
                let narrow = data
                    .iter()
                    .map(|&x| x.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
                    .collect();
                Tensor::from_i32(name, dims, narrow)
            }
            other => {
                let spec = TensorSpec::new(name, host_type(other), dims);
                let bytes = spec.byte_len();
                Tensor::new(spec, TensorData::Raw(vec![0; bytes]))
            }
        };
        Ok(tensor)
    }
}

impl Interpreter for OnnxInterpreter {
    fn apply_delegate(&mut self, delegate: &dyn Delegate) -> Result<(), EngineError> {
        let Some(provider) = delegate.as_any().downcast_ref::<ProviderDelegate>() else {
            return Err(EngineError::DelegateUnavailable(format!(
                "{} cannot drive an ONNX session",
                delegate.name()
            )));
        };
        let session = session_builder(self.num_threads)?
            .with_execution_providers([provider.provider().error_on_failure()])
            .and_then(|b| b.commit_from_memory(self.buffer.as_bytes()))
            .map_err(|e| EngineError::DelegateUnavailable(e.to_string()))?;
        self.session = session;
        debug!(provider = delegate.name(), "Execution provider registered");
        Ok(())
    }

    fn input_count(&self) -> usize {
        self.input_specs.len()
    }

    fn output_count(&self) -> usize {
        self.output_specs.len()
    }

    fn input_spec(&self, index: usize) -> Option<TensorSpec> {
        self.input_specs.get(index).cloned()
    }

    fn output_spec(&self, index: usize) -> Option<TensorSpec> {
        self.output_specs.get(index).cloned()
    }

    fn resize_input(&mut self, index: usize, shape: &[usize]) -> Result<(), EngineError> {
        if !self.inputs.is_empty() {
            return Err(EngineError::Allocation("resize after allocation".into()));
        }
        let spec = self
            .input_specs
            .get_mut(index)
            .ok_or(EngineError::MissingTensor { kind: "input", index })?;
        spec.shape = shape.to_vec();
        Ok(())
    }

    fn allocate_tensors(&mut self) -> Result<(), EngineError> {
        if let Some(spec) = self.input_specs.iter().find(|s| s.is_dynamic()) {
            return Err(EngineError::Allocation(format!(
                "input '{}' has unresolved dimensions {:?}",
                spec.name, spec.shape
            )));
        }
        self.inputs = self.input_specs.iter().cloned().map(Tensor::allocate).collect();
        Ok(())
    }

    fn input_tensor_mut(&mut self, index: usize) -> Option<&mut Tensor> {
        self.inputs.get_mut(index)
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        if self.inputs.is_empty() && !self.input_specs.is_empty() {
            return Err(EngineError::Invoke("tensors not allocated".into()));
        }
        let mut feeds = Vec::with_capacity(self.inputs.len());
        for ((name, tensor), io) in self.input_names.iter().zip(&self.inputs).zip(&self.input_types) {
            let value = Self::to_value(tensor, *io)?;
            feeds.push((name.clone(), SessionInputValue::from(value)));
        }

        let outputs = self
            .session
            .run(feeds)
            .map_err(|e| EngineError::Invoke(e.to_string()))?;
        let mut decoded = Vec::with_capacity(outputs.len());
        for (name, value) in outputs.iter() {
            decoded.push(Self::from_value(name, &value)?);
        }
        self.outputs = decoded;
        Ok(())
    }

    fn output_tensor(&self, index: usize) -> Option<&Tensor> {
        self.outputs.get(index)
    }
}

impl EngineRuntime for OnnxRuntime {
    fn name(&self) -> &str {
        match self.accelerator {
            AcceleratorKind::Gpu => "onnxruntime-gpu",
            AcceleratorKind::Nnapi => "onnxruntime-nnapi",
            AcceleratorKind::Npu => "onnxruntime-npu",
        }
    }

    fn load_model(&self, buffer: Arc<ModelBuffer>) -> Result<Box<dyn ModelGraph>, EngineError> {
        if buffer.is_empty() {
            return Err(EngineError::ModelLoad("model buffer is empty".into()));
        }
        Ok(Box::new(OnnxModel { buffer }))
    }

    fn create_delegate(&self, options: &DelegateOptions) -> Result<Box<dyn Delegate>, EngineError> {
        if !self.accelerator_available() {
            return Err(EngineError::DelegateUnavailable(format!(
                "{} execution provider not available",
                self.accelerator
            )));
        }
        Ok(Box::new(ProviderDelegate {
            accelerator: self.accelerator,
            fp16: options.priorities[0] != InferencePriority::MaxPrecision,
        }))
    }

    fn build_interpreter(
        &self,
        model: &dyn ModelGraph,
        num_threads: usize,
    ) -> Result<Box<dyn Interpreter>, EngineError> {
        let model = model
            .as_any()
            .downcast_ref::<OnnxModel>()
            .ok_or_else(|| EngineError::InterpreterBuild("model was not built by onnxruntime".into()))?;
        let session = session_builder(num_threads)?
            .commit_from_memory(model.buffer.as_bytes())
            .map_err(|e| EngineError::ModelLoad(e.to_string()))?;
        Ok(Box::new(OnnxInterpreter::new(model.buffer.clone(), num_threads, session)?))
    }

    fn accelerator_available(&self) -> bool {
        match self.accelerator {
            AcceleratorKind::Gpu => gpu_provider_available(),
            AcceleratorKind::Nnapi | AcceleratorKind::Npu => {
                NNAPIExecutionProvider::default().is_available().unwrap_or(false)
            }
        }
    }
}
