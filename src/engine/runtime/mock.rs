// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Scripted runtime for tests, self-checks and hosts without a native engine.
//!
//! Every stage can be told to fail. Live models, delegates and interpreters
//! are counted so leaks and release order can be asserted.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{AcceleratorKind, Delegate, DelegateOptions, EngineRuntime, Interpreter, ModelGraph};
use crate::engine::error::EngineError;
use crate::engine::handle::ModelBuffer;
use crate::engine::tensor::{ElementType, Tensor, TensorData, TensorSpec};

/// What the mock interpreter produces on invoke.
#[derive(Debug, Clone)]
pub enum MockOutput {
    /// Always this tensor.
    Fixed(Tensor),
    /// The input tensor copied back as Int32.
    EchoInput,
}

/// Failure switches and tensor layout of a [`MockRuntime`].
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub fail_load: bool,
    pub fail_delegate: bool,
    pub reject_delegate: bool,
    pub fail_build: bool,
    pub fail_allocate: bool,
    pub fail_invoke: bool,
    pub panic_on_invoke: bool,
    pub accelerator_available: bool,
    pub accelerator: AcceleratorKind,
    pub input: TensorSpec,
    pub output: MockOutput,
    pub invoke_delay: Duration,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            fail_load: false,
            fail_delegate: false,
            reject_delegate: false,
            fail_build: false,
            fail_allocate: false,
            fail_invoke: false,
            panic_on_invoke: false,
            accelerator_available: true,
            accelerator: AcceleratorKind::Gpu,
            input: TensorSpec::new("input_ids", ElementType::Int32, vec![1, 128]),
            output: MockOutput::Fixed(Tensor::from_f32(
                "scores",
                vec![1, 4],
                vec![0.1, 0.9, 0.9, 0.2],
            )),
            invoke_delay: Duration::ZERO,
        }
    }
}

/// Counters shared by a runtime and everything it built.
#[derive(Debug, Default)]
pub struct MockStats {
    models_live: AtomicUsize,
    delegates_live: AtomicUsize,
    interpreters_live: AtomicUsize,
    invocations: AtomicUsize,
    loads: AtomicUsize,
    releases: Mutex<Vec<&'static str>>,
    last_input: Mutex<Option<Tensor>>,
}

impl MockStats {
    /// Models, delegates and interpreters not yet dropped.
    pub fn leak_count(&self) -> usize {
        self.models_live.load(Ordering::SeqCst)
            + self.delegates_live.load(Ordering::SeqCst)
            + self.interpreters_live.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Drop order of built objects: "delegate", "interpreter", "model".
    pub fn releases(&self) -> Vec<&'static str> {
        self.releases.lock().clone()
    }

    /// Input tensor seen by the last invoke.
    pub fn last_input(&self) -> Option<Tensor> {
        self.last_input.lock().clone()
    }

    fn released(&self, what: &'static str, counter: &AtomicUsize) {
        counter.fetch_sub(1, Ordering::SeqCst);
        self.releases.lock().push(what);
    }
}

struct Shared {
    behavior: Mutex<MockBehavior>,
    stats: Arc<MockStats>,
}

/// Scripted [`EngineRuntime`].
pub struct MockRuntime {
    name: String,
    shared: Arc<Shared>,
}

impl MockRuntime {
    pub fn new(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared {
                behavior: Mutex::new(behavior),
                stats: Arc::new(MockStats::default()),
            }),
        }
    }

    /// Change behavior; interpreters already built see the change.
    pub fn update(&self, f: impl FnOnce(&mut MockBehavior)) {
        f(&mut self.shared.behavior.lock());
    }

    pub fn stats(&self) -> Arc<MockStats> {
        self.shared.stats.clone()
    }
}

struct MockModel {
    buffer: Arc<ModelBuffer>,
    stats: Arc<MockStats>,
}

impl ModelGraph for MockModel {
    fn size_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockModel {
    fn drop(&mut self) {
        self.stats.released("model", &self.stats.models_live);
    }
}

struct MockDelegate {
    accelerator: AcceleratorKind,
    stats: Arc<MockStats>,
}

impl Delegate for MockDelegate {
    fn accelerator(&self) -> AcceleratorKind {
        self.accelerator
    }

    fn name(&self) -> &str {
        "mock-delegate"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockDelegate {
    fn drop(&mut self) {
        self.stats.released("delegate", &self.stats.delegates_live);
    }
}

struct MockInterpreter {
    shared: Arc<Shared>,
    input_spec: TensorSpec,
    input: Option<Tensor>,
    output: Option<Tensor>,
    output_spec: TensorSpec,
}

impl Interpreter for MockInterpreter {
    fn apply_delegate(&mut self, _delegate: &dyn Delegate) -> Result<(), EngineError> {
        if self.shared.behavior.lock().reject_delegate {
            return Err(EngineError::DelegateUnavailable("graph rejected by delegate".into()));
        }
        Ok(())
    }

    fn input_count(&self) -> usize {
        1
    }

    fn output_count(&self) -> usize {
        1
    }

    fn input_spec(&self, index: usize) -> Option<TensorSpec> {
        (index == 0).then(|| self.input_spec.clone())
    }

    fn output_spec(&self, index: usize) -> Option<TensorSpec> {
        (index == 0).then(|| self.output_spec.clone())
    }

    fn resize_input(&mut self, index: usize, shape: &[usize]) -> Result<(), EngineError> {
        if index != 0 {
            return Err(EngineError::MissingTensor { kind: "input", index });
        }
        if self.input.is_some() {
            return Err(EngineError::Allocation("resize after allocation".into()));
        }
        self.input_spec.shape = shape.to_vec();
        Ok(())
    }

    fn allocate_tensors(&mut self) -> Result<(), EngineError> {
        if self.shared.behavior.lock().fail_allocate {
            return Err(EngineError::Allocation("mock allocation failure".into()));
        }
        if self.input_spec.is_dynamic() {
            return Err(EngineError::Allocation(format!(
                "input '{}' has unresolved dimensions {:?}",
                self.input_spec.name, self.input_spec.shape
            )));
        }
        self.input = Some(Tensor::allocate(self.input_spec.clone()));
        Ok(())
    }

    fn input_tensor_mut(&mut self, index: usize) -> Option<&mut Tensor> {
        if index == 0 {
            self.input.as_mut()
        } else {
            None
        }
    }

    fn invoke(&mut self) -> Result<(), EngineError> {
        let behavior = self.shared.behavior.lock().clone();
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| EngineError::Invoke("tensors not allocated".into()))?;
        if behavior.panic_on_invoke {
            panic!("mock engine crashed");
        }
        if behavior.fail_invoke {
            return Err(EngineError::Invoke("mock invoke failure".into()));
        }
        if !behavior.invoke_delay.is_zero() {
            std::thread::sleep(behavior.invoke_delay);
        }

        self.shared.stats.invocations.fetch_add(1, Ordering::SeqCst);
        *self.shared.stats.last_input.lock() = Some(input.clone());

        self.output = Some(match behavior.output {
            MockOutput::Fixed(tensor) => tensor,
            MockOutput::EchoInput => echo(input),
        });
        Ok(())
    }

    fn output_tensor(&self, index: usize) -> Option<&Tensor> {
        if index == 0 {
            self.output.as_ref()
        } else {
            None
        }
    }
}

impl Drop for MockInterpreter {
    fn drop(&mut self) {
        self.shared.stats.released("interpreter", &self.shared.stats.interpreters_live);
    }
}

fn echo(input: &Tensor) -> Tensor {
    let values = match input.data() {
        TensorData::Int32(v) => v.clone(),
        TensorData::Float32(v) => v.iter().map(|&f| f as i32).collect(),
        TensorData::Raw(_) => Vec::new(),
    };
    let len = values.len();
    Tensor::from_i32("echo", vec![len], values)
}

impl EngineRuntime for MockRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_model(&self, buffer: Arc<ModelBuffer>) -> Result<Box<dyn ModelGraph>, EngineError> {
        if self.shared.behavior.lock().fail_load {
            return Err(EngineError::ModelLoad("mock model rejected".into()));
        }
        if buffer.is_empty() {
            return Err(EngineError::ModelLoad("model buffer is empty".into()));
        }
        let stats = self.shared.stats.clone();
        stats.models_live.fetch_add(1, Ordering::SeqCst);
        stats.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockModel { buffer, stats }))
    }

    fn create_delegate(&self, _options: &DelegateOptions) -> Result<Box<dyn Delegate>, EngineError> {
        let behavior = self.shared.behavior.lock();
        if behavior.fail_delegate || !behavior.accelerator_available {
            return Err(EngineError::DelegateUnavailable(format!(
                "{} not available",
                behavior.accelerator
            )));
        }
        let stats = self.shared.stats.clone();
        stats.delegates_live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDelegate { accelerator: behavior.accelerator, stats }))
    }

    fn build_interpreter(
        &self,
        model: &dyn ModelGraph,
        _num_threads: usize,
    ) -> Result<Box<dyn Interpreter>, EngineError> {
        if model.as_any().downcast_ref::<MockModel>().is_none() {
            return Err(EngineError::InterpreterBuild("model was not built by this runtime".into()));
        }
        let behavior = self.shared.behavior.lock().clone();
        if behavior.fail_build {
            return Err(EngineError::InterpreterBuild("mock build failure".into()));
        }
        let output_spec = match &behavior.output {
            MockOutput::Fixed(t) => t.spec().clone(),
            MockOutput::EchoInput => {
                TensorSpec::new("echo", ElementType::Int32, vec![behavior.input.element_count()])
            }
        };
        self.shared.stats.interpreters_live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockInterpreter {
            shared: self.shared.clone(),
            input_spec: behavior.input,
            input: None,
            output: None,
            output_spec,
        }))
    }

    fn accelerator_available(&self) -> bool {
        self.shared.behavior.lock().accelerator_available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> Arc<ModelBuffer> {
        Arc::new(ModelBuffer::Owned(b"mock-model".to_vec()))
    }

    #[test]
    fn test_full_build_and_invoke() {
        let rt = MockRuntime::new("mock", MockBehavior::default());
        let model = rt.load_model(buffer()).unwrap();
        let mut interp = rt.build_interpreter(model.as_ref(), 2).unwrap();
        interp.allocate_tensors().unwrap();
        interp.invoke().unwrap();
        assert!(interp.output_tensor(0).is_some());
        assert_eq!(rt.stats().invocations(), 1);
    }

    #[test]
    fn test_dynamic_input_blocks_allocation() {
        let behavior = MockBehavior {
            input: TensorSpec::new("ids", ElementType::Int32, vec![1, 0]),
            ..Default::default()
        };
        let rt = MockRuntime::new("mock", behavior);
        let model = rt.load_model(buffer()).unwrap();
        let mut interp = rt.build_interpreter(model.as_ref(), 1).unwrap();
        assert!(interp.allocate_tensors().is_err());
        interp.resize_input(0, &[1, 8]).unwrap();
        interp.allocate_tensors().unwrap();
        assert_eq!(interp.input_tensor_mut(0).unwrap().byte_len(), 32);
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let rt = MockRuntime::new("mock", MockBehavior::default());
        let empty = Arc::new(ModelBuffer::Owned(Vec::new()));
        assert!(matches!(rt.load_model(empty), Err(EngineError::ModelLoad(_))));
    }

    #[test]
    fn test_live_objects_are_counted() {
        let rt = MockRuntime::new("mock", MockBehavior::default());
        let stats = rt.stats();
        let model = rt.load_model(buffer()).unwrap();
        let delegate = rt.create_delegate(&DelegateOptions::default()).unwrap();
        let interp = rt.build_interpreter(model.as_ref(), 1).unwrap();
        assert_eq!(stats.leak_count(), 3);
        drop(delegate);
        drop(interp);
        drop(model);
        assert_eq!(stats.leak_count(), 0);
        assert_eq!(stats.releases(), vec!["delegate", "interpreter", "model"]);
    }

    #[test]
    fn test_no_accelerator_means_no_delegate() {
        let behavior = MockBehavior { accelerator_available: false, ..Default::default() };
        let rt = MockRuntime::new("mock", behavior);
        let err = rt.create_delegate(&DelegateOptions::default()).err().unwrap();
        assert!(err.is_degradable());
    }
}
