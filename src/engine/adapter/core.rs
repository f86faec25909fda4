// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Build and run pipeline shared by every adapter.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{BackendKind, EngineStatus, NOT_INITIALIZED};
use crate::assets::{self, AssetStore};
use crate::engine::binder::{bind_input, decode_output, DecodedOutput};
use crate::engine::error::EngineError;
use crate::engine::handle::{EngineHandle, ModelBuffer};
use crate::engine::performance;
use crate::engine::runtime::{DelegateOptions, EngineRuntime, Interpreter};
use crate::engine::tokenizer::{Tokenizer, TokenizerPolicy};
use crate::telemetry::{self, EngineSpan, InferenceOutcome, SpanExt};

pub const WARM_UP_INPUT: &str = "warm up";
pub const PROBE_INPUT: &str = "This is a performance test input for on-device inference";

/// Characters of the input echoed in a fallback response.
const EXCERPT_CHARS: usize = 100;

/// Per-adapter build and run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterSettings {
    pub tokenizer: TokenizerPolicy,
    pub delegate: DelegateOptions,
    pub num_threads: usize,
    /// Replacement for dynamic (zero) non-batch input dimensions.
    pub dynamic_seq_len: usize,
    pub warm_up: bool,
    pub perf_probe: bool,
    /// Bundled model names, tried in order.
    pub asset_candidates: Vec<String>,
}

impl AdapterSettings {
    pub fn gpu_default() -> Self {
        Self {
            tokenizer: TokenizerPolicy::gpu_default(),
            delegate: DelegateOptions::default(),
            num_threads: 4,
            dynamic_seq_len: 8,
            warm_up: true,
            perf_probe: true,
            asset_candidates: crate::config::default_gpu_assets(),
        }
    }

    pub fn fallback_default() -> Self {
        Self {
            tokenizer: TokenizerPolicy::fallback_default(),
            asset_candidates: Vec::new(),
            ..Self::gpu_default()
        }
    }
}

struct Loaded {
    model: String,
    sha256: String,
    accelerated: bool,
    score: f32,
}

/// State machine behind an adapter: uninitialized, loaded, or fallback mode.
pub struct AdapterCore {
    kind: BackendKind,
    label: String,
    runtime: Arc<dyn EngineRuntime>,
    settings: AdapterSettings,
    tokenizer: Tokenizer,
    engine: Mutex<Option<EngineHandle>>,
    initialized: bool,
    loaded: Option<Loaded>,
    fallback_reason: Option<String>,
}

impl AdapterCore {
    pub fn new(
        kind: BackendKind,
        label: impl Into<String>,
        runtime: Arc<dyn EngineRuntime>,
        settings: AdapterSettings,
    ) -> Self {
        let tokenizer = Tokenizer::new(settings.tokenizer.clone());
        Self {
            kind,
            label: label.into(),
            runtime,
            settings,
            tokenizer,
            engine: Mutex::new(None),
            initialized: false,
            loaded: None,
            fallback_reason: None,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn runtime(&self) -> &dyn EngineRuntime {
        self.runtime.as_ref()
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_model_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn is_accelerated(&self) -> bool {
        self.loaded.as_ref().is_some_and(|l| l.accelerated)
    }

    pub fn performance_score(&self) -> f32 {
        if !self.initialized {
            return 0.0;
        }
        match &self.loaded {
            Some(loaded) => performance::clamp(loaded.score),
            None => performance::base_score(false),
        }
    }

    /// Map a model file and build the engine from it.
    pub fn initialize_from_path(&mut self, path: &Path) -> bool {
        if self.initialized {
            debug!(backend = %self.kind, "Already initialized");
            return true;
        }
        let name = path.display().to_string();
        let result = ModelBuffer::map_file(path).and_then(|buffer| self.build(Arc::new(buffer), &name));
        self.finish_init(&name, result)
    }

    /// Build from the first candidate in `store` that fully initializes.
    ///
    /// Exhausting the candidates enters fallback mode and still returns true.
    pub fn initialize_from_assets(&mut self, store: &dyn AssetStore) -> bool {
        if self.initialized {
            debug!(backend = %self.kind, "Already initialized");
            return true;
        }

        let candidates = self.settings.asset_candidates.clone();
        for name in assets::existing_candidates(store, &candidates) {
            let result = store
                .read_all(name)
                .map_err(EngineError::from)
                .and_then(|bytes| self.build(Arc::new(ModelBuffer::Owned(bytes)), name));
            if self.finish_init(name, result) {
                return true;
            }
        }

        let reason = format!("no usable model among {} bundled candidates", candidates.len());
        self.enter_fallback_mode(reason);
        true
    }

    /// Mark initialized without a model.
    pub fn enter_fallback_mode(&mut self, reason: String) {
        warn!(backend = %self.kind, reason = %reason, "Entering fallback mode");
        telemetry::record_backend_init(self.kind.as_str(), "fallback_mode");
        *self.engine.lock() = None;
        self.loaded = None;
        self.initialized = true;
        self.fallback_reason = Some(reason);
    }

    fn finish_init(&mut self, model: &str, result: Result<(), EngineError>) -> bool {
        let span = EngineSpan::init(&self.label, model);
        span.record_result(&result);
        let _guard = span.enter();
        match result {
            Ok(()) => {
                span.record("accelerated", self.is_accelerated());
                telemetry::record_backend_init(self.kind.as_str(), "loaded");
                info!(
                    backend = %self.kind,
                    model = %model,
                    accelerated = self.is_accelerated(),
                    score = self.performance_score(),
                    "Engine initialized"
                );
                true
            }
            Err(e) => {
                telemetry::record_backend_init(self.kind.as_str(), "failed");
                warn!(backend = %self.kind, model = %model, error = %e, "Engine initialization failed");
                false
            }
        }
    }

    fn build(&mut self, buffer: Arc<ModelBuffer>, model_name: &str) -> Result<(), EngineError> {
        let sha256 = buffer.sha256();
        let model = self.runtime.load_model(buffer.clone())?;
        debug!(model = %model_name, bytes = model.size_bytes(), "Model loaded");

        let mut delegate = match self.runtime.create_delegate(&self.settings.delegate) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(backend = %self.kind, error = %e, "Delegate unavailable, running on CPU");
                None
            }
        };

        let mut interpreter = self
            .runtime
            .build_interpreter(model.as_ref(), self.settings.num_threads)?;

        let rejected = match delegate.as_deref() {
            Some(d) => interpreter.apply_delegate(d).err(),
            None => None,
        };
        if let Some(e) = rejected {
            if !e.is_degradable() {
                return Err(e);
            }
            warn!(backend = %self.kind, error = %e, "Delegate rejected, running on CPU");
            delegate = None;
        }

        // From here on a failure drops the handle, which releases in order.
        let accelerated = delegate.is_some();
        let mut handle = EngineHandle::new(buffer, model, delegate, interpreter);
        {
            let interpreter = handle.interpreter_mut().ok_or(EngineError::NotInitialized)?;
            self.resize_dynamic_inputs(&mut *interpreter)?;
            interpreter.allocate_tensors()?;
            log_tensor_specs(&*interpreter);
        }

        if self.settings.warm_up {
            match self.run_guarded(&mut handle, WARM_UP_INPUT) {
                Ok(_) => debug!(backend = %self.kind, "Warm-up complete"),
                Err(e) => warn!(backend = %self.kind, error = %e, "Warm-up failed"),
            }
        }

        let probe = if self.settings.perf_probe {
            let start = Instant::now();
            match self.run_guarded(&mut handle, PROBE_INPUT) {
                Ok(_) => Some(start.elapsed()),
                Err(e) => {
                    warn!(backend = %self.kind, error = %e, "Performance probe failed");
                    None
                }
            }
        } else {
            None
        };
        let score = performance::score(accelerated, probe);
        info!(
            backend = %self.kind,
            score,
            probe_ms = probe.map(|d| d.as_millis() as u64),
            accelerator = if accelerated { "delegate" } else { "cpu" },
            "Performance score"
        );

        *self.engine.lock() = Some(handle);
        self.loaded = Some(Loaded { model: model_name.to_string(), sha256, accelerated, score });
        self.initialized = true;
        self.fallback_reason = None;
        Ok(())
    }

    fn resize_dynamic_inputs(&self, interpreter: &mut dyn Interpreter) -> Result<(), EngineError> {
        for index in 0..interpreter.input_count() {
            let Some(spec) = interpreter.input_spec(index) else {
                continue;
            };
            if spec.is_dynamic() {
                let shape = spec.resolved_shape(self.settings.dynamic_seq_len);
                debug!(input = %spec.name, from = ?spec.shape, to = ?shape, "Resizing dynamic input");
                interpreter.resize_input(index, &shape)?;
            }
        }
        Ok(())
    }

    /// One real inference through the engine, or the labeled fallback.
    pub fn process_inference(&self, input: &str) -> String {
        if !self.initialized {
            return NOT_INITIALIZED.to_string();
        }
        if self.loaded.is_none() {
            telemetry::record_inference(self.kind.as_str(), InferenceOutcome::Degraded, Duration::ZERO);
            return self.fallback_response(input, self.fallback_reason.as_deref());
        }

        let span = EngineSpan::inference(&self.label, input.chars().count());
        let _guard = span.enter();
        let start = Instant::now();

        let result = {
            let mut engine = self.engine.lock();
            match engine.as_mut() {
                Some(handle) => self.run_guarded(handle, input),
                None => Err(EngineError::NotInitialized),
            }
        };
        span.record_result(&result);

        match result {
            Ok(decoded) => {
                let elapsed = start.elapsed();
                span.record("latency_ms", elapsed.as_millis() as u64);
                telemetry::record_inference(self.kind.as_str(), InferenceOutcome::Ok, elapsed);
                debug!(backend = %self.kind, elapsed_ms = elapsed.as_millis() as u64, "Inference complete");
                decoded.render(&self.label)
            }
            Err(e) => {
                warn!(backend = %self.kind, error = %e, kind = e.kind(), "Inference failed");
                telemetry::record_inference(self.kind.as_str(), InferenceOutcome::Fallback, start.elapsed());
                self.fallback_response(input, Some(&e.to_string()))
            }
        }
    }

    /// Tokenize, bind, invoke, decode. Panics become [`EngineError::Panicked`].
    fn run_guarded(&self, handle: &mut EngineHandle, input: &str) -> Result<DecodedOutput, EngineError> {
        let interpreter = handle.interpreter_mut().ok_or(EngineError::NotInitialized)?;
        catch_unwind(AssertUnwindSafe(|| run_once(&self.tokenizer, interpreter, input)))
            .unwrap_or_else(|payload| Err(EngineError::Panicked(panic_message(payload.as_ref()))))
    }

    /// Labeled diagnostic answer. Reads only cached state.
    pub fn fallback_response(&self, input: &str, reason: Option<&str>) -> String {
        let mut excerpt: String = input.chars().take(EXCERPT_CHARS).collect();
        if input.chars().nth(EXCERPT_CHARS).is_some() {
            excerpt.push_str("...");
        }

        let model = self.loaded.as_ref().map_or("not loaded", |l| l.model.as_str());
        let accelerated = if self.is_accelerated() { "Yes" } else { "No" };
        let mut out = format!(
            "{label} fallback response\nInput: {excerpt}\nRuntime: {runtime}\nModel: {model}\n\
             Acceleration: {accelerated}\nPerformance Score: {score:.1}%",
            label = self.label,
            runtime = self.runtime.name(),
            score = self.performance_score() * 100.0,
        );
        if let Some(reason) = reason {
            out.push_str("\nReason: ");
            out.push_str(reason);
        }
        out
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            kind: self.kind,
            label: self.label.clone(),
            runtime: self.runtime.name().to_string(),
            initialized: self.initialized,
            model_loaded: self.is_model_loaded(),
            accelerated: self.is_accelerated(),
            performance_score: self.performance_score(),
            model: self.loaded.as_ref().map(|l| l.model.clone()),
            model_sha256: self.loaded.as_ref().map(|l| l.sha256.clone()),
            fallback_reason: self.fallback_reason.clone(),
        }
    }

    pub fn cleanup(&mut self) {
        if let Some(mut handle) = self.engine.lock().take() {
            handle.release();
            info!(backend = %self.kind, "Engine released");
        }
        self.loaded = None;
        self.initialized = false;
        self.fallback_reason = None;
    }
}

impl Drop for AdapterCore {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn run_once(
    tokenizer: &Tokenizer,
    interpreter: &mut dyn Interpreter,
    input: &str,
) -> Result<DecodedOutput, EngineError> {
    let tokens = tokenizer.encode(input);
    let tensor = interpreter
        .input_tensor_mut(0)
        .ok_or(EngineError::MissingTensor { kind: "input", index: 0 })?;
    bind_input(tensor, &tokens)?;
    interpreter.invoke()?;
    let output = interpreter
        .output_tensor(0)
        .ok_or(EngineError::MissingTensor { kind: "output", index: 0 })?;
    Ok(decode_output(output))
}

fn log_tensor_specs(interpreter: &dyn Interpreter) {
    for i in 0..interpreter.input_count() {
        if let Some(spec) = interpreter.input_spec(i) {
            info!(index = i, name = %spec.name, dtype = %spec.element_type, shape = ?spec.shape, "Input tensor");
        }
    }
    for i in 0..interpreter.output_count() {
        if let Some(spec) = interpreter.output_spec(i) {
            info!(index = i, name = %spec.name, dtype = %spec.element_type, shape = ?spec.shape, "Output tensor");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
