//! Backend selection and routing through the public API.
//!
//! Engines are scripted with `MockRuntime`; model files live in temp dirs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mobile_ai_core::engine::runtime::{AcceleratorKind, MockBehavior, MockRuntime};
use mobile_ai_core::{
    AdapterRegistry, AssetStore, BackendKind, EngineAdapter, EngineStatus, MemoryAssetStore,
    Orchestrator, OrchestratorConfig, INFO_NOT_INITIALIZED, NOT_INITIALIZED, NO_ACTIVE_BACKEND,
};

fn config() -> OrchestratorConfig {
    OrchestratorConfig { perf_probe: false, ..Default::default() }
}

fn nnapi() -> MockBehavior {
    MockBehavior { accelerator: AcceleratorKind::Nnapi, ..Default::default() }
}

struct Fixture {
    gpu: Arc<MockRuntime>,
    fallback: Arc<MockRuntime>,
    orchestrator: Orchestrator,
    _dir: tempfile::TempDir,
    model: PathBuf,
}

fn fixture(gpu: MockBehavior, fallback: MockBehavior) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.tflite");
    std::fs::write(&model, b"model bytes").unwrap();

    let gpu = Arc::new(MockRuntime::new("mock-gpu", gpu));
    let fallback = Arc::new(MockRuntime::new("mock-nnapi", fallback));
    let orchestrator = Orchestrator::with_runtimes(&config(), gpu.clone(), Some(fallback.clone()));
    Fixture { gpu, fallback, orchestrator, _dir: dir, model }
}

// ============================================================================
// Selection order
// ============================================================================

#[test]
fn gpu_engine_is_preferred() {
    let mut f = fixture(MockBehavior::default(), nnapi());
    let result = f.orchestrator.initialize(&f.model);

    assert!(result.success);
    assert_eq!(result.backend, BackendKind::PrimaryGpu);
    assert_eq!(f.orchestrator.active_backend(), BackendKind::PrimaryGpu);
    // Fallback engine is never touched when the GPU engine wins.
    assert_eq!(f.fallback.stats().loads(), 0);
}

#[test]
fn fallback_selected_when_gpu_fails() {
    let gpu = MockBehavior { fail_build: true, ..Default::default() };
    let mut f = fixture(gpu, nnapi());
    let result = f.orchestrator.initialize(&f.model);

    assert!(result.success);
    assert_eq!(result.backend, BackendKind::AcceleratedFallback);
    assert_eq!(f.gpu.stats().leak_count(), 0);

    let info = f.orchestrator.backend_info();
    assert!(info.starts_with("Backend: accelerated_fallback [Accelerated Fallback Engine] [accelerated]"));
    assert!(f
        .orchestrator
        .process_inference("hello")
        .starts_with("Accelerated Fallback Engine response"));
}

#[test]
fn fallback_rejected_without_accelerator() {
    let gpu = MockBehavior { fail_load: true, ..Default::default() };
    let fallback = MockBehavior { accelerator_available: false, ..nnapi() };
    let mut f = fixture(gpu, fallback);
    let result = f.orchestrator.initialize(&f.model);

    assert!(!result.success);
    assert_eq!(result.backend, BackendKind::None);
    assert_eq!(
        result.message.as_deref(),
        Some("primary_gpu: initialization failed; accelerated_fallback: accelerator not available")
    );
    // The losing engine was built and then released.
    assert_eq!(f.fallback.stats().loads(), 1);
    assert_eq!(f.fallback.stats().leak_count(), 0);
    assert_eq!(f.orchestrator.process_inference("hello"), NOT_INITIALIZED);
}

#[test]
fn fallback_rejected_when_delegate_not_attached() {
    let gpu = MockBehavior { fail_load: true, ..Default::default() };
    let fallback = MockBehavior { reject_delegate: true, ..nnapi() };
    let mut f = fixture(gpu, fallback);
    let result = f.orchestrator.initialize(&f.model);

    assert!(!result.success);
    assert_eq!(f.orchestrator.active_backend(), BackendKind::None);
    assert!(result
        .message
        .as_deref()
        .unwrap()
        .ends_with("accelerated_fallback: accelerator not available"));
    assert_eq!(f.fallback.stats().leak_count(), 0);
    assert_eq!(f.orchestrator.process_inference("hello"), NOT_INITIALIZED);
}

#[test]
fn both_engines_failing_leaves_service_uninitialized() {
    let fail = MockBehavior { fail_load: true, ..Default::default() };
    let mut f = fixture(fail.clone(), fail);

    assert!(!f.orchestrator.initialize(&f.model).success);
    assert!(!f.orchestrator.is_initialized());
    assert_eq!(f.orchestrator.process_inference("anything"), NOT_INITIALIZED);
    assert_eq!(f.orchestrator.backend_info(), INFO_NOT_INITIALIZED);
}

#[test]
fn missing_model_file_fails_both_engines() {
    let mut f = fixture(MockBehavior::default(), nnapi());
    let result = f.orchestrator.initialize(&f.model.with_file_name("absent.tflite"));
    assert!(!result.success);
    assert_eq!(f.gpu.stats().loads(), 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn cleanup_is_idempotent_and_releases_everything() {
    let mut f = fixture(MockBehavior::default(), nnapi());
    assert!(f.orchestrator.initialize(&f.model).success);

    f.orchestrator.cleanup();
    f.orchestrator.cleanup();

    assert_eq!(f.orchestrator.process_inference("hello"), NOT_INITIALIZED);
    assert_eq!(f.orchestrator.backend_info(), INFO_NOT_INITIALIZED);
    assert_eq!(f.gpu.stats().leak_count(), 0);
    assert_eq!(f.gpu.stats().releases(), vec!["delegate", "interpreter", "model"]);
}

#[test]
fn cleanup_before_initialize_is_harmless() {
    let mut f = fixture(MockBehavior::default(), nnapi());
    f.orchestrator.cleanup();
    assert_eq!(f.orchestrator.process_inference("x"), NOT_INITIALIZED);
}

#[test]
fn reinitialize_replaces_the_engine() {
    let mut f = fixture(MockBehavior::default(), nnapi());
    assert!(f.orchestrator.initialize(&f.model).success);
    assert!(f.orchestrator.initialize(&f.model).success);

    assert_eq!(f.gpu.stats().loads(), 2);
    // Only the second engine is still alive: model, delegate, interpreter.
    assert_eq!(f.gpu.stats().leak_count(), 3);
    drop(f.orchestrator);
    assert_eq!(f.gpu.stats().leak_count(), 0);
}

#[test]
fn selection_is_static_after_init() {
    let mut f = fixture(MockBehavior::default(), nnapi());
    assert!(f.orchestrator.initialize(&f.model).success);

    // The GPU engine starts failing; requests are answered by it anyway.
    f.gpu.update(|b| b.fail_invoke = true);
    let out = f.orchestrator.process_inference("hello");
    assert!(out.starts_with("GPU Engine fallback response"), "{out}");
    assert!(out.contains("Reason: Invoke failed: mock invoke failure"));
    assert_eq!(f.orchestrator.active_backend(), BackendKind::PrimaryGpu);
    assert_eq!(f.fallback.stats().loads(), 0);
}

// ============================================================================
// Inference
// ============================================================================

#[test]
fn argmax_picks_first_of_tied_scores() {
    let mut f = fixture(MockBehavior::default(), nnapi());
    assert!(f.orchestrator.initialize(&f.model).success);
    assert_eq!(
        f.orchestrator.process_inference("hello"),
        "GPU Engine response (token 1, score: 0.900)"
    );
}

#[test]
fn engine_panic_becomes_fallback_response() {
    let mut f = fixture(MockBehavior::default(), nnapi());
    assert!(f.orchestrator.initialize(&f.model).success);

    f.gpu.update(|b| b.panic_on_invoke = true);
    let out = f.orchestrator.process_inference("boom");
    assert!(out.contains("Reason: Engine panicked: mock engine crashed"), "{out}");

    // The engine survives the panic.
    f.gpu.update(|b| b.panic_on_invoke = false);
    assert!(f.orchestrator.process_inference("again").starts_with("GPU Engine response"));
}

#[test]
fn degraded_mode_answers_every_input() {
    let gpu = Arc::new(MockRuntime::new("mock-gpu", MockBehavior::default()));
    let mut orchestrator = Orchestrator::with_runtimes(&config(), gpu.clone(), None);
    let result = orchestrator.initialize_with_assets(&MemoryAssetStore::new());

    assert!(result.success);
    assert_eq!(result.backend, BackendKind::PrimaryGpu);
    assert!(orchestrator.backend_info().contains("[fallback mode]"));
    assert!(orchestrator.backend_info().ends_with("(Performance: 60%)"));

    for input in ["", "héllo wörld ✓ 世界", &"x".repeat(10_000)] {
        let out = orchestrator.process_inference(input);
        assert!(out.starts_with("GPU Engine fallback response\nInput: "), "{out}");
        assert!(out.contains("Model: not loaded"));
        assert!(out.contains("Acceleration: No"));
        assert!(out.contains("Performance Score: 60.0%"));
    }

    let long = orchestrator.process_inference(&"x".repeat(10_000));
    assert!(long.contains(&format!("Input: {}...\n", "x".repeat(100))));
    assert_eq!(gpu.stats().invocations(), 0);
}

#[test]
fn performance_score_stays_in_bounds() {
    let config = OrchestratorConfig::default();
    let gpu = Arc::new(MockRuntime::new("mock-gpu", MockBehavior::default()));
    let mut orchestrator = Orchestrator::with_runtimes(&config, gpu, None);
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("m.tflite");
    std::fs::write(&model, b"m").unwrap();
    assert!(orchestrator.initialize(&model).success);

    let first = orchestrator.status().engines[0].performance_score;
    for _ in 0..20 {
        orchestrator.process_inference("tick");
        let score = orchestrator.status().engines[0].performance_score;
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(score, first);
    }
    assert!(first <= 0.8 && first > 0.4);
}

#[test]
fn status_serializes_for_diagnostics() {
    let mut f = fixture(MockBehavior::default(), nnapi());
    assert!(f.orchestrator.initialize(&f.model).success);

    let json = serde_json::to_value(f.orchestrator.status()).unwrap();
    assert_eq!(json["active"], "primary_gpu");
    assert_eq!(json["engines"][0]["model_loaded"], true);
    assert_eq!(json["engines"][0]["model_sha256"].as_str().unwrap().len(), 64);
    assert_eq!(json["engines"][1]["initialized"], false);
}

// ============================================================================
// Empty adapter output
// ============================================================================

/// Adapter that initializes but answers with nothing.
struct SilentEngine {
    initialized: bool,
}

impl EngineAdapter for SilentEngine {
    fn kind(&self) -> BackendKind {
        BackendKind::PrimaryGpu
    }

    fn label(&self) -> &str {
        "Silent Engine"
    }

    fn initialize(&mut self, _model_path: &Path) -> bool {
        self.initialized = true;
        true
    }

    fn initialize_with_assets(&mut self, _store: &dyn AssetStore) -> bool {
        self.initialized = true;
        true
    }

    fn process_inference(&self, _input: &str) -> String {
        String::new()
    }

    fn is_acceleration_available(&self) -> bool {
        false
    }

    fn performance_score(&self) -> f32 {
        0.6
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn is_model_loaded(&self) -> bool {
        self.initialized
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            kind: self.kind(),
            label: self.label().to_string(),
            runtime: "none".to_string(),
            initialized: self.initialized,
            model_loaded: self.initialized,
            accelerated: false,
            performance_score: self.performance_score(),
            model: None,
            model_sha256: None,
            fallback_reason: None,
        }
    }

    fn cleanup(&mut self) {
        self.initialized = false;
    }
}

#[test]
fn empty_adapter_output_becomes_no_backend_sentinel() {
    let mut registry = AdapterRegistry::new();
    registry.register(Box::new(SilentEngine { initialized: false }));
    let mut orchestrator = Orchestrator::new(registry);

    assert!(orchestrator.initialize(Path::new("unused.tflite")).success);
    assert_eq!(orchestrator.process_inference("hello"), NO_ACTIVE_BACKEND);

    orchestrator.cleanup();
    assert_eq!(orchestrator.process_inference("hello"), NOT_INITIALIZED);
}
