// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Primary engine: GPU delegate first, CPU when the delegate is missing.

use std::path::Path;
use std::sync::Arc;

use super::core::{AdapterCore, AdapterSettings};
use super::{BackendKind, EngineAdapter, EngineStatus};
use crate::assets::AssetStore;
use crate::engine::runtime::EngineRuntime;

pub const GPU_ENGINE_LABEL: &str = "GPU Engine";

/// Adapter trusted once it reports initialization success.
pub struct GpuEngine {
    core: AdapterCore,
}

impl GpuEngine {
    pub fn new(runtime: Arc<dyn EngineRuntime>, settings: AdapterSettings) -> Self {
        Self {
            core: AdapterCore::new(BackendKind::PrimaryGpu, GPU_ENGINE_LABEL, runtime, settings),
        }
    }

    pub fn with_defaults(runtime: Arc<dyn EngineRuntime>) -> Self {
        Self::new(runtime, AdapterSettings::gpu_default())
    }
}

impl EngineAdapter for GpuEngine {
    fn kind(&self) -> BackendKind {
        self.core.kind()
    }

    fn label(&self) -> &str {
        self.core.label()
    }

    fn initialize(&mut self, model_path: &Path) -> bool {
        self.core.initialize_from_path(model_path)
    }

    fn initialize_with_assets(&mut self, store: &dyn AssetStore) -> bool {
        self.core.initialize_from_assets(store)
    }

    fn process_inference(&self, input: &str) -> String {
        self.core.process_inference(input)
    }

    fn is_acceleration_available(&self) -> bool {
        self.core.is_accelerated()
    }

    fn performance_score(&self) -> f32 {
        self.core.performance_score()
    }

    fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }

    fn is_model_loaded(&self) -> bool {
        self.core.is_model_loaded()
    }

    fn status(&self) -> EngineStatus {
        self.core.status()
    }

    fn cleanup(&mut self) {
        self.core.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetStore;
    use crate::engine::runtime::{MockBehavior, MockRuntime};

    #[test]
    fn test_reinitialize_is_noop_success() {
        let runtime = Arc::new(MockRuntime::new("mock", MockBehavior::default()));
        let mut engine = GpuEngine::with_defaults(runtime.clone());
        let store = MemoryAssetStore::new().with("models/test_model.tflite", b"m".to_vec());
        assert!(engine.initialize_with_assets(&store));
        assert!(engine.initialize_with_assets(&store));
        assert_eq!(runtime.stats().loads(), 1);
        assert_eq!(engine.label(), "GPU Engine");
        assert!(engine.capability_check());
    }

    #[test]
    fn test_status_reports_digest() {
        let runtime = Arc::new(MockRuntime::new("mock", MockBehavior::default()));
        let mut engine = GpuEngine::with_defaults(runtime);
        let store = MemoryAssetStore::new().with("models/test_model.tflite", b"abc".to_vec());
        assert!(engine.initialize_with_assets(&store));
        let status = engine.status();
        assert_eq!(status.kind, BackendKind::PrimaryGpu);
        assert!(status.accelerated);
        assert_eq!(
            status.model_sha256.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }
}
