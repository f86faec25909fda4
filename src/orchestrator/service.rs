// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Host-facing facade over one [`Orchestrator`].
//!
//! Lifecycle calls take the write lock, so they are serialized and never run
//! while an inference holds the engine. Inference and info take the read lock.

use std::path::Path;

use parking_lot::RwLock;

use super::{InitializationResult, Orchestrator, OrchestratorStatus};
use crate::assets::AssetStore;

pub struct MobileAiService {
    inner: RwLock<Orchestrator>,
}

impl MobileAiService {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { inner: RwLock::new(orchestrator) }
    }

    pub fn initialize(&self, model_path: &Path) -> bool {
        self.initialize_detailed(model_path).success
    }

    pub fn initialize_detailed(&self, model_path: &Path) -> InitializationResult {
        self.inner.write().initialize(model_path)
    }

    pub fn initialize_with_assets(&self, store: &dyn AssetStore) -> bool {
        self.inner.write().initialize_with_assets(store).success
    }

    pub fn process_inference(&self, input: &str) -> String {
        self.inner.read().process_inference(input)
    }

    pub fn backend_info(&self) -> String {
        self.inner.read().backend_info()
    }

    pub fn status(&self) -> OrchestratorStatus {
        self.inner.read().status()
    }

    pub fn cleanup(&self) {
        self.inner.write().cleanup();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::assets::MemoryAssetStore;
    use crate::config::OrchestratorConfig;
    use crate::engine::runtime::{MockBehavior, MockRuntime};
    use crate::orchestrator::NOT_INITIALIZED;

    #[test]
    fn test_concurrent_inference_after_init() {
        let orchestrator = Orchestrator::with_runtimes(
            &OrchestratorConfig { perf_probe: false, warm_up: false, ..Default::default() },
            Arc::new(MockRuntime::new("gpu", MockBehavior::default())),
            None,
        );
        let service = Arc::new(MobileAiService::new(orchestrator));
        let store = MemoryAssetStore::new().with("models/test_model.tflite", b"m".to_vec());
        assert!(service.initialize_with_assets(&store));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let service = service.clone();
                thread::spawn(move || service.process_inference(&format!("request {i}")))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), "GPU Engine response (token 1, score: 0.900)");
        }

        service.cleanup();
        assert_eq!(service.process_inference("late"), NOT_INITIALIZED);
    }
}
