// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Secondary engine on the NNAPI/NPU path.
//!
//! Selected only if its accelerator is actually present. Loading from bundled
//! assets is not supported for this engine.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use super::core::{AdapterCore, AdapterSettings};
use super::{BackendKind, EngineAdapter, EngineStatus};
use crate::assets::AssetStore;
use crate::engine::runtime::EngineRuntime;
use crate::telemetry;

pub const FALLBACK_ENGINE_LABEL: &str = "Accelerated Fallback Engine";

pub struct FallbackEngine {
    core: AdapterCore,
}

impl FallbackEngine {
    pub fn new(runtime: Arc<dyn EngineRuntime>, settings: AdapterSettings) -> Self {
        Self {
            core: AdapterCore::new(
                BackendKind::AcceleratedFallback,
                FALLBACK_ENGINE_LABEL,
                runtime,
                settings,
            ),
        }
    }

    pub fn with_defaults(runtime: Arc<dyn EngineRuntime>) -> Self {
        Self::new(runtime, AdapterSettings::fallback_default())
    }
}

impl EngineAdapter for FallbackEngine {
    fn kind(&self) -> BackendKind {
        self.core.kind()
    }

    fn label(&self) -> &str {
        self.core.label()
    }

    fn initialize(&mut self, model_path: &Path) -> bool {
        self.core.initialize_from_path(model_path)
    }

    fn initialize_with_assets(&mut self, _store: &dyn AssetStore) -> bool {
        warn!(backend = %self.core.kind(), "Asset initialization not supported by this engine");
        telemetry::record_backend_init(self.core.kind().as_str(), "unsupported");
        false
    }

    fn process_inference(&self, input: &str) -> String {
        self.core.process_inference(input)
    }

    fn is_acceleration_available(&self) -> bool {
        self.core.is_accelerated()
    }

    /// The delegate must be attached and the runtime must still report its
    /// accelerator; a model running on CPU does not qualify.
    fn capability_check(&self) -> bool {
        self.core.is_accelerated() && self.core.runtime().accelerator_available()
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
