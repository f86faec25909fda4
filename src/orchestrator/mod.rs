// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Backend selection and request routing.
//!
//! Adapters are tried in fixed priority order; the first that initializes
//! (and, for the fallback engine, passes its capability check) becomes
//! active until `cleanup`. A failed or degraded backend is never re-probed.

mod registry;
mod service;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assets::AssetStore;
use crate::config::OrchestratorConfig;
use crate::engine::performance;
use crate::engine::runtime::EngineRuntime;
use crate::engine::{BackendKind, EngineAdapter, EngineStatus, FallbackEngine, GpuEngine};

pub use registry::AdapterRegistry;
pub use service::MobileAiService;

pub use crate::engine::adapter::NOT_INITIALIZED;
/// Returned when the active adapter produced nothing.
pub const NO_ACTIVE_BACKEND: &str = "Error: No active backend available";
/// Returned by `backend_info` before any backend is active.
pub const INFO_NOT_INITIALIZED: &str = "Backend: Not initialized";

/// Outcome of an initialization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializationResult {
    pub success: bool,
    pub backend: BackendKind,
    pub message: Option<String>,
}

impl InitializationResult {
    fn activated(backend: BackendKind, message: String) -> Self {
        Self { success: true, backend, message: Some(message) }
    }

    fn failed(message: String) -> Self {
        Self { success: false, backend: BackendKind::None, message: Some(message) }
    }
}

/// Serializable view of the orchestrator and its adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub active: BackendKind,
    pub initialized: bool,
    pub engines: Vec<EngineStatus>,
}

/// Owns the adapters and tracks which one is active.
pub struct Orchestrator {
    registry: AdapterRegistry,
    active: BackendKind,
}

impl Orchestrator {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self { registry, active: BackendKind::None }
    }

    /// GPU engine on `gpu_runtime`, plus the fallback engine if a runtime is given.
    pub fn with_runtimes(
        config: &OrchestratorConfig,
        gpu_runtime: Arc<dyn EngineRuntime>,
        fallback_runtime: Option<Arc<dyn EngineRuntime>>,
    ) -> Self {
        let mut registry = AdapterRegistry::new();
        registry.register(Box::new(GpuEngine::new(gpu_runtime, config.gpu_settings())));
        if let Some(runtime) = fallback_runtime {
            registry.register(Box::new(FallbackEngine::new(runtime, config.fallback_settings())));
        }
        Self::new(registry)
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn active_backend(&self) -> BackendKind {
        self.active
    }

    pub fn is_initialized(&self) -> bool {
        self.active != BackendKind::None
    }

    fn active_adapter(&self) -> Option<&dyn EngineAdapter> {
        self.registry.get(self.active)
    }

    /// Select a backend from a model file.
    pub fn initialize(&mut self, model_path: &Path) -> InitializationResult {
        info!(model = %model_path.display(), "Selecting backend");
        self.select(|adapter| adapter.initialize(model_path))
    }

    /// Select a backend from bundled assets.
    pub fn initialize_with_assets(&mut self, store: &dyn AssetStore) -> InitializationResult {
        info!("Selecting backend from bundled assets");
        self.select(|adapter| adapter.initialize_with_assets(store))
    }

    fn select<F>(&mut self, mut init: F) -> InitializationResult
    where
        F: FnMut(&mut dyn EngineAdapter) -> bool,
    {
        if self.is_initialized() {
            self.cleanup();
        }

        let mut rejected = Vec::new();
        for adapter in self.registry.iter_mut() {
            let kind = adapter.kind();
            if !init(adapter.as_mut()) {
                warn!(backend = %kind, "Backend failed to initialize");
                adapter.cleanup();
                rejected.push(format!("{kind}: initialization failed"));
                continue;
            }
            if !adapter.capability_check() {
                warn!(backend = %kind, "Backend failed capability check");
                crate::telemetry::record_backend_init(kind.as_str(), "rejected");
                adapter.cleanup();
                rejected.push(format!("{kind}: accelerator not available"));
                continue;
            }

            let label = adapter.label().to_string();
            let degraded = !adapter.is_model_loaded();
            self.active = kind;
            info!(backend = %kind, degraded, "Backend active");
            let message = if degraded {
                format!("{label} active in fallback mode")
            } else {
                format!("{label} active")
            };
            return InitializationResult::activated(kind, message);
        }

        let message = if rejected.is_empty() {
            "no backends registered".to_string()
        } else {
            rejected.join("; ")
        };
        warn!(reason = %message, "No backend available");
        InitializationResult::failed(message)
    }

    /// Route `input` to the active adapter. Never empty.
    pub fn process_inference(&self, input: &str) -> String {
        let Some(adapter) = self.active_adapter() else {
            return NOT_INITIALIZED.to_string();
        };
        let out = adapter.process_inference(input);
        if out.is_empty() {
            warn!(backend = %self.active, "Active backend returned nothing");
            return NO_ACTIVE_BACKEND.to_string();
        }
        out
    }

    /// One-line description of the active backend and its cached score.
    pub fn backend_info(&self) -> String {
        let Some(adapter) = self.active_adapter() else {
            return INFO_NOT_INITIALIZED.to_string();
        };
        let mut info = format!("Backend: {} [{}]", self.active, adapter.label());
        if !adapter.is_model_loaded() {
            info.push_str(" [fallback mode]");
        } else if adapter.is_acceleration_available() {
            info.push_str(" [accelerated]");
        }
        info.push_str(&format!(
            " (Performance: {}%)",
            performance::as_percent(adapter.performance_score())
        ));
        info
    }

    /// Release every adapter and forget the active backend. Idempotent.
    pub fn cleanup(&mut self) {
        for adapter in self.registry.iter_mut() {
            adapter.cleanup();
        }
        if self.active != BackendKind::None {
            info!(backend = %self.active, "Backend released");
        }
        self.active = BackendKind::None;
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            active: self.active,
            initialized: self.is_initialized(),
            engines: self.registry.iter().map(|a| a.status()).collect(),
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.cleanup();
    }
}
