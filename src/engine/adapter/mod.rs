// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Engine adapters: one concrete runtime behind a uniform contract.
//!
//! Adapters never return errors. Initialization reports `false`, inference
//! reports a labeled string.

mod core;
mod fallback;
mod gpu;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::assets::AssetStore;

pub use self::core::{AdapterCore, AdapterSettings, PROBE_INPUT, WARM_UP_INPUT};
pub use fallback::FallbackEngine;
pub use gpu::GpuEngine;

/// Returned by `process_inference` before initialization.
pub const NOT_INITIALIZED: &str = "Error: Service not initialized";

/// Which backend is active. Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    None,
    PrimaryGpu,
    AcceleratedFallback,
}

impl BackendKind {
    /// Selection priority; lower runs first. `None` is never selected.
    pub fn priority(&self) -> Option<u8> {
        match self {
            BackendKind::None => None,
            BackendKind::PrimaryGpu => Some(0),
            BackendKind::AcceleratedFallback => Some(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::None => "none",
            BackendKind::PrimaryGpu => "primary_gpu",
            BackendKind::AcceleratedFallback => "accelerated_fallback",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic snapshot of one adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub kind: BackendKind,
    pub label: String,
    pub runtime: String,
    pub initialized: bool,
    pub model_loaded: bool,
    pub accelerated: bool,
    pub performance_score: f32,
    pub model: Option<String>,
    pub model_sha256: Option<String>,
    /// Why the adapter is in fallback mode, if it is.
    pub fallback_reason: Option<String>,
}

/// Uniform contract over one inference runtime.
///
/// Lifecycle calls take `&mut self` and must be serialized by the owner.
/// `process_inference` and the queries take `&self`.
pub trait EngineAdapter: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Human-readable name used in responses, e.g. "GPU Engine".
    fn label(&self) -> &str;

    /// Initialize from a model file. Returns true if already initialized.
    fn initialize(&mut self, model_path: &Path) -> bool;

    /// Initialize from the first usable bundled candidate.
    fn initialize_with_assets(&mut self, store: &dyn AssetStore) -> bool;

    /// Never empty. [`NOT_INITIALIZED`] before initialization.
    fn process_inference(&self, input: &str) -> String;

    /// Whether a hardware delegate is attached.
    fn is_acceleration_available(&self) -> bool;

    /// Extra gate checked by the orchestrator after a successful initialize.
    fn capability_check(&self) -> bool {
        true
    }

    /// Cached score in `[0, 1]`; 0.0 when uninitialized.
    fn performance_score(&self) -> f32;

    fn is_initialized(&self) -> bool;

    fn is_model_loaded(&self) -> bool;

    fn status(&self) -> EngineStatus;

    /// Release everything. Idempotent.
    fn cleanup(&mut self);
}
