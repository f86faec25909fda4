//! Mobile AI Core
//!
//! On-device inference with automatic backend selection. A GPU-delegated
//! engine is tried first; an accelerated fallback engine (NNAPI) second.
//! Exactly one backend serves requests until cleanup.
//!
//! # Guarantees
//!
//! - **Never panics across the API**: inference failures become labeled
//!   fallback responses, initialization failures become `false`
//! - **Never empty**: every inference call returns a non-empty string
//! - **Ordered release**: delegate, interpreter, model, then model bytes
//!
//! # Layout
//!
//! - `engine`: tensors, tokenizer, engine runtimes and adapters
//! - `orchestrator`: backend selection and request routing
//! - `assets`: bundled model lookup
//! - `telemetry`: logging, spans and metrics
//! - `ffi`: C ABI for host applications (feature `ffi`)

pub mod assets;
pub mod cli;
pub mod config;
pub mod engine;
pub mod orchestrator;
pub mod telemetry;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use assets::{AssetError, AssetStore, DirAssetStore, MemoryAssetStore};
pub use config::{ConfigError, OrchestratorConfig};
pub use engine::{BackendKind, EngineAdapter, EngineError, EngineStatus, FallbackEngine, GpuEngine};
pub use orchestrator::{
    AdapterRegistry, InitializationResult, MobileAiService, Orchestrator, OrchestratorStatus,
    INFO_NOT_INITIALIZED, NOT_INITIALIZED, NO_ACTIVE_BACKEND,
};
