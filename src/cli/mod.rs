// Copyright 2024-2026 Mobile AI Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI module for `mobile-ai-cli`.
//!
//! ## Usage
//!
//! ```bash
//! mobile-ai-cli infer models/m.onnx "Hello"   # Initialize from a file, run once
//! mobile-ai-cli assets ./bundle "Hello"       # Initialize from bundled assets
//! mobile-ai-cli info models/m.onnx            # Show backend info and status
//! mobile-ai-cli selftest                      # Exercise the pipeline on a scripted engine
//! mobile-ai-cli config show                   # Print effective configuration
//! ```

pub mod config_cmd;
pub mod engine_cmd;

use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::engine::runtime::EngineRuntime;
use crate::orchestrator::Orchestrator;

/// Exit code for usage and configuration errors.
pub const EXIT_USAGE: i32 = 2;

/// Runtimes for the GPU and fallback engines in this build.
///
/// `None` when the crate was built without any native engine.
pub fn native_runtimes() -> Option<(Arc<dyn EngineRuntime>, Option<Arc<dyn EngineRuntime>>)> {
    #[cfg(feature = "onnx")]
    {
        use crate::engine::runtime::OnnxRuntime;
        let gpu: Arc<dyn EngineRuntime> = Arc::new(OnnxRuntime::gpu());
        let fallback: Arc<dyn EngineRuntime> = Arc::new(OnnxRuntime::nnapi());
        Some((gpu, Some(fallback)))
    }
    #[cfg(not(feature = "onnx"))]
    {
        None
    }
}

/// Orchestrator over the native runtimes, or `None` without any.
pub fn native_orchestrator(config: &OrchestratorConfig) -> Option<Orchestrator> {
    let (gpu, fallback) = native_runtimes()?;
    Some(Orchestrator::with_runtimes(config, gpu, fallback))
}
