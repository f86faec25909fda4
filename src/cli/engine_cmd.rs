// Copyright 2024-2026 Mobile AI Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Engine CLI subcommands: infer, assets, info, selftest.

use std::path::Path;
use std::sync::Arc;

use crate::assets::{DirAssetStore, MemoryAssetStore};
use crate::config::OrchestratorConfig;
use crate::engine::runtime::{AcceleratorKind, MockBehavior, MockRuntime};
use crate::engine::BackendKind;
use crate::orchestrator::{Orchestrator, NOT_INITIALIZED};

use super::{native_orchestrator, EXIT_USAGE};

fn require_native(config: &OrchestratorConfig) -> Result<Orchestrator, i32> {
    native_orchestrator(config).ok_or_else(|| {
        eprintln!("Error: built without a native engine runtime (enable the `onnx` feature)");
        EXIT_USAGE
    })
}

/// Initialize from `model` and run `input` once.
///
/// Returns exit code: 0 on success, 1 if no backend initialized.
pub fn run_infer(config: &OrchestratorConfig, model: &Path, input: &str) -> i32 {
    let mut orchestrator = match require_native(config) {
        Ok(o) => o,
        Err(code) => return code,
    };
    let result = orchestrator.initialize(model);
    if !result.success {
        eprintln!("Initialization failed: {}", result.message.unwrap_or_default());
        return 1;
    }
    eprintln!("{}", orchestrator.backend_info());
    println!("{}", orchestrator.process_inference(input));
    0
}

/// Initialize from the bundled assets under `dir` and run `input` once.
pub fn run_assets(config: &OrchestratorConfig, dir: &Path, input: &str) -> i32 {
    let mut orchestrator = match require_native(config) {
        Ok(o) => o,
        Err(code) => return code,
    };
    let store = DirAssetStore::new(dir);
    let result = orchestrator.initialize_with_assets(&store);
    if !result.success {
        eprintln!("Initialization failed: {}", result.message.unwrap_or_default());
        return 1;
    }
    eprintln!("{}", orchestrator.backend_info());
    println!("{}", orchestrator.process_inference(input));
    0
}

/// Initialize from `model` and print the backend status.
pub fn run_info(config: &OrchestratorConfig, model: &Path, json: bool) -> i32 {
    let mut orchestrator = match require_native(config) {
        Ok(o) => o,
        Err(code) => return code,
    };
    let result = orchestrator.initialize(model);
    if json {
        match serde_json::to_string_pretty(&orchestrator.status()) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    } else {
        println!("{}", orchestrator.backend_info());
        for engine in orchestrator.status().engines {
            println!(
                "  {:<22} initialized={:<5} model_loaded={:<5} accelerated={:<5} score={:.2}",
                engine.kind.as_str(),
                engine.initialized,
                engine.model_loaded,
                engine.accelerated,
                engine.performance_score,
            );
            if let Some(digest) = engine.model_sha256 {
                println!("  {:<22} sha256={}", "", digest);
            }
        }
    }
    if result.success {
        0
    } else {
        1
    }
}

/// One self-test check.
#[derive(Debug)]
pub struct SelfTestResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

fn check(name: &'static str, passed: bool, detail: impl Into<String>) -> SelfTestResult {
    SelfTestResult { name, passed, detail: detail.into() }
}

/// Drive the selection and inference pipeline over scripted engines.
pub fn selftest(config: &OrchestratorConfig) -> Vec<SelfTestResult> {
    let config = OrchestratorConfig { perf_probe: false, ..config.clone() };
    let mut results = Vec::new();

    let broken_gpu = MockBehavior { fail_load: true, ..Default::default() };
    let nnapi = MockBehavior { accelerator: AcceleratorKind::Nnapi, ..Default::default() };
    let mut orchestrator = Orchestrator::with_runtimes(
        &config,
        Arc::new(MockRuntime::new("selftest-gpu", broken_gpu)),
        Some(Arc::new(MockRuntime::new("selftest-nnapi", nnapi))),
    );

    let uninit = orchestrator.process_inference("ping");
    results.push(check("uninitialized sentinel", uninit == NOT_INITIALIZED, uninit));

    let dir = std::env::temp_dir().join(format!("mobile-ai-selftest-{}", std::process::id()));
    let model = dir.join("model.bin");
    let written = std::fs::create_dir_all(&dir).and_then(|_| std::fs::write(&model, b"selftest"));
    if let Err(e) = written {
        results.push(check("model file", false, e.to_string()));
        return results;
    }

    let init = orchestrator.initialize(&model);
    results.push(check(
        "fallback selected when GPU fails",
        init.success && init.backend == BackendKind::AcceleratedFallback,
        init.message.unwrap_or_default(),
    ));

    let out = orchestrator.process_inference("ping");
    results.push(check("inference decodes", out.contains("response (token 1"), out));

    let info = orchestrator.backend_info();
    results.push(check("backend info", info.starts_with("Backend: accelerated_fallback"), info));

    orchestrator.cleanup();
    orchestrator.cleanup();
    let after = orchestrator.process_inference("ping");
    results.push(check("cleanup idempotent", after == NOT_INITIALIZED, after));

    let mut degraded = Orchestrator::with_runtimes(
        &config,
        Arc::new(MockRuntime::new("selftest-gpu", MockBehavior::default())),
        None,
    );
    let init = degraded.initialize_with_assets(&MemoryAssetStore::new());
    let out = degraded.process_inference(&"x".repeat(10_000));
    results.push(check(
        "degraded mode answers",
        init.success && out.contains("fallback response"),
        init.message.unwrap_or_default(),
    ));

    let _ = std::fs::remove_dir_all(&dir);
    results
}

/// Run [`selftest`] and print one line per check.
///
/// Returns exit code: 0 if every check passed, 1 otherwise.
pub fn run_selftest(config: &OrchestratorConfig) -> i32 {
    let results = selftest(config);
    let failed = results.iter().filter(|r| !r.passed).count();
    for r in &results {
        let mark = if r.passed { "PASS" } else { "FAIL" };
        println!("[{}] {}", mark, r.name);
        if !r.passed {
            println!("       {}", r.detail.replace('\n', "\n       "));
        }
    }
    println!("{} passed, {} failed", results.len() - failed, failed);
    if failed == 0 {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selftest_passes() {
        let results = selftest(&OrchestratorConfig::default());
        assert_eq!(results.len(), 6);
        for r in &results {
            assert!(r.passed, "{} failed: {}", r.name, r.detail);
        }
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_infer_without_runtime_is_usage_error() {
        let code = run_infer(&OrchestratorConfig::default(), Path::new("m.onnx"), "hi");
        assert_eq!(code, EXIT_USAGE);
    }
}
