// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Metric names and recording helpers over the `metrics` facade.
//!
//! No recorder is installed here; without one every call is a no-op.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

pub const INFERENCE_TOTAL: &str = "mobile_ai_inference_total";
pub const INFERENCE_LATENCY_MS: &str = "mobile_ai_inference_latency_ms";
pub const BACKEND_INIT_TOTAL: &str = "mobile_ai_backend_init_total";

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    describe_counter!(INFERENCE_TOTAL, "Inference requests by backend and outcome");
    describe_histogram!(
        INFERENCE_LATENCY_MS,
        Unit::Milliseconds,
        "Latency of completed engine invocations"
    );
    describe_counter!(BACKEND_INIT_TOTAL, "Backend initialization attempts by outcome");
}

/// Outcome label of an inference request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceOutcome {
    Ok,
    /// Answered by the labeled fallback response after an engine error.
    Fallback,
    /// No model loaded; fallback mode.
    Degraded,
}

impl InferenceOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceOutcome::Ok => "ok",
            InferenceOutcome::Fallback => "fallback",
            InferenceOutcome::Degraded => "degraded",
        }
    }
}

pub fn record_inference(backend: &'static str, outcome: InferenceOutcome, latency: Duration) {
    counter!(INFERENCE_TOTAL, "backend" => backend, "outcome" => outcome.as_str()).increment(1);
    if outcome == InferenceOutcome::Ok {
        histogram!(INFERENCE_LATENCY_MS, "backend" => backend)
            .record(latency.as_secs_f64() * 1000.0);
    }
}

/// `outcome` is one of `loaded`, `fallback_mode`, `failed`, `rejected`, `unsupported`.
pub fn record_backend_init(backend: &'static str, outcome: &'static str) {
    counter!(BACKEND_INIT_TOTAL, "backend" => backend, "outcome" => outcome).increment(1);
}
