// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Structured logging, spans and metrics.
//!
//! Output goes to stderr or a file; metrics go to whatever recorder the host
//! installs.

mod logging;
mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    init_metrics, record_backend_init, record_inference, InferenceOutcome, BACKEND_INIT_TOTAL,
    INFERENCE_LATENCY_MS, INFERENCE_TOTAL,
};
pub use spans::{EngineSpan, SpanExt};
