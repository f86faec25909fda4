// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Standard spans for engine work.

use tracing::{info_span, Span};

/// Record an operation's outcome on a span.
pub trait SpanExt {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Span factory for the two engine phases.
pub struct EngineSpan;

impl EngineSpan {
    /// Model load and interpreter build.
    ///
    /// `status`, `error.message` and `accelerated` are filled in later.
    pub fn init(backend: &str, model: &str) -> Span {
        info_span!(
            "engine_init",
            backend = %backend,
            model = %model,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            accelerated = tracing::field::Empty,
        )
    }

    /// One inference request. `latency_ms` is filled in after completion.
    pub fn inference(backend: &str, input_chars: usize) -> Span {
        info_span!(
            "inference",
            backend = %backend,
            input_chars = input_chars,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}
