// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Engine error types.
//!
//! Errors never cross the adapter boundary: adapters turn them into `false`
//! or into a labeled fallback string.

use thiserror::Error;

use super::tensor::ElementType;
use crate::assets::AssetError;

/// Errors raised while building or running an inference engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Delegate unavailable: {0}")]
    DelegateUnavailable(String),

    #[error("Interpreter build failed: {0}")]
    InterpreterBuild(String),

    #[error("Tensor allocation failed: {0}")]
    Allocation(String),

    #[error("Invoke failed: {0}")]
    Invoke(String),

    #[error("Unsupported tensor type: {0}")]
    UnsupportedTensorType(ElementType),

    #[error("Missing {kind} tensor at index {index}")]
    MissingTensor { kind: &'static str, index: usize },

    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Engine panicked: {0}")]
    Panicked(String),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Returns true if the engine can keep going on CPU after this error.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::DelegateUnavailable(_))
    }

    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelLoad(_) => "model_load",
            Self::DelegateUnavailable(_) => "delegate",
            Self::InterpreterBuild(_) => "interpreter_build",
            Self::Allocation(_) => "allocation",
            Self::Invoke(_) => "invoke",
            Self::UnsupportedTensorType(_) => "unsupported_type",
            Self::MissingTensor { .. } => "missing_tensor",
            Self::NotInitialized => "not_initialized",
            Self::Panicked(_) => "panic",
            Self::Asset(_) => "asset",
            Self::Io(_) => "io",
        }
    }
}
