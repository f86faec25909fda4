// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Model bytes and the runtime objects built from them.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use sha2::{Digest, Sha256};

use super::error::EngineError;
use super::runtime::{Delegate, Interpreter, ModelGraph};

/// Raw model bytes, owned or memory-mapped.
pub enum ModelBuffer {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl ModelBuffer {
    /// Memory-map a model file read-only.
    pub fn map_file(path: &Path) -> Result<Self, EngineError> {
        let file = File::open(path)?;
        // SAFETY: read-only mapping; model files are not modified while loaded.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(ModelBuffer::Mapped(mmap))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ModelBuffer::Owned(v) => v,
            ModelBuffer::Mapped(m) => m,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, ModelBuffer::Mapped(_))
    }

    /// Hex SHA-256 of the model bytes.
    pub fn sha256(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for ModelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuffer")
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

/// Everything one engine instance owns.
///
/// The buffer outlives the model, the model outlives the interpreter, and the
/// interpreter outlives the delegate it runs on. Fields are declared in drop
/// order so an implicit drop releases them correctly too.
pub struct EngineHandle {
    delegate: Option<Box<dyn Delegate>>,
    interpreter: Option<Box<dyn Interpreter>>,
    model: Option<Box<dyn ModelGraph>>,
    buffer: Option<std::sync::Arc<ModelBuffer>>,
}

impl EngineHandle {
    pub fn new(
        buffer: std::sync::Arc<ModelBuffer>,
        model: Box<dyn ModelGraph>,
        delegate: Option<Box<dyn Delegate>>,
        interpreter: Box<dyn Interpreter>,
    ) -> Self {
        Self {
            delegate,
            interpreter: Some(interpreter),
            model: Some(model),
            buffer: Some(buffer),
        }
    }

    pub fn is_accelerated(&self) -> bool {
        self.delegate.is_some()
    }

    pub fn interpreter_mut(&mut self) -> Option<&mut (dyn Interpreter + 'static)> {
        self.interpreter.as_deref_mut()
    }

    pub fn is_released(&self) -> bool {
        self.interpreter.is_none()
    }

    /// Drop the delegate, interpreter, model and buffer in that order.
    pub fn release(&mut self) {
        drop(self.delegate.take());
        drop(self.interpreter.take());
        drop(self.model.take());
        drop(self.buffer.take());
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.release();
    }
}
