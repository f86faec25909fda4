// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Registered adapters, kept in priority order.

use tracing::debug;

use crate::engine::{BackendKind, EngineAdapter};

/// Adapters the orchestrator may select, one per [`BackendKind`].
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn EngineAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an adapter. Replaces a previous adapter of the same kind.
    ///
    /// Adapters of kind [`BackendKind::None`] are ignored.
    pub fn register(&mut self, adapter: Box<dyn EngineAdapter>) {
        let kind = adapter.kind();
        if kind.priority().is_none() {
            debug!(label = adapter.label(), "Ignoring adapter without priority");
            return;
        }
        if let Some(mut old) = self.take(kind) {
            old.cleanup();
        }
        let at = self
            .adapters
            .iter()
            .position(|a| a.kind().priority() > kind.priority())
            .unwrap_or(self.adapters.len());
        debug!(backend = %kind, position = at, "Adapter registered");
        self.adapters.insert(at, adapter);
    }

    fn take(&mut self, kind: BackendKind) -> Option<Box<dyn EngineAdapter>> {
        let index = self.adapters.iter().position(|a| a.kind() == kind)?;
        Some(self.adapters.remove(index))
    }

    pub fn get(&self, kind: BackendKind) -> Option<&dyn EngineAdapter> {
        self.adapters.iter().find(|a| a.kind() == kind).map(|a| a.as_ref())
    }

    /// Registered kinds in selection order.
    pub fn kinds(&self) -> Vec<BackendKind> {
        self.adapters.iter().map(|a| a.kind()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn EngineAdapter> {
        self.adapters.iter().map(|a| a.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn EngineAdapter>> {
        self.adapters.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
