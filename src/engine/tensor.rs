// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Tensor descriptions and host-side buffers exchanged with an engine runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type of a tensor as declared by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Int32,
    Float32,
    Int64,
    UInt8,
    Float16,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            ElementType::Int32 | ElementType::Float32 => 4,
            ElementType::Int64 => 8,
            ElementType::UInt8 => 1,
            ElementType::Float16 => 2,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Int32 => write!(f, "int32"),
            ElementType::Float32 => write!(f, "float32"),
            ElementType::Int64 => write!(f, "int64"),
            ElementType::UInt8 => write!(f, "uint8"),
            ElementType::Float16 => write!(f, "float16"),
        }
    }
}

/// Declared type and shape of one model input or output.
///
/// A dimension of `0` is dynamic and must be resized before allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub element_type: ElementType,
    pub shape: Vec<usize>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, element_type: ElementType, shape: Vec<usize>) -> Self {
        Self { name: name.into(), element_type, shape }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// True if any dimension still needs resizing.
    pub fn is_dynamic(&self) -> bool {
        self.shape.iter().any(|&d| d == 0)
    }

    /// Number of elements; zero while the shape is dynamic.
    pub fn element_count(&self) -> usize {
        if self.shape.is_empty() {
            return 1;
        }
        self.shape.iter().product()
    }

    /// Byte length of a buffer holding this tensor.
    pub fn byte_len(&self) -> usize {
        self.element_count() * self.element_type.size()
    }

    /// Shape with every dynamic dimension replaced: batch by 1, the rest by
    /// `seq_len`.
    pub fn resolved_shape(&self, seq_len: usize) -> Vec<usize> {
        self.shape
            .iter()
            .enumerate()
            .map(|(axis, &d)| match (axis, d) {
                (0, 0) => 1,
                (_, 0) => seq_len.max(1),
                (_, d) => d,
            })
            .collect()
    }
}

/// Host-side storage for a tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    /// Element types the binder does not interpret.
    Raw(Vec<u8>),
}

impl TensorData {
    /// Zeroed storage for `count` elements of `element_type`.
    pub fn zeroed(element_type: ElementType, count: usize) -> Self {
        match element_type {
            ElementType::Int32 => TensorData::Int32(vec![0; count]),
            ElementType::Float32 => TensorData::Float32(vec![0.0; count]),
            other => TensorData::Raw(vec![0; count * other.size()]),
        }
    }

    fn byte_len(&self) -> usize {
        match self {
            TensorData::Int32(v) => v.len() * 4,
            TensorData::Float32(v) => v.len() * 4,
            TensorData::Raw(v) => v.len(),
        }
    }
}

/// A tensor spec paired with its buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    spec: TensorSpec,
    data: TensorData,
}

impl Tensor {
    /// Allocate a zeroed buffer matching `spec`.
    pub fn allocate(spec: TensorSpec) -> Self {
        let data = TensorData::zeroed(spec.element_type, spec.element_count());
        Self { spec, data }
    }

    pub fn new(spec: TensorSpec, data: TensorData) -> Self {
        Self { spec, data }
    }

    pub fn from_f32(name: &str, shape: Vec<usize>, values: Vec<f32>) -> Self {
        Self {
            spec: TensorSpec::new(name, ElementType::Float32, shape),
            data: TensorData::Float32(values),
        }
    }

    pub fn from_i32(name: &str, shape: Vec<usize>, values: Vec<i32>) -> Self {
        Self {
            spec: TensorSpec::new(name, ElementType::Int32, shape),
            data: TensorData::Int32(values),
        }
    }

    pub fn spec(&self) -> &TensorSpec {
        &self.spec
    }

    pub fn element_type(&self) -> ElementType {
        self.spec.element_type
    }

    pub fn shape(&self) -> &[usize] {
        &self.spec.shape
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut TensorData {
        &mut self.data
    }

    /// Bytes actually held by the buffer.
    pub fn byte_len(&self) -> usize {
        self.data.byte_len()
    }
}
