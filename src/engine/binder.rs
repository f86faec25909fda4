// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Tensor I/O binding: token sequences in, decoded results out.

use super::error::EngineError;
use super::tensor::{ElementType, Tensor, TensorData};
use super::tokenizer::TokenSequence;

/// Values read from an integer output before giving up.
pub const MAX_TEXT_VALUES: usize = 10;

/// Copy `tokens` into an input tensor.
///
/// Int32 inputs receive the ids as-is, Float32 inputs receive them cast.
/// Copies at most `min(tokens, byte_len / element_size)` elements and
/// returns the count.
pub fn bind_input(tensor: &mut Tensor, tokens: &TokenSequence) -> Result<usize, EngineError> {
    let element_type = tensor.element_type();
    let capacity = tensor.byte_len() / element_type.size();
    let count = tokens.len().min(capacity);
    let src = &tokens.as_slice()[..count];

    match tensor.data_mut() {
        TensorData::Int32(dst) => {
            dst[..count].copy_from_slice(src);
        }
        TensorData::Float32(dst) => {
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = s as f32;
            }
        }
        TensorData::Raw(_) => return Err(EngineError::UnsupportedTensorType(element_type)),
    }
    Ok(count)
}

/// Result of decoding the first output tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedOutput {
    /// Arg-max over the last position of a `[batch, seq, vocab]` tensor.
    NextToken { index: usize, score: f32 },
    /// Arg-max over a flattened float buffer.
    Token { index: usize, score: f32 },
    /// Printable ASCII read from an integer buffer.
    Text(String),
    Empty,
    Unsupported(ElementType),
}

impl DecodedOutput {
    /// User-visible rendering prefixed by the engine label.
    pub fn render(&self, label: &str) -> String {
        match self {
            DecodedOutput::NextToken { index, score } => {
                format!("{label} response (next token {index}, score: {score:.3})")
            }
            DecodedOutput::Token { index, score } => {
                format!("{label} response (token {index}, score: {score:.3})")
            }
            DecodedOutput::Text(text) => format!("{label} response: {text}"),
            DecodedOutput::Empty => format!("{label} response (empty output)"),
            DecodedOutput::Unsupported(ty) => {
                format!("{label} response (unsupported output type: {ty})")
            }
        }
    }
}

/// Index and value of the maximum; the first occurrence wins ties.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let (&first, rest) = values.split_first()?;
    let mut best = (0, first);
    for (i, &v) in rest.iter().enumerate() {
        if v > best.1 {
            best = (i + 1, v);
        }
    }
    Some(best)
}

/// Decode an output tensor into a [`DecodedOutput`].
pub fn decode_output(tensor: &Tensor) -> DecodedOutput {
    if let Some(decoded) = decode_last_position(tensor) {
        return decoded;
    }

    match tensor.data() {
        TensorData::Float32(values) => match argmax(values) {
            Some((index, score)) => DecodedOutput::Token { index, score },
            None => DecodedOutput::Empty,
        },
        TensorData::Int32(values) => {
            if values.is_empty() {
                return DecodedOutput::Empty;
            }
            let text = values
                .iter()
                .take(MAX_TEXT_VALUES)
                .filter(|&&v| (1..=127).contains(&v))
                .map(|&v| char::from(v as u8))
                .collect();
            DecodedOutput::Text(text)
        }
        TensorData::Raw(_) => DecodedOutput::Unsupported(tensor.element_type()),
    }
}

/// Rank-3 `[b, t, v]` scores: arg-max over the vocabulary at position `t - 1`.
fn decode_last_position(tensor: &Tensor) -> Option<DecodedOutput> {
    let &[batch, seq, vocab] = tensor.shape() else {
        return None;
    };
    if batch < 1 || seq < 1 || vocab == 0 {
        return None;
    }
    let start = (seq - 1) * vocab;
    let end = start + vocab;

    let (index, score) = match tensor.data() {
        TensorData::Float32(values) if values.len() >= end => argmax(&values[start..end])?,
        TensorData::Int32(values) if values.len() >= end => {
            let row: Vec<f32> = values[start..end].iter().map(|&v| v as f32).collect();
            argmax(&row)?
        }
        _ => return None,
    };
    Some(DecodedOutput::NextToken { index, score })
}
