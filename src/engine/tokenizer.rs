// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Fixed-length character tokenizer shared by the engine adapters.
//!
//! Each character maps to its Unicode scalar value. The sequence is always
//! exactly `max_len` long: zero-padded at the tail or truncated.

use serde::{Deserialize, Serialize};

pub const PAD_TOKEN: i32 = 0;
pub const BOS_TOKEN: i32 = 1;
pub const EOS_TOKEN: i32 = 2;

/// Per-engine tokenization policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerPolicy {
    /// Exact output length L.
    pub max_len: usize,
    /// Prepend the BOS marker.
    pub add_bos: bool,
    /// Append the EOS marker (may be cut by truncation).
    pub add_eos: bool,
    /// Drop everything outside printable ASCII (32..=126).
    pub printable_only: bool,
}

impl TokenizerPolicy {
    /// Policy of the primary GPU engine: raw characters, L = 128.
    pub fn gpu_default() -> Self {
        Self { max_len: 128, add_bos: false, add_eos: false, printable_only: false }
    }

    /// Policy of the accelerated fallback engine: markers, printable ASCII, L = 512.
    pub fn fallback_default() -> Self {
        Self { max_len: 512, add_bos: true, add_eos: true, printable_only: true }
    }
}

impl Default for TokenizerPolicy {
    fn default() -> Self {
        Self::gpu_default()
    }
}

/// Token ids of exactly the policy's length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence(Vec<i32>);

impl TokenSequence {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    /// Count of tokens before the padding starts.
    pub fn content_len(&self) -> usize {
        self.0.iter().rposition(|&t| t != PAD_TOKEN).map_or(0, |i| i + 1)
    }
}

/// Text to token converter.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    policy: TokenizerPolicy,
}

impl Tokenizer {
    pub fn new(policy: TokenizerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TokenizerPolicy {
        &self.policy
    }

    pub fn max_len(&self) -> usize {
        self.policy.max_len
    }

    /// Encode `text` into a sequence of exactly `max_len` tokens.
    pub fn encode(&self, text: &str) -> TokenSequence {
        let mut tokens = Vec::with_capacity(self.policy.max_len);
        if self.policy.add_bos {
            tokens.push(BOS_TOKEN);
        }

        let filtered = text
            .chars()
            .filter(|c| !self.policy.printable_only || (' '..='~').contains(c))
            .map(|c| c as u32 as i32);
        // +1 leaves room to detect truncation without walking the whole input.
        tokens.extend(filtered.take(self.policy.max_len + 1));

        if self.policy.add_eos {
            tokens.push(EOS_TOKEN);
        }

        tokens.resize(self.policy.max_len, PAD_TOKEN);
        TokenSequence(tokens)
    }
}
