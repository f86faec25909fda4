//! Inference engine module for Mobile AI Core.
//!
//! Handles model loading, tokenization, tensor binding, and output decoding.
//! Provides the `EngineAdapter` trait and the two engine adapters.

pub mod adapter;
pub mod binder;
pub mod error;
pub mod handle;
pub mod performance;
pub mod runtime;
pub mod tensor;
pub mod tokenizer;

pub use adapter::{AdapterCore, AdapterSettings, BackendKind, EngineAdapter, EngineStatus};
pub use adapter::{FallbackEngine, GpuEngine, NOT_INITIALIZED, PROBE_INPUT, WARM_UP_INPUT};
pub use binder::{DecodedOutput, MAX_TEXT_VALUES};
pub use error::EngineError;
pub use handle::{EngineHandle, ModelBuffer};
pub use tensor::{ElementType, Tensor, TensorData, TensorSpec};
pub use tokenizer::{TokenSequence, Tokenizer, TokenizerPolicy};
