//! # ML Token Tagger
//!
//! Joint sequence labeling over source-code token streams: a transformer and
//! a recurrent tagger predict AST node type, symbol role, and error category
//! for every token position, trained with padding-aware masking and early
//! stopping via the Burn ML framework.
//!
//! ## Modules
//!
//! - [`data`] — Labeled token samples: JSONL corpus, synthetic generator, batching
//! - [`model`] — The `SequenceTagger` trait, transformer and BiLSTM taggers, head slicing
//! - [`training`] — Epoch loop, masked loss/accuracy, early stopping
//! - [`checkpoint`] — Model persistence and pruning
//! - [`tracking`] — Per-run config snapshots and JSONL metric streams
//! - [`config`] — TOML configuration loading and validation
//! - [`error`] — Structured error types

#![recursion_limit = "256"]

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod tracking;
pub mod training;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu<f32, i32>;

#[cfg(all(feature = "ndarray", not(feature = "wgpu")))]
pub type DefaultBackend = burn::backend::NdArray<f32>;

#[cfg(not(any(feature = "ndarray", feature = "wgpu")))]
compile_error!("enable at least one backend feature: `ndarray` or `wgpu`");

pub type DefaultAutodiffBackend = burn::backend::Autodiff<DefaultBackend>;

pub fn default_device() -> <DefaultBackend as burn::prelude::Backend>::Device {
    Default::default()
}
