//! # mpnnfold Core Library
//!
//! Chains a sequence-design model and a structure-prediction model: sample candidate
//! amino-acid sequences for a fixed protein backbone, then check how well each candidate
//! folds back into that backbone.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split used throughout the project:
//!
//! - **[`core`]: The Foundation.** Plain data models (`Backbone`, `DesignCandidate`,
//!   `PredictionResult`), residue alphabet handling, and result-file writers.
//!
//! - **[`engine`]: The Logic Core.** Configuration, the error taxonomy, progress reporting,
//!   resource fetching with on-disk caching, the `SequenceDesigner` / `StructurePredictor`
//!   seams and their external-worker implementations, and best-result tracking.
//!
//! - **[`workflows`]: The Public API.** The end-to-end design-and-evaluation pipeline that
//!   ties `engine` and `core` together.
//!
//! The models themselves are never reimplemented here. They are opaque collaborators reached
//! through the adapter traits, which keeps the orchestration testable with deterministic fakes.

pub mod core;
pub mod engine;
pub mod workflows;
