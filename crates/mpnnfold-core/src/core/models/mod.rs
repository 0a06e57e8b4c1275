//! Data models passed between the pipeline stages.
//!
//! Everything here is created once and never mutated afterwards: a [`backbone::Backbone`] is
//! resolved at pipeline start, a batch of [`design::DesignCandidate`]s comes out of a single
//! sampling call, and each [`prediction::PredictionResult`] belongs to exactly one prediction.

pub mod backbone;
pub mod design;
pub mod prediction;
