//! # Workflows Module
//!
//! Top-level entry points that string the engine together into complete runs.
//!
//! - **Design Workflow** ([`design`]) - resolves a backbone, samples sequences for it,
//!   predicts structures for a bounded subset of them and writes the results.

pub mod design;
