//! # Engine Module
//!
//! The stateful machinery behind a design-and-evaluation run.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - the immutable run configuration and its builder
//! - **Error Handling** ([`error`]) - the failure taxonomy shared by every stage
//! - **Progress Monitoring** ([`progress`]) - phase and transfer events for user feedback
//! - **Resource Fetching** ([`fetch`]) - backbone resolution and parameter-archive caching
//! - **Model Adapters** ([`adapters`]) - the `SequenceDesigner` / `StructurePredictor` seams
//!   and their external-worker implementations
//! - **Result Tracking** ([`state`]) - the best-prediction accumulator
//!
//! Everything here is synchronous: each call blocks until the download, extraction or model
//! invocation behind it has finished.

pub mod adapters;
pub mod config;
pub mod error;
pub mod fetch;
pub mod progress;
pub mod state;
