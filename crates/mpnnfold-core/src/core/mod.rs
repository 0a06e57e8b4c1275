//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Data models** ([`models`]) - backbones, chain selections, design candidates and
//!   prediction results
//! - **Residue alphabet** ([`utils`]) - the residue ordering used by design profiles and the
//!   arg-max decoding of per-position distributions
//! - **Result files** ([`io`]) - FASTA records, predicted structures and metric tables

pub mod io;
pub mod models;
pub mod utils;
