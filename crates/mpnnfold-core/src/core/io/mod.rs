//! Writers (and a reader for FASTA) for the files a pipeline run leaves behind.
//!
//! All formats share the [`traits::ResultFile`] interface so the workflow persists
//! sequences, structures and metric tables the same way.

pub mod fasta;
pub mod metrics;
pub mod structure;
pub mod traits;
