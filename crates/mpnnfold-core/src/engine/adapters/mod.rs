//! Seams around the two external models.
//!
//! The pipeline only ever talks to a [`SequenceDesigner`] and a [`StructurePredictor`]; what
//! sits behind them is opaque. [`worker`] provides implementations that drive long-lived
//! model processes over a line-delimited JSON protocol:
//!
//! ```text
//! -> {"op":"design","model_name":"v_48_020","pdb_path":"6MRR.pdb","chains":"A",...}
//! <- {"status":"ok","result":{"sequences":[{"seq":"MKV...","score":1.02,"seqid":0.41,"profile":[[...]]}]}}
//! -> {"op":"prepare","pdb_path":"6MRR.pdb","chains":"A","best_metric":"dgram_cce",...}
//! <- {"status":"ok","result":{"length":68}}
//! -> {"op":"predict","seq":"MKV...","num_recycles":1,"num_models":1}
//! <- {"status":"ok","result":{"rmsd":1.1,"ptm":0.71,"plddt":0.88,"best_metric":0.52,"pdb":"ATOM ..."}}
//! <- {"status":"error","message":"..."}
//! ```

pub mod worker;

use super::config::{DesignConfig, PredictionConfig};
use super::error::EngineError;
use crate::core::models::backbone::Backbone;
use crate::core::models::design::DesignCandidate;
use crate::core::models::prediction::{BestMetric, PredictionResult};
use crate::core::utils::identifiers::ChainSelection;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything the designer needs for one sampling call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignRequest {
    pub model_name: String,
    pub pdb_path: PathBuf,
    pub chains: ChainSelection,
    pub homooligomer: bool,
    pub num: usize,
    pub batch: usize,
    pub temperature: f64,
    /// Sequence identity against the input is only recomputed for homooligomers.
    pub rescore: bool,
    pub fix_pos: Option<String>,
    pub rm_aa: Option<String>,
    pub inverse: bool,
}

/// The structural context a predictor is prepared against, fixed for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionTarget {
    pub pdb_path: PathBuf,
    pub chains: ChainSelection,
    pub homooligomer: bool,
    pub use_multimer: bool,
    pub use_templates: bool,
    pub rm_template_interchain: bool,
    pub best_metric: BestMetric,
    pub params_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    #[serde(rename = "seq")]
    pub sequence: String,
    pub num_recycles: usize,
    pub num_models: usize,
}

impl DesignRequest {
    pub fn new(backbone: &Backbone, design: &DesignConfig) -> Self {
        Self {
            model_name: design.model_name.clone(),
            pdb_path: backbone.path().to_path_buf(),
            chains: backbone.chains().clone(),
            homooligomer: backbone.is_homooligomer(),
            num: design.num_sequences,
            batch: design.batch_size,
            temperature: design.temperature,
            rescore: backbone.is_homooligomer(),
            fix_pos: design.fixed_positions.clone(),
            rm_aa: design.omit_residues.clone(),
            inverse: false,
        }
    }
}

impl PredictionTarget {
    pub fn new(backbone: &Backbone, prediction: &PredictionConfig, params_dir: &Path) -> Self {
        Self {
            pdb_path: backbone.path().to_path_buf(),
            chains: backbone.chains().clone(),
            homooligomer: backbone.is_homooligomer(),
            use_multimer: prediction.use_multimer,
            use_templates: prediction.use_templates,
            rm_template_interchain: prediction.rm_template_interchain,
            best_metric: prediction.best_metric,
            params_dir: params_dir.to_path_buf(),
        }
    }
}

/// Samples sequences for a backbone.
pub trait SequenceDesigner {
    /// Short human-readable name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Produces exactly `request.num` candidates in one call.
    fn design(&mut self, request: &DesignRequest) -> Result<Vec<DesignCandidate>, EngineError>;
}

/// Predicts structures for sequences designed on a backbone.
pub trait StructurePredictor {
    fn name(&self) -> &'static str;

    /// Configures structural and template options for all later predictions and returns the
    /// backbone residue length that sequences are truncated to.
    fn prepare(&mut self, target: &PredictionTarget) -> Result<usize, EngineError>;

    fn predict(&mut self, request: &PredictionRequest) -> Result<PredictionResult, EngineError>;
}

impl<T: SequenceDesigner + ?Sized> SequenceDesigner for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn design(&mut self, request: &DesignRequest) -> Result<Vec<DesignCandidate>, EngineError> {
        (**self).design(request)
    }
}

impl<T: StructurePredictor + ?Sized> StructurePredictor for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn prepare(&mut self, target: &PredictionTarget) -> Result<usize, EngineError> {
        (**self).prepare(target)
    }

    fn predict(&mut self, request: &PredictionRequest) -> Result<PredictionResult, EngineError> {
        (**self).predict(request)
    }
}
