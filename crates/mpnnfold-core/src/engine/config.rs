use super::fetch::{DEFAULT_PARAMS_URL, DEFAULT_STRUCTURE_URL_TEMPLATE};
use crate::core::models::prediction::BestMetric;
use crate::core::utils::alphabet::is_canonical_residue;
use crate::core::utils::identifiers::{ChainSelection, IdentifierError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest batch the sequence designer samples in one pass.
pub const MAX_DESIGN_BATCH: usize = 32;
/// Number of model parameter sets shipped in the prediction archive.
pub const MAX_PREDICTION_MODELS: usize = 5;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },

    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesignConfig {
    pub model_name: String,
    /// Local structure path or 4-character structure code.
    pub structure: String,
    pub chains: ChainSelection,
    pub homooligomer: bool,
    pub num_sequences: usize,
    pub batch_size: usize,
    pub temperature: f64,
    pub fixed_positions: Option<String>,
    pub omit_residues: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    pub num_models: usize,
    pub num_recycles: usize,
    /// Cap on how many designs are sent to the predictor.
    pub max_predictions: usize,
    pub use_multimer: bool,
    pub use_templates: bool,
    pub rm_template_interchain: bool,
    pub best_metric: BestMetric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceConfig {
    pub params_dir: PathBuf,
    pub params_url: String,
    pub structure_cache_dir: PathBuf,
    pub structure_url_template: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl OutputConfig {
    pub fn fasta_path(&self) -> PathBuf {
        self.dir.join("design.fasta")
    }

    pub fn structure_dir(&self) -> PathBuf {
        self.dir.join("all_pdb")
    }

    pub fn design_structure_path(&self, index: usize) -> PathBuf {
        self.structure_dir().join(format!("design_{}.pdb", index))
    }

    pub fn best_structure_path(&self) -> PathBuf {
        self.dir.join("best.pdb")
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.dir.join("metrics.csv")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub design: DesignConfig,
    pub prediction: PredictionConfig,
    pub resources: ResourceConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Number of designs that will be evaluated: `min(max_predictions, num_sequences)`.
    pub fn predictions_to_run(&self) -> usize {
        self.prediction
            .max_predictions
            .min(self.design.num_sequences)
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    model_name: Option<String>,
    structure: Option<String>,
    chains: Option<String>,
    homooligomer: bool,
    num_sequences: Option<usize>,
    batch_size: Option<usize>,
    temperature: Option<f64>,
    fixed_positions: Option<String>,
    omit_residues: Option<String>,
    num_models: Option<usize>,
    num_recycles: Option<usize>,
    max_predictions: Option<usize>,
    use_multimer: bool,
    use_templates: bool,
    rm_template_interchain: bool,
    best_metric: BestMetric,
    params_dir: Option<PathBuf>,
    params_url: Option<String>,
    structure_cache_dir: Option<PathBuf>,
    structure_url_template: Option<String>,
    output_dir: Option<PathBuf>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }
    pub fn structure(mut self, structure: impl Into<String>) -> Self {
        self.structure = Some(structure.into());
        self
    }
    pub fn chains(mut self, chains: impl Into<String>) -> Self {
        self.chains = Some(chains.into());
        self
    }
    pub fn homooligomer(mut self, flag: bool) -> Self {
        self.homooligomer = flag;
        self
    }
    pub fn num_sequences(mut self, n: usize) -> Self {
        self.num_sequences = Some(n);
        self
    }
    pub fn batch_size(mut self, size: Option<usize>) -> Self {
        self.batch_size = size;
        self
    }
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
    pub fn fixed_positions(mut self, positions: Option<String>) -> Self {
        self.fixed_positions = positions;
        self
    }
    pub fn omit_residues(mut self, residues: Option<String>) -> Self {
        self.omit_residues = residues;
        self
    }
    pub fn num_models(mut self, n: usize) -> Self {
        self.num_models = Some(n);
        self
    }
    pub fn num_recycles(mut self, n: usize) -> Self {
        self.num_recycles = Some(n);
        self
    }
    pub fn max_predictions(mut self, n: usize) -> Self {
        self.max_predictions = Some(n);
        self
    }
    pub fn use_multimer(mut self, flag: bool) -> Self {
        self.use_multimer = flag;
        self
    }
    pub fn use_templates(mut self, flag: bool) -> Self {
        self.use_templates = flag;
        self
    }
    pub fn rm_template_interchain(mut self, flag: bool) -> Self {
        self.rm_template_interchain = flag;
        self
    }
    pub fn best_metric(mut self, metric: BestMetric) -> Self {
        self.best_metric = metric;
        self
    }
    pub fn params_dir(mut self, path: PathBuf) -> Self {
        self.params_dir = Some(path);
        self
    }
    pub fn params_url(mut self, url: impl Into<String>) -> Self {
        self.params_url = Some(url.into());
        self
    }
    pub fn structure_cache_dir(mut self, path: PathBuf) -> Self {
        self.structure_cache_dir = Some(path);
        self
    }
    pub fn structure_url_template(mut self, template: impl Into<String>) -> Self {
        self.structure_url_template = Some(template.into());
        self
    }
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = Some(path);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let raw_chains = self
            .chains
            .ok_or(ConfigError::MissingParameter("chains"))?;
        let chains = ChainSelection::parse(&raw_chains)?;

        let num_sequences = self
            .num_sequences
            .ok_or(ConfigError::MissingParameter("num_sequences"))?;
        ensure_at_least_one("num_sequences", num_sequences)?;

        let batch_size = self
            .batch_size
            .unwrap_or_else(|| num_sequences.min(MAX_DESIGN_BATCH));
        if !(1..=MAX_DESIGN_BATCH).contains(&batch_size) {
            return Err(invalid(
                "batch_size",
                format!("must be between 1 and {}, got {}", MAX_DESIGN_BATCH, batch_size),
            ));
        }

        if let Some(residues) = &self.omit_residues {
            if let Some(bad) = residues.chars().find(|c| !is_canonical_residue(*c)) {
                return Err(invalid(
                    "omit_residues",
                    format!("'{}' is not a standard one-letter residue code", bad),
                ));
            }
        }

        let design = DesignConfig {
            model_name: self
                .model_name
                .ok_or(ConfigError::MissingParameter("model_name"))?,
            structure: self
                .structure
                .ok_or(ConfigError::MissingParameter("structure"))?,
            chains,
            homooligomer: self.homooligomer,
            num_sequences,
            batch_size,
            temperature: self
                .temperature
                .ok_or(ConfigError::MissingParameter("temperature"))?,
            fixed_positions: self.fixed_positions.filter(|s| !s.trim().is_empty()),
            omit_residues: self.omit_residues.filter(|s| !s.is_empty()),
        };

        let num_models = self
            .num_models
            .ok_or(ConfigError::MissingParameter("num_models"))?;
        if !(1..=MAX_PREDICTION_MODELS).contains(&num_models) {
            return Err(invalid(
                "num_models",
                format!(
                    "must be between 1 and {}, got {}",
                    MAX_PREDICTION_MODELS, num_models
                ),
            ));
        }
        let num_recycles = self
            .num_recycles
            .ok_or(ConfigError::MissingParameter("num_recycles"))?;
        ensure_at_least_one("num_recycles", num_recycles)?;
        let max_predictions = self
            .max_predictions
            .ok_or(ConfigError::MissingParameter("max_predictions"))?;
        ensure_at_least_one("max_predictions", max_predictions)?;

        let prediction = PredictionConfig {
            num_models,
            num_recycles,
            max_predictions,
            use_multimer: self.use_multimer,
            use_templates: self.use_templates,
            rm_template_interchain: self.rm_template_interchain,
            best_metric: self.best_metric,
        };

        let resources = resolve_resources(
            self.params_dir,
            self.params_url,
            self.structure_cache_dir,
            self.structure_url_template,
        )?;

        let output = OutputConfig {
            dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
        };

        Ok(PipelineConfig {
            design,
            prediction,
            resources,
            output,
        })
    }
}

impl PipelineConfigBuilder {
    /// Builds only the cache and download locations, for callers that never run the pipeline.
    pub fn build_resources(self) -> Result<ResourceConfig, ConfigError> {
        resolve_resources(
            self.params_dir,
            self.params_url,
            self.structure_cache_dir,
            self.structure_url_template,
        )
    }
}

fn resolve_resources(
    params_dir: Option<PathBuf>,
    params_url: Option<String>,
    structure_cache_dir: Option<PathBuf>,
    structure_url_template: Option<String>,
) -> Result<ResourceConfig, ConfigError> {
    let structure_url_template =
        structure_url_template.unwrap_or_else(|| DEFAULT_STRUCTURE_URL_TEMPLATE.to_string());
    if !structure_url_template.contains("{id}") {
        return Err(invalid(
            "structure_url_template",
            "must contain the '{id}' placeholder",
        ));
    }

    Ok(ResourceConfig {
        params_dir: params_dir.ok_or(ConfigError::MissingParameter("params_dir"))?,
        params_url: params_url.unwrap_or_else(|| DEFAULT_PARAMS_URL.to_string()),
        structure_cache_dir: structure_cache_dir.unwrap_or_else(|| Path::new(".").to_path_buf()),
        structure_url_template,
    })
}

fn invalid(parameter: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.to_string(),
    }
}

fn ensure_at_least_one(parameter: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(invalid(parameter, "must be at least 1"))
    } else {
        Ok(())
    }
}
