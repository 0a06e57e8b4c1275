pub mod defaults;

use self::defaults::DefaultsConfig;
use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use mpnnfold::core::models::prediction::BestMetric;
use mpnnfold::engine::adapters::worker::WorkerCommand;
use mpnnfold::engine::config::{ConfigError, PipelineConfig, PipelineConfigBuilder, ResourceConfig};
use serde::Deserialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Everything the `run` command needs after all configuration layers are merged.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub designer_command: WorkerCommand,
    pub predictor_command: WorkerCommand,
}

/// Cache and download locations given directly on the command line.
#[derive(Debug, Default, Clone)]
pub struct ResourceOverrides {
    pub params_dir: Option<PathBuf>,
    pub params_url: Option<String>,
    pub structure_cache_dir: Option<PathBuf>,
    pub structure_url_template: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialDesignConfig {
    model_name: Option<String>,
    structure: Option<String>,
    chains: Option<String>,
    homooligomer: Option<bool>,
    num_sequences: Option<usize>,
    batch_size: Option<usize>,
    temperature: Option<f64>,
    fixed_positions: Option<String>,
    omit_residues: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialPredictionConfig {
    num_models: Option<usize>,
    num_recycles: Option<usize>,
    max_predictions: Option<usize>,
    use_multimer: Option<bool>,
    use_templates: Option<bool>,
    rm_template_interchain: Option<bool>,
    best_metric: Option<BestMetric>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialResourceConfig {
    params_dir: Option<PathBuf>,
    params_url: Option<String>,
    structure_cache_dir: Option<PathBuf>,
    structure_url_template: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialWorkerConfig {
    designer_command: Option<Vec<String>>,
    predictor_command: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    design: Option<PartialDesignConfig>,
    prediction: Option<PartialPredictionConfig>,
    resources: Option<PartialResourceConfig>,
    output: Option<PartialOutputConfig>,
    workers: Option<PartialWorkerConfig>,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads `path` if given, otherwise starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Layers `-S` overrides and explicit flags over the file values, fills the gaps from
    /// [`DefaultsConfig`] and validates the result.
    ///
    /// `default_params_dir` is only consulted when no parameter directory was configured.
    pub fn merge_with_cli(
        mut self,
        args: &RunArgs,
        default_params_dir: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<AppConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let design = self.design.take().unwrap_or_default();
        let prediction = self.prediction.take().unwrap_or_default();
        let resources = self.resources.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();
        let workers = self.workers.take().unwrap_or_default();

        let params_dir = match args.params_dir.clone().or(resources.params_dir) {
            Some(dir) => dir,
            None => default_params_dir()?,
        };

        let mut builder = PipelineConfigBuilder::new()
            .model_name(design.model_name.unwrap_or(defaults.model_name))
            .structure(
                args.structure
                    .clone()
                    .or(design.structure)
                    .unwrap_or(defaults.structure),
            )
            .chains(
                args.chains
                    .clone()
                    .or(design.chains)
                    .unwrap_or(defaults.chains),
            )
            .homooligomer(
                args.homooligomer
                    .resolve()
                    .or(design.homooligomer)
                    .unwrap_or(false),
            )
            .num_sequences(
                args.num_sequences
                    .or(design.num_sequences)
                    .unwrap_or(defaults.num_sequences),
            )
            .batch_size(design.batch_size)
            .temperature(
                args.temperature
                    .or(design.temperature)
                    .unwrap_or(defaults.temperature),
            )
            .fixed_positions(design.fixed_positions)
            .omit_residues(design.omit_residues)
            .num_models(
                args.num_models
                    .or(prediction.num_models)
                    .unwrap_or(defaults.num_models),
            )
            .num_recycles(
                args.num_recycles
                    .or(prediction.num_recycles)
                    .unwrap_or(defaults.num_recycles),
            )
            .max_predictions(
                args.max_predictions
                    .or(prediction.max_predictions)
                    .unwrap_or(defaults.max_predictions),
            )
            .use_multimer(
                args.multimer
                    .resolve()
                    .or(prediction.use_multimer)
                    .unwrap_or(false),
            )
            .use_templates(
                args.templates
                    .resolve()
                    .or(prediction.use_templates)
                    .unwrap_or(false),
            )
            .rm_template_interchain(prediction.rm_template_interchain.unwrap_or(false))
            .best_metric(prediction.best_metric.unwrap_or_default())
            .params_dir(params_dir)
            .output_dir(
                args.output_dir
                    .clone()
                    .or(output.dir)
                    .unwrap_or_else(|| PathBuf::from(defaults.output_dir)),
            );

        if let Some(url) = resources.params_url {
            builder = builder.params_url(url);
        }
        if let Some(dir) = resources.structure_cache_dir {
            builder = builder.structure_cache_dir(dir);
        }
        if let Some(template) = resources.structure_url_template {
            builder = builder.structure_url_template(template);
        }

        let pipeline = builder.build().map_err(config_error)?;

        let designer_command = worker_command(
            "workers.designer-command",
            workers
                .designer_command
                .unwrap_or(defaults.designer_command),
        )?;
        let predictor_command = worker_command(
            "workers.predictor-command",
            workers
                .predictor_command
                .unwrap_or(defaults.predictor_command),
        )?;

        Ok(AppConfig {
            pipeline,
            designer_command,
            predictor_command,
        })
    }

    /// Resolves only the `[resources]` section, for the commands that manage caches.
    ///
    /// Explicit command-line locations win over the file.
    pub fn into_resources(
        self,
        overrides: ResourceOverrides,
        default_params_dir: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<ResourceConfig> {
        let resources = self.resources.unwrap_or_default();
        let params_dir = match overrides.params_dir.or(resources.params_dir) {
            Some(dir) => dir,
            None => default_params_dir()?,
        };

        let mut builder = PipelineConfigBuilder::new().params_dir(params_dir);
        if let Some(url) = overrides.params_url.or(resources.params_url) {
            builder = builder.params_url(url);
        }
        if let Some(dir) = overrides
            .structure_cache_dir
            .or(resources.structure_cache_dir)
        {
            builder = builder.structure_cache_dir(dir);
        }
        if let Some(template) = overrides
            .structure_url_template
            .or(resources.structure_url_template)
        {
            builder = builder.structure_url_template(template);
        }
        builder.build_resources().map_err(config_error)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            let design = || PartialDesignConfig::default();
            let prediction = || PartialPredictionConfig::default();
            let resources = || PartialResourceConfig::default();

            match key {
                "design.model-name" => {
                    self.design.get_or_insert_with(design).model_name = Some(value.to_string());
                }
                "design.structure" => {
                    self.design.get_or_insert_with(design).structure = Some(value.to_string());
                }
                "design.chains" => {
                    self.design.get_or_insert_with(design).chains = Some(value.to_string());
                }
                "design.homooligomer" => {
                    self.design.get_or_insert_with(design).homooligomer =
                        Some(parse_value(key, value)?);
                }
                "design.num-sequences" => {
                    self.design.get_or_insert_with(design).num_sequences =
                        Some(parse_value(key, value)?);
                }
                "design.batch-size" => {
                    self.design.get_or_insert_with(design).batch_size =
                        Some(parse_value(key, value)?);
                }
                "design.temperature" => {
                    self.design.get_or_insert_with(design).temperature =
                        Some(parse_value(key, value)?);
                }
                "design.fixed-positions" => {
                    self.design.get_or_insert_with(design).fixed_positions =
                        Some(value.to_string());
                }
                "design.omit-residues" => {
                    self.design.get_or_insert_with(design).omit_residues = Some(value.to_string());
                }
                "prediction.num-models" => {
                    self.prediction.get_or_insert_with(prediction).num_models =
                        Some(parse_value(key, value)?);
                }
                "prediction.num-recycles" => {
                    self.prediction.get_or_insert_with(prediction).num_recycles =
                        Some(parse_value(key, value)?);
                }
                "prediction.max-predictions" => {
                    self.prediction.get_or_insert_with(prediction).max_predictions =
                        Some(parse_value(key, value)?);
                }
                "prediction.use-multimer" => {
                    self.prediction.get_or_insert_with(prediction).use_multimer =
                        Some(parse_value(key, value)?);
                }
                "prediction.use-templates" => {
                    self.prediction.get_or_insert_with(prediction).use_templates =
                        Some(parse_value(key, value)?);
                }
                "prediction.rm-template-interchain" => {
                    self.prediction
                        .get_or_insert_with(prediction)
                        .rm_template_interchain = Some(parse_value(key, value)?);
                }
                "prediction.best-metric" => {
                    self.prediction.get_or_insert_with(prediction).best_metric =
                        Some(parse_value(key, value)?);
                }
                "resources.params-dir" => {
                    self.resources.get_or_insert_with(resources).params_dir =
                        Some(PathBuf::from(value));
                }
                "resources.params-url" => {
                    self.resources.get_or_insert_with(resources).params_url =
                        Some(value.to_string());
                }
                "resources.structure-cache-dir" => {
                    self.resources
                        .get_or_insert_with(resources)
                        .structure_cache_dir = Some(PathBuf::from(value));
                }
                "resources.structure-url-template" => {
                    self.resources
                        .get_or_insert_with(resources)
                        .structure_url_template = Some(value.to_string());
                }
                "output.dir" => {
                    self.output.get_or_insert_with(Default::default).dir =
                        Some(PathBuf::from(value));
                }
                "workers.designer-command" => {
                    self.workers
                        .get_or_insert_with(Default::default)
                        .designer_command = Some(split_command(value));
                }
                "workers.predictor-command" => {
                    self.workers
                        .get_or_insert_with(Default::default)
                        .predictor_command = Some(split_command(value));
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e| {
        CliError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e))
    })
}

fn config_error(e: ConfigError) -> CliError {
    match e {
        ConfigError::InvalidIdentifier(_) => CliError::Engine(e.into()),
        other => CliError::Config(other.to_string()),
    }
}

fn split_command(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

fn worker_command(key: &str, argv: Vec<String>) -> Result<WorkerCommand> {
    WorkerCommand::from_argv(&argv)
        .ok_or_else(|| CliError::Config(format!("`{}` must name a program to run.", key)))
}
