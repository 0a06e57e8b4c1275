use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "mpnnfold - design sequences for a protein backbone and score them by structure prediction.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Design sequences for a backbone and predict structures for the best candidates.
    Run(RunArgs),
    /// Manage the cached structure-prediction model parameters.
    Params(ParamsArgs),
    /// Resolve a structure code or path into the local structure cache.
    Fetch(FetchArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Design Overrides ---
    /// Backbone to design on: a local structure file or a 4-character structure code.
    #[arg(short = 'i', long, value_name = "ID_OR_PATH")]
    pub structure: Option<String>,

    /// Chains to design, separated by any non-letter characters (e.g. "A,B").
    #[arg(long, value_name = "CHAINS")]
    pub chains: Option<String>,

    /// Override `design.homooligomer` from the config file.
    #[command(flatten)]
    pub homooligomer: HomooligomerFlags,

    /// Number of sequences to sample.
    #[arg(short, long, value_name = "INT")]
    pub num_sequences: Option<usize>,

    /// Sampling temperature; lower is more deterministic.
    #[arg(short, long, value_name = "FLOAT")]
    pub temperature: Option<f64>,

    // --- Prediction Overrides ---
    /// Number of structure-prediction models to run per design.
    #[arg(long, value_name = "INT")]
    pub num_models: Option<usize>,

    /// Number of recycle iterations per prediction.
    #[arg(long, value_name = "INT")]
    pub num_recycles: Option<usize>,

    /// Override `prediction.use-multimer` from the config file.
    #[command(flatten)]
    pub multimer: MultimerFlags,

    /// Override `prediction.use-templates` from the config file.
    #[command(flatten)]
    pub templates: TemplateFlags,

    /// Maximum number of designs sent to structure prediction.
    #[arg(short = 'k', long, value_name = "INT")]
    pub max_predictions: Option<usize>,

    // --- Paths ---
    /// Directory that receives the FASTA file and predicted structures.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory holding the unpacked model parameters.
    #[arg(long, value_name = "DIR")]
    pub params_dir: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S prediction.best-metric=plddt
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Mutually exclusive flags for treating the backbone as a homooligomer.
#[derive(Args, Debug, Default, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct HomooligomerFlags {
    /// Treat the backbone as a homooligomer.
    #[arg(long)]
    pub homooligomer: bool,
    /// Treat the backbone as a single copy, even if the config file says otherwise.
    #[arg(long)]
    pub no_homooligomer: bool,
}

impl HomooligomerFlags {
    pub fn resolve(self) -> Option<bool> {
        resolve_toggle(self.homooligomer, self.no_homooligomer)
    }
}

/// Mutually exclusive flags for the multimer prediction model.
#[derive(Args, Debug, Default, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct MultimerFlags {
    /// Predict with the multimer model.
    #[arg(long)]
    pub multimer: bool,
    /// Predict with the monomer model.
    #[arg(long)]
    pub no_multimer: bool,
}

impl MultimerFlags {
    pub fn resolve(self) -> Option<bool> {
        resolve_toggle(self.multimer, self.no_multimer)
    }
}

/// Mutually exclusive flags for using the backbone as a structural template.
#[derive(Args, Debug, Default, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct TemplateFlags {
    /// Use the backbone as a template during prediction.
    #[arg(long)]
    pub templates: bool,
    /// Predict without templates.
    #[arg(long)]
    pub no_templates: bool,
}

impl TemplateFlags {
    pub fn resolve(self) -> Option<bool> {
        resolve_toggle(self.templates, self.no_templates)
    }
}

fn resolve_toggle(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

/// Arguments for the `params` subcommand.
#[derive(Args, Debug)]
pub struct ParamsArgs {
    #[command(subcommand)]
    pub command: ParamsCommands,

    /// Configuration file whose `[resources]` section locates the parameters.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Parameter directory to manage instead of the default location.
    #[arg(long, global = true, value_name = "DIR")]
    pub params_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ParamsCommands {
    /// Download and unpack the model parameter archive.
    Download {
        /// Remove existing parameters and download them again.
        #[arg(long)]
        force: bool,

        /// Archive to download instead of the default parameter release.
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },
    /// Show the path of the parameter directory.
    Path,
}

/// Arguments for the `fetch` subcommand.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// A local structure file or a 4-character structure code.
    #[arg(required = true, value_name = "ID_OR_PATH")]
    pub identifier: String,

    /// Configuration file whose `[resources]` section locates the structure cache.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory downloaded structures are cached in.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Download URL with an `{id}` placeholder for the structure code.
    #[arg(long, value_name = "URL")]
    pub url_template: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_are_parsed() {
        let cli = Cli::parse_from([
            "mpnnfold", "-vv", "run", "-i", "6MRR", "--chains", "A B", "-n", "8", "-k", "3",
            "-S", "prediction.best-metric=plddt",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("Expected 'run' subcommand");
        };
        assert_eq!(args.structure.as_deref(), Some("6MRR"));
        assert_eq!(args.chains.as_deref(), Some("A B"));
        assert_eq!(args.num_sequences, Some(8));
        assert_eq!(args.max_predictions, Some(3));
        assert_eq!(args.set_values, vec!["prediction.best-metric=plddt"]);
        assert_eq!(args.homooligomer.resolve(), None);
    }

    #[test]
    fn toggle_flags_resolve_to_explicit_values() {
        let cli = Cli::parse_from(["mpnnfold", "run", "--no-homooligomer", "--multimer"]);
        let Commands::Run(args) = cli.command else {
            panic!("Expected 'run' subcommand");
        };
        assert_eq!(args.homooligomer.resolve(), Some(false));
        assert_eq!(args.multimer.resolve(), Some(true));
        assert_eq!(args.templates.resolve(), None);
    }

    #[test]
    fn toggle_flags_are_mutually_exclusive() {
        assert!(
            Cli::try_parse_from(["mpnnfold", "run", "--templates", "--no-templates"]).is_err()
        );
    }

    #[test]
    fn fetch_accepts_config_and_url_template() {
        let cli = Cli::parse_from([
            "mpnnfold",
            "fetch",
            "1CRN",
            "-c",
            "mpnnfold.toml",
            "--url-template",
            "https://mirror.example/{id}.pdb",
        ]);
        let Commands::Fetch(args) = cli.command else {
            panic!("Expected 'fetch' subcommand");
        };
        assert_eq!(args.config, Some(PathBuf::from("mpnnfold.toml")));
        assert_eq!(
            args.url_template.as_deref(),
            Some("https://mirror.example/{id}.pdb")
        );
    }

    #[test]
    fn params_download_accepts_force() {
        let cli = Cli::parse_from(["mpnnfold", "params", "download", "--force"]);
        let Commands::Params(args) = cli.command else {
            panic!("Expected 'params' subcommand");
        };
        assert!(matches!(
            args.command,
            ParamsCommands::Download {
                force: true,
                url: None
            }
        ));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["mpnnfold", "-q", "-v", "params", "path"]).is_err());
    }
}
