use crate::cli::{ParamsArgs, ParamsCommands};
use crate::config::{PartialConfig, ResourceOverrides};
use crate::data::{self, HttpDownloader};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use mpnnfold::engine::config::ResourceConfig;
use mpnnfold::engine::fetch::{ArchiveStatus, ResourceFetcher};
use mpnnfold::engine::progress::ProgressReporter;
use tracing::info;

pub async fn run(args: ParamsArgs) -> Result<()> {
    let params_url = match &args.command {
        ParamsCommands::Download { url, .. } => url.clone(),
        ParamsCommands::Path => None,
    };
    let overrides = ResourceOverrides {
        params_dir: args.params_dir,
        params_url,
        ..Default::default()
    };
    let resources = PartialConfig::load(args.config.as_deref())?
        .into_resources(overrides, data::default_params_dir)?;

    match args.command {
        ParamsCommands::Download { force, .. } => handle_download(&resources, force),
        ParamsCommands::Path => {
            println!("{}", resources.params_dir.display());
            Ok(())
        }
    }
}

fn handle_download(resources: &ResourceConfig, force: bool) -> Result<()> {
    let params_dir = resources.params_dir.as_path();
    let fetcher = ResourceFetcher::new(HttpDownloader::new()?, resources);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Model parameters directory: {}", params_dir.display());
    info!("Fetching parameters from {} (force = {})", resources.params_url, force);

    let result = tokio::task::block_in_place(|| {
        if force {
            fetcher.refetch_parameter_archive(params_dir, &reporter)
        } else {
            fetcher.ensure_parameter_archive(params_dir, &reporter)
        }
    });

    match result {
        Ok(ArchiveStatus::Cached) => {
            progress_handler.finish_with_message(
                "✓ Parameters are already present. Use --force to download them again.",
            );
            Ok(())
        }
        Ok(ArchiveStatus::Downloaded { bytes }) => {
            progress_handler.finish_with_message(format!(
                "✓ Downloaded and unpacked {} bytes of model parameters.",
                bytes
            ));
            Ok(())
        }
        Err(e) => {
            progress_handler.finish_with_message("✗ Download failed.");
            Err(e.into())
        }
    }
}
