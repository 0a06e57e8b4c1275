use crate::cli::FetchArgs;
use crate::config::{PartialConfig, ResourceOverrides};
use crate::data::{self, HttpDownloader};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use mpnnfold::engine::fetch::ResourceFetcher;
use mpnnfold::engine::progress::ProgressReporter;
use tracing::info;

pub async fn run(args: FetchArgs) -> Result<()> {
    let overrides = ResourceOverrides {
        structure_cache_dir: args.cache_dir,
        structure_url_template: args.url_template,
        ..Default::default()
    };
    let resources = PartialConfig::load(args.config.as_deref())?
        .into_resources(overrides, data::default_params_dir)?;
    let fetcher = ResourceFetcher::new(HttpDownloader::new()?, &resources);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!(
        "Resolving backbone '{}' into {:?}",
        args.identifier, resources.structure_cache_dir
    );
    let path =
        tokio::task::block_in_place(|| fetcher.resolve_backbone(&args.identifier, &reporter))?;
    progress_handler.finish_with_message(format!("✓ Backbone available at {}", path.display()));
    Ok(())
}
