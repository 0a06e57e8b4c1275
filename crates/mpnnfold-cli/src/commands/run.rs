use crate::cli::RunArgs;
use crate::config::{AppConfig, PartialConfig};
use crate::data::{self, HttpDownloader};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use mpnnfold::engine::adapters::worker::{WorkerDesigner, WorkerPredictor};
use mpnnfold::engine::error::EngineError;
use mpnnfold::engine::fetch::ResourceFetcher;
use mpnnfold::engine::progress::ProgressReporter;
use mpnnfold::workflows::design::{self, PipelineReport};
use tracing::info;

pub async fn run(args: RunArgs) -> Result<()> {
    let partial = PartialConfig::load(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial.merge_with_cli(&args, data::default_params_dir)?;

    let fetcher = ResourceFetcher::new(HttpDownloader::new()?, &config.pipeline.resources);
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Designing {} sequence(s) for {} (chains {})...",
        config.pipeline.design.num_sequences,
        config.pipeline.design.structure,
        config.pipeline.design.chains
    );
    info!("Invoking the design workflow...");

    let report = tokio::task::block_in_place(|| execute(&config, &fetcher, &reporter))?;

    print_summary(&report);
    Ok(())
}

fn execute(
    config: &AppConfig,
    fetcher: &ResourceFetcher<HttpDownloader>,
    reporter: &ProgressReporter,
) -> std::result::Result<PipelineReport, EngineError> {
    let mut designer = WorkerDesigner::spawn(&config.designer_command)?;
    let mut predictor = WorkerPredictor::spawn(&config.predictor_command)?;
    design::run(
        &config.pipeline,
        fetcher,
        &mut designer,
        &mut predictor,
        reporter,
    )
}

fn print_summary(report: &PipelineReport) {
    println!("\n=== Designed sequences ===");
    for (n, candidate) in report.candidates.iter().enumerate() {
        println!(
            "{}: score={:.3}, seqid={:.3}",
            n + 1,
            candidate.score,
            candidate.seqid
        );
        println!("   {}", candidate.sequence);
    }
    println!("Wrote FASTA to {}", report.fasta_path.display());

    println!("\n=== Summary of structure predictions ===");
    for evaluated in &report.evaluated {
        let m = &evaluated.metrics;
        println!(
            "{}: rmsd={:.3}, ptm={:.3}, plddt={:.3}, composite={:.3} -> {}",
            evaluated.index,
            m.rmsd,
            m.ptm,
            m.plddt,
            m.composite(),
            evaluated.structure_path.display()
        );
    }
    println!("Metrics table written to {}", report.metrics_path.display());

    if let Some(best) = &report.best {
        println!(
            "\n✓ Best-scoring structure (design {}) written to: {}",
            best.index,
            best.structure_path.display()
        );
    }
}
