use crate::core::io::fasta::write_fasta;
use crate::core::io::metrics::{MetricsRow, write_metrics_csv};
use crate::core::io::structure::write_structure;
use crate::core::models::backbone::Backbone;
use crate::core::models::design::DesignCandidate;
use crate::core::models::prediction::PredictionMetrics;
use crate::core::utils::alphabet::decode_profile;
use crate::engine::adapters::{
    DesignRequest, PredictionRequest, PredictionTarget, SequenceDesigner, StructurePredictor,
};
use crate::engine::config::PipelineConfig;
use crate::engine::error::EngineError;
use crate::engine::fetch::{ArchiveStatus, Downloader, ResourceFetcher};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::BestTracker;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// One design that went through structure prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedDesign {
    pub index: usize,
    /// The decoded sequence that was actually folded.
    pub sequence: String,
    pub metrics: PredictionMetrics,
    pub best_metric_value: f64,
    pub structure_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestDesign {
    pub index: usize,
    pub structure_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub backbone_path: PathBuf,
    pub fasta_path: PathBuf,
    pub candidates: Vec<DesignCandidate>,
    pub params: ArchiveStatus,
    pub evaluated: Vec<EvaluatedDesign>,
    pub best: Option<BestDesign>,
    pub metrics_path: PathBuf,
}

#[instrument(skip_all, name = "design_workflow", fields(structure = %config.design.structure))]
pub fn run<D: Downloader>(
    config: &PipelineConfig,
    fetcher: &ResourceFetcher<D>,
    designer: &mut impl SequenceDesigner,
    predictor: &mut impl StructurePredictor,
    reporter: &ProgressReporter,
) -> Result<PipelineReport, EngineError> {
    let output = &config.output;
    let structure_dir = output.structure_dir();
    fs::create_dir_all(&structure_dir).map_err(|e| EngineError::output(&structure_dir, e))?;

    // === Phase 1: Backbone ===
    reporter.report(Progress::PhaseStart {
        name: "Resolving backbone",
    });
    let backbone_path = fetcher.resolve_backbone(&config.design.structure, reporter)?;
    let backbone = Backbone::new(
        backbone_path.clone(),
        config.design.chains.clone(),
        config.design.homooligomer,
    );
    info!(
        "Backbone {:?}, chains {}{}",
        backbone.path(),
        backbone.chains(),
        if backbone.is_homooligomer() {
            " (homooligomer)"
        } else {
            ""
        }
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Sequence design ===
    reporter.report(Progress::PhaseStart {
        name: "Designing sequences",
    });
    let candidates = design_sequences(config, &backbone, designer)?;
    let fasta_path = output.fasta_path();
    write_fasta(&candidates, &fasta_path).map_err(|e| EngineError::output(&fasta_path, e))?;
    info!("Wrote {} designs to {:?}", candidates.len(), fasta_path);
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Model parameters ===
    reporter.report(Progress::PhaseStart {
        name: "Preparing parameters",
    });
    let params = fetcher.ensure_parameter_archive(&config.resources.params_dir, reporter)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Structure prediction ===
    reporter.report(Progress::PhaseStart {
        name: "Predicting structures",
    });
    let target = PredictionTarget::new(&backbone, &config.prediction, &config.resources.params_dir);
    let length = predictor.prepare(&target)?;
    debug!("{} prepared for {} residues", predictor.name(), length);

    let to_run = config.predictions_to_run();
    info!(
        "Predicting structures for {} of {} designs",
        to_run,
        candidates.len()
    );

    let mut tracker = BestTracker::new(config.prediction.best_metric);
    let mut evaluated = Vec::with_capacity(to_run);
    let mut rows = Vec::with_capacity(to_run);

    reporter.report(Progress::TaskStart {
        total_steps: to_run as u64,
    });
    for (index, candidate) in candidates.iter().take(to_run).enumerate() {
        let sequence = decode_profile(&candidate.profile, length).map_err(|e| {
            EngineError::adapter(designer.name(), format!("design {}: {}", index, e))
        })?;

        let result = predictor.predict(&PredictionRequest {
            sequence: sequence.clone(),
            num_recycles: config.prediction.num_recycles,
            num_models: config.prediction.num_models,
        })?;

        let structure_path = output.design_structure_path(index);
        write_structure(&result.structure, &structure_path)
            .map_err(|e| EngineError::output(&structure_path, e))?;

        let metrics = result.metrics;
        info!(
            "design {}: rmsd {:.3} ptm {:.3} plddt {:.3} composite {:.3}",
            index,
            metrics.rmsd,
            metrics.ptm,
            metrics.plddt,
            metrics.composite()
        );

        if tracker.offer(index, &result) {
            let note = format!(
                "design {} is the new best ({} = {:.3})",
                index,
                tracker.metric(),
                result.best_metric_value
            );
            debug!("{}", note);
            reporter.report(Progress::Message(note));
        }
        rows.push(MetricsRow::new(index, &sequence, &result));
        evaluated.push(EvaluatedDesign {
            index,
            sequence,
            metrics,
            best_metric_value: result.best_metric_value,
            structure_path,
        });
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let offered = tracker.offered();
    let best = match tracker.into_best() {
        Some(winner) => {
            let path = output.best_structure_path();
            write_structure(&winner.result.structure, &path)
                .map_err(|e| EngineError::output(&path, e))?;
            info!(
                "Best design is {} of {} evaluated ({:?})",
                winner.design_index, offered, path
            );
            Some(BestDesign {
                index: winner.design_index,
                structure_path: path,
            })
        }
        None => None,
    };

    let metrics_path = output.metrics_path();
    write_metrics_csv(&rows, &metrics_path).map_err(|e| EngineError::output(&metrics_path, e))?;
    reporter.report(Progress::PhaseFinish);

    Ok(PipelineReport {
        backbone_path,
        fasta_path,
        candidates,
        params,
        evaluated,
        best,
        metrics_path,
    })
}

fn design_sequences(
    config: &PipelineConfig,
    backbone: &Backbone,
    designer: &mut impl SequenceDesigner,
) -> Result<Vec<DesignCandidate>, EngineError> {
    let request = DesignRequest::new(backbone, &config.design);
    info!(
        "Sampling {} sequences (batch {}, temperature {})",
        request.num, request.batch, request.temperature
    );

    let candidates = designer.design(&request)?;
    if candidates.len() != request.num {
        return Err(EngineError::adapter(
            designer.name(),
            format!(
                "requested {} sequences but received {}",
                request.num,
                candidates.len()
            ),
        ));
    }

    for (i, candidate) in candidates.iter().enumerate() {
        info!(
            "design {}: score {:.3} seqid {:.3} {}",
            i, candidate.score, candidate.seqid, candidate.sequence
        );
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::fasta::read_fasta;
    use crate::core::models::prediction::{BestMetric, PredictedStructure, PredictionResult};
    use crate::core::utils::alphabet::residue_index;
    use crate::engine::config::PipelineConfigBuilder;
    use std::cell::Cell;
    use std::io::BufReader;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    struct OfflineDownloader {
        calls: Cell<usize>,
    }

    impl Downloader for OfflineDownloader {
        fn download(
            &self,
            url: &str,
            _destination: &Path,
            _reporter: &ProgressReporter,
        ) -> Result<u64, EngineError> {
            self.calls.set(self.calls.get() + 1);
            Err(EngineError::Fetch {
                url: url.to_string(),
                source: "network disabled in tests".into(),
            })
        }
    }

    fn one_hot(sequence: &str) -> Vec<Vec<f32>> {
        sequence
            .chars()
            .map(|c| {
                let mut row = vec![0.0; 21];
                row[residue_index(c).unwrap()] = 1.0;
                row
            })
            .collect()
    }

    struct FakeDesigner {
        sequences: Vec<&'static str>,
        requests: Vec<DesignRequest>,
    }

    impl FakeDesigner {
        fn with_sequences(sequences: Vec<&'static str>) -> Self {
            Self {
                sequences,
                requests: Vec::new(),
            }
        }

        fn uniform(n: usize) -> Self {
            Self::with_sequences(vec!["MKVLA"; n])
        }
    }

    impl SequenceDesigner for FakeDesigner {
        fn name(&self) -> &'static str {
            "fake designer"
        }

        fn design(
            &mut self,
            request: &DesignRequest,
        ) -> Result<Vec<DesignCandidate>, EngineError> {
            self.requests.push(request.clone());
            Ok(self
                .sequences
                .iter()
                .enumerate()
                .map(|(i, seq)| {
                    DesignCandidate::new(*seq, 1.0 + i as f64, 0.5, one_hot(seq))
                })
                .collect())
        }
    }

    struct FakePredictor {
        length: usize,
        best_values: Vec<f64>,
        fail_on_call: Option<usize>,
        prepared: Vec<PredictionTarget>,
        requests: Vec<PredictionRequest>,
    }

    impl FakePredictor {
        fn new(length: usize, best_values: Vec<f64>) -> Self {
            Self {
                length,
                best_values,
                fail_on_call: None,
                prepared: Vec::new(),
                requests: Vec::new(),
            }
        }
    }

    impl StructurePredictor for FakePredictor {
        fn name(&self) -> &'static str {
            "fake predictor"
        }

        fn prepare(&mut self, target: &PredictionTarget) -> Result<usize, EngineError> {
            self.prepared.push(target.clone());
            Ok(self.length)
        }

        fn predict(
            &mut self,
            request: &PredictionRequest,
        ) -> Result<PredictionResult, EngineError> {
            let call = self.requests.len();
            self.requests.push(request.clone());
            if self.fail_on_call == Some(call) {
                return Err(EngineError::adapter(self.name(), "model crashed"));
            }
            let value = self.best_values.get(call).copied().unwrap_or(1.0);
            Ok(PredictionResult {
                metrics: PredictionMetrics {
                    rmsd: 1.0,
                    ptm: 0.8,
                    plddt: 0.9,
                },
                best_metric_value: value,
                structure: PredictedStructure::from_pdb(format!("REMARK call {}\nEND\n", call)),
            })
        }
    }

    struct Fixture {
        dir: TempDir,
        downloader: OfflineDownloader,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join("backbone.pdb"), "ATOM\nEND\n").unwrap();
            let params = dir.path().join("params");
            fs::create_dir_all(&params).unwrap();
            fs::write(params.join("params_model_1.npz"), b"weights").unwrap();
            Self {
                dir,
                downloader: OfflineDownloader {
                    calls: Cell::new(0),
                },
            }
        }

        fn config(&self, num_sequences: usize, max_predictions: usize) -> PipelineConfig {
            PipelineConfigBuilder::new()
                .model_name("v_48_020")
                .structure(self.dir.path().join("backbone.pdb").to_string_lossy())
                .chains("A")
                .num_sequences(num_sequences)
                .temperature(0.1)
                .num_models(1)
                .num_recycles(1)
                .max_predictions(max_predictions)
                .params_dir(self.dir.path().join("params"))
                .structure_cache_dir(self.dir.path().to_path_buf())
                .output_dir(self.dir.path().join("output"))
                .build()
                .unwrap()
        }

        fn fetcher(&self, config: &PipelineConfig) -> ResourceFetcher<&OfflineDownloader> {
            ResourceFetcher::new(&self.downloader, &config.resources)
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("output")
        }
    }

    fn structure_files(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn end_to_end_run_writes_designs_structures_and_best() {
        let fixture = Fixture::new();
        let config = fixture.config(4, 2);
        let mut designer = FakeDesigner::uniform(4);
        let mut predictor = FakePredictor::new(5, vec![0.7, 0.4]);

        let report = run(
            &config,
            &fixture.fetcher(&config),
            &mut designer,
            &mut predictor,
            &ProgressReporter::new(),
        )
        .unwrap();

        let fasta = fs::File::open(fixture.output().join("design.fasta")).unwrap();
        let records = read_fasta(&mut BufReader::new(fasta)).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(structure_files(&fixture.output().join("all_pdb")), 2);
        assert!(fixture.output().join("all_pdb/design_0.pdb").is_file());
        assert!(fixture.output().join("all_pdb/design_1.pdb").is_file());

        let best = report.best.unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(
            fs::read_to_string(fixture.output().join("best.pdb")).unwrap(),
            "REMARK call 1\nEND\n"
        );

        let metrics = fs::read_to_string(fixture.output().join("metrics.csv")).unwrap();
        assert_eq!(metrics.lines().count(), 3);

        assert_eq!(report.params, ArchiveStatus::Cached);
        assert_eq!(report.evaluated.len(), 2);
        assert_eq!(fixture.downloader.calls.get(), 0);
    }

    #[test]
    fn evaluates_min_of_cap_and_design_count() {
        for (n, k) in [(1, 3), (3, 3), (5, 2)] {
            let fixture = Fixture::new();
            let config = fixture.config(n, k);
            let mut designer = FakeDesigner::uniform(n);
            let mut predictor = FakePredictor::new(5, vec![]);

            let report = run(
                &config,
                &fixture.fetcher(&config),
                &mut designer,
                &mut predictor,
                &ProgressReporter::new(),
            )
            .unwrap();

            assert_eq!(predictor.requests.len(), n.min(k), "n = {}, k = {}", n, k);
            assert_eq!(report.evaluated.len(), n.min(k));
            assert_eq!(report.candidates.len(), n);
            assert_eq!(predictor.prepared.len(), 1);
        }
    }

    #[test]
    fn sequences_are_decoded_from_profiles_and_truncated() {
        let fixture = Fixture::new();
        let config = fixture.config(2, 2);
        let mut designer = FakeDesigner::with_sequences(vec!["MKVLA", "GSWYE"]);
        let mut predictor = FakePredictor::new(3, vec![]);

        run(
            &config,
            &fixture.fetcher(&config),
            &mut designer,
            &mut predictor,
            &ProgressReporter::new(),
        )
        .unwrap();

        let sequences: Vec<&str> = predictor
            .requests
            .iter()
            .map(|r| r.sequence.as_str())
            .collect();
        assert_eq!(sequences, vec!["MKV", "GSW"]);
        assert_eq!(predictor.requests[0].num_recycles, 1);
    }

    #[test]
    fn designer_receives_config_and_predictor_receives_target() {
        let fixture = Fixture::new();
        let config = fixture.config(2, 1);
        let mut designer = FakeDesigner::uniform(2);
        let mut predictor = FakePredictor::new(5, vec![]);

        run(
            &config,
            &fixture.fetcher(&config),
            &mut designer,
            &mut predictor,
            &ProgressReporter::new(),
        )
        .unwrap();

        let request = &designer.requests[0];
        assert_eq!(request.num, 2);
        assert_eq!(request.batch, 2);
        assert!(!request.rescore);
        let target = &predictor.prepared[0];
        assert_eq!(target.best_metric, BestMetric::DgramCce);
        assert_eq!(target.params_dir, fixture.dir.path().join("params"));
    }

    #[test]
    fn predictor_failure_aborts_but_keeps_earlier_structures() {
        let fixture = Fixture::new();
        let config = fixture.config(3, 3);
        let mut designer = FakeDesigner::uniform(3);
        let mut predictor = FakePredictor::new(5, vec![]);
        predictor.fail_on_call = Some(1);

        let err = run(
            &config,
            &fixture.fetcher(&config),
            &mut designer,
            &mut predictor,
            &ProgressReporter::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Adapter {
                adapter: "fake predictor",
                ..
            }
        ));
        assert!(fixture.output().join("design.fasta").is_file());
        assert!(fixture.output().join("all_pdb/design_0.pdb").is_file());
        assert!(!fixture.output().join("all_pdb/design_1.pdb").exists());
        assert!(!fixture.output().join("best.pdb").exists());
        assert_eq!(predictor.requests.len(), 2);
    }

    #[test]
    fn wrong_candidate_count_aborts_before_writing_designs() {
        let fixture = Fixture::new();
        let config = fixture.config(4, 2);
        let mut designer = FakeDesigner::uniform(3);
        let mut predictor = FakePredictor::new(5, vec![]);

        let err = run(
            &config,
            &fixture.fetcher(&config),
            &mut designer,
            &mut predictor,
            &ProgressReporter::new(),
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::Adapter { .. }));
        assert!(!fixture.output().join("design.fasta").exists());
        assert!(predictor.prepared.is_empty());
    }

    #[test]
    fn profile_shorter_than_backbone_is_an_adapter_failure() {
        let fixture = Fixture::new();
        let config = fixture.config(1, 1);
        let mut designer = FakeDesigner::with_sequences(vec!["MK"]);
        let mut predictor = FakePredictor::new(5, vec![]);

        let err = run(
            &config,
            &fixture.fetcher(&config),
            &mut designer,
            &mut predictor,
            &ProgressReporter::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Adapter {
                adapter: "fake designer",
                ..
            }
        ));
        assert!(predictor.requests.is_empty());
    }

    #[test]
    fn invalid_identifier_fails_before_any_work() {
        let fixture = Fixture::new();
        let mut config = fixture.config(2, 1);
        config.design.structure = "not-a-code".to_string();
        let mut designer = FakeDesigner::uniform(2);
        let mut predictor = FakePredictor::new(5, vec![]);

        let err = run(
            &config,
            &fixture.fetcher(&config),
            &mut designer,
            &mut predictor,
            &ProgressReporter::new(),
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::InvalidIdentifier(_)));
        assert!(designer.requests.is_empty());
        assert_eq!(fixture.downloader.calls.get(), 0);
    }

    #[test]
    fn higher_is_better_metric_selects_maximum() {
        let fixture = Fixture::new();
        let mut config = fixture.config(3, 3);
        config.prediction.best_metric = BestMetric::Plddt;
        let mut designer = FakeDesigner::uniform(3);
        let mut predictor = FakePredictor::new(5, vec![0.2, 0.9, 0.9]);

        let report = run(
            &config,
            &fixture.fetcher(&config),
            &mut designer,
            &mut predictor,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert_eq!(report.best.unwrap().index, 1);
    }

    #[test]
    fn new_best_designs_are_announced_to_the_reporter() {
        let fixture = Fixture::new();
        let config = fixture.config(3, 3);
        let mut designer = FakeDesigner::uniform(3);
        let mut predictor = FakePredictor::new(5, vec![0.7, 0.9, 0.2]);
        let messages = std::sync::Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Message(note) = event {
                messages.lock().unwrap().push(note);
            }
        }));

        run(
            &config,
            &fixture.fetcher(&config),
            &mut designer,
            &mut predictor,
            &reporter,
        )
        .unwrap();
        drop(reporter);

        let messages = messages.into_inner().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("design 0 is the new best"));
        assert!(messages[1].starts_with("design 2 is the new best"));
        assert!(messages[1].contains("dgram_cce = 0.200"));
    }
}
