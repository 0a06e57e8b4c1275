use super::{
    DesignRequest, PredictionRequest, PredictionTarget, SequenceDesigner, StructurePredictor,
};
use crate::core::models::design::DesignCandidate;
use crate::core::models::prediction::{PredictedStructure, PredictionMetrics, PredictionResult};
use crate::engine::error::EngineError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Program and arguments used to launch a model worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Splits an argv-style list into program and arguments; `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WorkerRequest<'a> {
    Design(&'a DesignRequest),
    Prepare(&'a PredictionTarget),
    Predict(&'a PredictionRequest),
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum WorkerReply<T> {
    Ok { result: T },
    Error { message: String },
}

#[derive(Deserialize)]
struct DesignReply {
    sequences: Vec<DesignCandidate>,
}

#[derive(Deserialize)]
struct PrepareReply {
    length: usize,
}

#[derive(Deserialize)]
struct PredictReply {
    rmsd: f64,
    ptm: f64,
    plddt: f64,
    best_metric: f64,
    pdb: String,
}

/// A model process answering one JSON request line with one JSON reply line.
///
/// Lines on the worker's stdout that do not start with `{` are treated as chatter from the
/// model libraries and only logged. The worker's stderr is inherited.
pub struct WorkerProcess {
    name: &'static str,
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: BufReader<ChildStdout>,
    shutdown_grace: Duration,
}

impl WorkerProcess {
    pub fn spawn(name: &'static str, command: &WorkerCommand) -> Result<Self, EngineError> {
        info!(
            "Starting {} worker: {} {}",
            name,
            command.program,
            command.args.join(" ")
        );
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                EngineError::adapter(
                    name,
                    format!("could not start '{}': {}", command.program, e),
                )
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::adapter(name, "worker stdin is not available"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::adapter(name, "worker stdout is not available"))?;

        Ok(Self {
            name,
            child,
            stdin: Some(BufWriter::new(stdin)),
            stdout: BufReader::new(stdout),
            shutdown_grace: SHUTDOWN_GRACE,
        })
    }

    fn call<T: DeserializeOwned>(&mut self, request: &WorkerRequest) -> Result<T, EngineError> {
        let name = self.name;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| EngineError::adapter(name, "worker has been shut down"))?;

        serde_json::to_writer(&mut *stdin, request)
            .map_err(|e| EngineError::adapter(name, format!("could not encode request: {}", e)))?;
        stdin
            .write_all(b"\n")
            .and_then(|_| stdin.flush())
            .map_err(|e| {
                EngineError::adapter(name, format!("worker stopped accepting requests: {}", e))
            })?;

        let line = self.read_reply_line()?;
        let reply: WorkerReply<T> = serde_json::from_str(&line)
            .map_err(|e| EngineError::adapter(name, format!("malformed reply: {}", e)))?;

        match reply {
            WorkerReply::Ok { result } => Ok(result),
            WorkerReply::Error { message } => Err(EngineError::adapter(name, message)),
        }
    }

    fn read_reply_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.stdout.read_line(&mut line).map_err(|e| {
                EngineError::adapter(self.name, format!("could not read reply: {}", e))
            })?;
            if read == 0 {
                return Err(EngineError::adapter(
                    self.name,
                    "worker exited without replying",
                ));
            }

            let trimmed = line.trim();
            if trimmed.starts_with('{') {
                return Ok(trimmed.to_string());
            }
            if !trimmed.is_empty() {
                debug!("[{} worker] {}", self.name, trimmed);
            }
        }
    }

    fn shutdown(&mut self) {
        // Closing stdin is the worker's signal to exit.
        drop(self.stdin.take());

        let deadline = Instant::now() + self.shutdown_grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!("{} worker exited with {}", self.name, status);
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(SHUTDOWN_POLL),
                Ok(None) => break,
                Err(e) => {
                    warn!("Could not query {} worker status: {}", self.name, e);
                    break;
                }
            }
        }

        warn!("{} worker did not exit in time; killing it.", self.name);
        if let Err(e) = self.child.kill() {
            warn!("Failed to kill {} worker: {}", self.name, e);
        }
        let _ = self.child.wait();
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub struct WorkerDesigner {
    process: WorkerProcess,
}

impl WorkerDesigner {
    pub const NAME: &'static str = "sequence designer";

    pub fn spawn(command: &WorkerCommand) -> Result<Self, EngineError> {
        Ok(Self {
            process: WorkerProcess::spawn(Self::NAME, command)?,
        })
    }
}

impl SequenceDesigner for WorkerDesigner {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn design(&mut self, request: &DesignRequest) -> Result<Vec<DesignCandidate>, EngineError> {
        let reply: DesignReply = self.process.call(&WorkerRequest::Design(request))?;
        if reply.sequences.len() != request.num {
            return Err(EngineError::adapter(
                Self::NAME,
                format!(
                    "requested {} sequences but received {}",
                    request.num,
                    reply.sequences.len()
                ),
            ));
        }
        Ok(reply.sequences)
    }
}

pub struct WorkerPredictor {
    process: WorkerProcess,
    prepared_length: Option<usize>,
}

impl WorkerPredictor {
    pub const NAME: &'static str = "structure predictor";

    pub fn spawn(command: &WorkerCommand) -> Result<Self, EngineError> {
        Ok(Self {
            process: WorkerProcess::spawn(Self::NAME, command)?,
            prepared_length: None,
        })
    }
}

impl StructurePredictor for WorkerPredictor {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn prepare(&mut self, target: &PredictionTarget) -> Result<usize, EngineError> {
        let reply: PrepareReply = self.process.call(&WorkerRequest::Prepare(target))?;
        if reply.length == 0 {
            return Err(EngineError::adapter(
                Self::NAME,
                "prepared target has no residues",
            ));
        }
        self.prepared_length = Some(reply.length);
        Ok(reply.length)
    }

    fn predict(&mut self, request: &PredictionRequest) -> Result<PredictionResult, EngineError> {
        if self.prepared_length.is_none() {
            return Err(EngineError::adapter(
                Self::NAME,
                "predict was called before prepare",
            ));
        }
        let reply: PredictReply = self.process.call(&WorkerRequest::Predict(request))?;
        Ok(PredictionResult {
            metrics: PredictionMetrics {
                rmsd: reply.rmsd,
                ptm: reply.ptm,
                plddt: reply.plddt,
            },
            best_metric_value: reply.best_metric,
            structure: PredictedStructure::from_pdb(reply.pdb),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::models::prediction::BestMetric;
    use crate::core::utils::identifiers::ChainSelection;
    use std::path::PathBuf;

    fn shell(script: &str) -> WorkerCommand {
        WorkerCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn design_request(num: usize) -> DesignRequest {
        DesignRequest {
            model_name: "v_48_020".to_string(),
            pdb_path: PathBuf::from("6MRR.pdb"),
            chains: ChainSelection::parse("A").unwrap(),
            homooligomer: false,
            num,
            batch: num,
            temperature: 0.1,
            rescore: false,
            fix_pos: None,
            rm_aa: None,
            inverse: false,
        }
    }

    fn target() -> PredictionTarget {
        PredictionTarget {
            pdb_path: PathBuf::from("6MRR.pdb"),
            chains: ChainSelection::parse("A").unwrap(),
            homooligomer: false,
            use_multimer: false,
            use_templates: false,
            rm_template_interchain: false,
            best_metric: BestMetric::DgramCce,
            params_dir: PathBuf::from("/params"),
        }
    }

    const ONE_SEQUENCE: &str = r#"{"status":"ok","result":{"sequences":[{"seq":"MKV","score":1.25,"seqid":0.5,"profile":[[1.0,0.0]]}]}}"#;

    const PREDICTOR_SCRIPT: &str = r#"
while read -r line; do
  case "$line" in
    *'"op":"prepare"'*) echo '{"status":"ok","result":{"length":3}}' ;;
    *'"op":"predict"'*) printf '%s\n' '{"status":"ok","result":{"rmsd":1.5,"ptm":0.8,"plddt":0.9,"best_metric":0.3,"pdb":"ATOM\nEND\n"}}' ;;
    *) echo '{"status":"error","message":"unknown op"}' ;;
  esac
done
"#;

    #[test]
    fn command_from_argv_splits_program_and_args() {
        let argv = vec!["python3".to_string(), "-m".to_string(), "worker".to_string()];
        let command = WorkerCommand::from_argv(&argv).unwrap();
        assert_eq!(command.program, "python3");
        assert_eq!(command.args, vec!["-m", "worker"]);
        assert!(WorkerCommand::from_argv(&[]).is_none());
        assert!(WorkerCommand::from_argv(&[" ".to_string()]).is_none());
    }

    #[test]
    fn requests_are_tagged_with_their_operation() {
        let json = serde_json::to_string(&WorkerRequest::Design(&design_request(2))).unwrap();
        assert!(json.starts_with(r#"{"op":"design""#));
        assert!(json.contains(r#""chains":"A""#));

        let predict = PredictionRequest {
            sequence: "MKV".to_string(),
            num_recycles: 1,
            num_models: 1,
        };
        let json = serde_json::to_string(&WorkerRequest::Predict(&predict)).unwrap();
        assert_eq!(
            json,
            r#"{"op":"predict","seq":"MKV","num_recycles":1,"num_models":1}"#
        );
    }

    #[test]
    fn designer_returns_candidates_and_skips_chatter() {
        let script = format!("read -r req; echo 'loading weights...'; echo '{}'", ONE_SEQUENCE);
        let mut designer = WorkerDesigner::spawn(&shell(&script)).unwrap();

        let candidates = designer.design(&design_request(1)).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].sequence, "MKV");
        assert_eq!(candidates[0].score, 1.25);
        assert_eq!(candidates[0].profile, vec![vec![1.0, 0.0]]);
    }

    #[test]
    fn designer_rejects_wrong_candidate_count() {
        let script = format!("read -r req; echo '{}'", ONE_SEQUENCE);
        let mut designer = WorkerDesigner::spawn(&shell(&script)).unwrap();

        let err = designer.design(&design_request(2)).unwrap_err();

        assert!(matches!(
            err,
            EngineError::Adapter {
                adapter: WorkerDesigner::NAME,
                ..
            }
        ));
    }

    #[test]
    fn worker_error_reply_becomes_adapter_failure() {
        let script = r#"read -r req; echo '{"status":"error","message":"CUDA out of memory"}'"#;
        let mut designer = WorkerDesigner::spawn(&shell(script)).unwrap();

        let err = designer.design(&design_request(1)).unwrap_err();

        assert!(err.to_string().contains("CUDA out of memory"));
    }

    #[test]
    fn worker_exit_without_reply_is_adapter_failure() {
        let mut designer = WorkerDesigner::spawn(&shell("exit 0")).unwrap();
        let err = designer.design(&design_request(1)).unwrap_err();
        assert!(matches!(err, EngineError::Adapter { .. }));
    }

    #[test]
    fn malformed_reply_is_adapter_failure() {
        let mut designer = WorkerDesigner::spawn(&shell("read -r req; echo '{not json'")).unwrap();
        let err = designer.design(&design_request(1)).unwrap_err();
        assert!(err.to_string().contains("malformed reply"));
    }

    #[test]
    fn missing_program_is_adapter_failure() {
        let command = WorkerCommand {
            program: "/nonexistent/mpnnfold-worker".to_string(),
            args: vec![],
        };
        assert!(matches!(
            WorkerDesigner::spawn(&command),
            Err(EngineError::Adapter { .. })
        ));
    }

    #[test]
    fn predictor_prepares_once_and_predicts_repeatedly() {
        let mut predictor = WorkerPredictor::spawn(&shell(PREDICTOR_SCRIPT)).unwrap();
        let request = PredictionRequest {
            sequence: "MKV".to_string(),
            num_recycles: 1,
            num_models: 1,
        };

        assert_eq!(predictor.prepare(&target()).unwrap(), 3);
        let first = predictor.predict(&request).unwrap();
        let second = predictor.predict(&request).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.metrics.ptm, 0.8);
        assert_eq!(first.best_metric_value, 0.3);
        assert_eq!(first.structure.as_pdb(), "ATOM\nEND\n");
    }

    #[test]
    fn predictor_refuses_to_predict_before_prepare() {
        let mut predictor = WorkerPredictor::spawn(&shell(PREDICTOR_SCRIPT)).unwrap();
        let request = PredictionRequest {
            sequence: "MKV".to_string(),
            num_recycles: 1,
            num_models: 1,
        };
        assert!(predictor.predict(&request).is_err());
    }

    fn is_running(pid: u32) -> bool {
        Command::new("sh")
            .args(["-c", &format!("kill -0 {}", pid)])
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    #[test]
    fn dropping_adapter_closes_stdin_and_reaps_worker() {
        let designer = WorkerDesigner::spawn(&shell("while read -r line; do :; done")).unwrap();
        let pid = designer.process.child.id();
        assert!(is_running(pid));

        let started = Instant::now();
        drop(designer);

        assert!(started.elapsed() < SHUTDOWN_GRACE);
        assert!(!is_running(pid));
    }

    #[test]
    fn worker_ignoring_eof_is_killed_after_grace() {
        let mut process =
            WorkerProcess::spawn("stubborn", &shell("while :; do sleep 1; done")).unwrap();
        process.shutdown_grace = Duration::from_millis(200);
        let pid = process.child.id();

        let started = Instant::now();
        drop(process);

        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < SHUTDOWN_GRACE);
        assert!(!is_running(pid));
    }
}
