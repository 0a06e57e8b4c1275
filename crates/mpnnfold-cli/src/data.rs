use crate::error::{CliError, Result};
use directories::ProjectDirs;
use futures_util::StreamExt;
use mpnnfold::engine::error::EngineError;
use mpnnfold::engine::fetch::Downloader;
use mpnnfold::engine::progress::{Progress, ProgressReporter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;
use tracing::debug;

const PARAMS_DIR_NAME: &str = "alphafold_params";

/// Location used for the parameter archive when none is configured.
pub fn default_params_dir() -> Result<PathBuf> {
    ProjectDirs::from("org", "mpnnfold", "mpnnfold")
        .map(|dirs| dirs.data_dir().join(PARAMS_DIR_NAME))
        .ok_or_else(|| {
            CliError::Params("Could not determine default data directory path.".to_string())
        })
}

/// Streams HTTP(S) bodies to disk on the ambient tokio runtime.
///
/// The pipeline is synchronous and runs inside `block_in_place`, so each download re-enters
/// the runtime through the captured [`Handle`].
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mpnnfold/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let runtime = Handle::try_current()
            .map_err(|e| CliError::Other(anyhow::anyhow!("No async runtime available: {}", e)))?;
        Ok(Self { client, runtime })
    }

    async fn stream_to_file(
        &self,
        url: &str,
        destination: &Path,
        reporter: &ProgressReporter<'_>,
    ) -> std::result::Result<u64, EngineError> {
        let fetch_error = |e: reqwest::Error| EngineError::Fetch {
            url: url.to_string(),
            source: e.into(),
        };

        debug!("Sending request to {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_error)?;

        reporter.report(Progress::TransferStart {
            total_bytes: response.content_length(),
        });

        let mut writer = BufWriter::new(File::create(destination)?);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(item) = stream.next().await {
            let chunk = item.map_err(fetch_error)?;
            writer.write_all(&chunk)?;
            written += chunk.len() as u64;
            reporter.report(Progress::Transferred { bytes: written });
        }
        writer.flush()?;

        debug!("Received {} bytes from {}", written, url);
        Ok(written)
    }
}

impl Downloader for HttpDownloader {
    fn download(
        &self,
        url: &str,
        destination: &Path,
        reporter: &ProgressReporter,
    ) -> std::result::Result<u64, EngineError> {
        self.runtime
            .block_on(self.stream_to_file(url, destination, reporter))
    }
}
