//! Backbone resolution and parameter-archive caching.
//!
//! Both operations are idempotent through the filesystem: a structure code is downloaded
//! once into `<code>.pdb`, and the parameter directory is populated once and then trusted
//! for as long as it is non-empty.
//!
//! A non-empty parameter directory is taken as proof of a complete download, so the
//! directory must never be left half-filled. Archives are downloaded to a temporary file and
//! unpacked into a sibling `<dir>.partial` staging directory, which is renamed onto the
//! target only once unpacking has succeeded.

use super::config::ResourceConfig;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::utils::identifiers::{IdentifierError, StructureId};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const DEFAULT_STRUCTURE_URL_TEMPLATE: &str = "https://files.rcsb.org/view/{id}.pdb";
pub const DEFAULT_PARAMS_URL: &str =
    "https://storage.googleapis.com/alphafold/alphafold_params_2022-12-06.tar";

const STAGING_SUFFIX: &str = "partial";

/// Transfers the body behind a URL into a local file.
///
/// The pipeline never talks to the network directly; the CLI supplies an HTTP
/// implementation and tests supply counting fakes.
pub trait Downloader {
    /// Writes everything served at `url` into `destination` (truncating it) and returns the
    /// number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Fetch`] for network and HTTP-status failures.
    fn download(
        &self,
        url: &str,
        destination: &Path,
        reporter: &ProgressReporter,
    ) -> Result<u64, EngineError>;
}

impl<D: Downloader + ?Sized> Downloader for &D {
    fn download(
        &self,
        url: &str,
        destination: &Path,
        reporter: &ProgressReporter,
    ) -> Result<u64, EngineError> {
        (**self).download(url, destination, reporter)
    }
}

/// Where a backbone comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureSource {
    LocalFile(PathBuf),
    Remote(StructureId),
}

impl StructureSource {
    /// An existing file wins over everything else; otherwise the identifier must be a
    /// well-formed structure code. No network access happens here.
    pub fn classify(identifier: &str) -> Result<Self, IdentifierError> {
        let path = Path::new(identifier);
        if path.is_file() {
            return Ok(Self::LocalFile(path.to_path_buf()));
        }
        StructureId::parse(identifier).map(Self::Remote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStatus {
    /// The directory was already populated; nothing was fetched.
    Cached,
    /// The archive was downloaded and unpacked.
    Downloaded { bytes: u64 },
}

#[derive(Debug)]
pub struct ResourceFetcher<D> {
    downloader: D,
    structure_cache_dir: PathBuf,
    structure_url_template: String,
    params_url: String,
}

impl<D: Downloader> ResourceFetcher<D> {
    pub fn new(downloader: D, resources: &ResourceConfig) -> Self {
        Self {
            downloader,
            structure_cache_dir: resources.structure_cache_dir.clone(),
            structure_url_template: resources.structure_url_template.clone(),
            params_url: resources.params_url.clone(),
        }
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Resolves a local path or structure code to a structure file on disk.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidIdentifier`] (before any network access) when `identifier` is
    /// neither an existing file nor a 4-character code; [`EngineError::Fetch`] when the
    /// download fails.
    pub fn resolve_backbone(
        &self,
        identifier: &str,
        reporter: &ProgressReporter,
    ) -> Result<PathBuf, EngineError> {
        let id = match StructureSource::classify(identifier)? {
            StructureSource::LocalFile(path) => {
                debug!("Using local structure file {:?}", path);
                return Ok(path);
            }
            StructureSource::Remote(id) => id,
        };

        let cached = self.structure_cache_dir.join(id.cache_file_name());
        if cached.is_file() {
            info!("Using existing {:?}", cached);
            return Ok(cached);
        }

        let url = id.download_url(&self.structure_url_template);
        info!("Downloading {} from {} ...", id, url);
        fs::create_dir_all(&self.structure_cache_dir)?;
        let staged = NamedTempFile::new_in(&self.structure_cache_dir)?;
        self.downloader.download(&url, staged.path(), reporter)?;
        staged
            .persist(&cached)
            .map_err(|e| EngineError::Io(e.error))?;

        info!("Saved to {:?}", cached);
        Ok(cached)
    }

    /// Makes sure `target_dir` holds the unpacked parameter archive.
    ///
    /// # Errors
    ///
    /// [`EngineError::Fetch`] when the download fails and [`EngineError::Extraction`] when
    /// the archive cannot be unpacked. Neither leaves a populated `target_dir` behind, and
    /// neither is retried.
    pub fn ensure_parameter_archive(
        &self,
        target_dir: &Path,
        reporter: &ProgressReporter,
    ) -> Result<ArchiveStatus, EngineError> {
        if is_populated(target_dir) {
            info!("Using existing model parameters in {:?}", target_dir);
            return Ok(ArchiveStatus::Cached);
        }

        let staging_dir = staging_path(target_dir)?;
        let parent = parent_dir(target_dir);
        fs::create_dir_all(parent)?;
        if staging_dir.exists() {
            warn!(
                "Removing leftover staging directory {:?} from an interrupted download.",
                staging_dir
            );
            fs::remove_dir_all(&staging_dir)?;
        }

        info!(
            "Downloading model parameters from {} (this happens once and may take a while)...",
            self.params_url
        );
        let archive = NamedTempFile::new_in(parent)?;
        let bytes = self
            .downloader
            .download(&self.params_url, archive.path(), reporter)?;
        debug!("Downloaded {} bytes to {:?}", bytes, archive.path());

        reporter.report(Progress::Unpacking);
        info!("Unpacking archive into {:?}", staging_dir);
        fs::create_dir_all(&staging_dir)?;
        if let Err(source) = unpack(archive.path(), &staging_dir, &self.params_url) {
            if let Err(e) = fs::remove_dir_all(&staging_dir) {
                warn!("Could not clean up {:?}: {}", staging_dir, e);
            }
            return Err(EngineError::Extraction {
                archive: archive.path().to_path_buf(),
                source,
            });
        }

        if target_dir.exists() {
            fs::remove_dir(target_dir)?;
        }
        fs::rename(&staging_dir, target_dir)?;

        info!("Model parameters unpacked to {:?}", target_dir);
        Ok(ArchiveStatus::Downloaded { bytes })
    }

    /// Discards whatever is in `target_dir` and fetches the archive again.
    pub fn refetch_parameter_archive(
        &self,
        target_dir: &Path,
        reporter: &ProgressReporter,
    ) -> Result<ArchiveStatus, EngineError> {
        if target_dir.exists() {
            info!("Removing existing parameter directory {:?}", target_dir);
            fs::remove_dir_all(target_dir)?;
        }
        self.ensure_parameter_archive(target_dir, reporter)
    }
}

/// True when `dir` is a directory with at least one entry.
pub fn is_populated(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

fn staging_path(target_dir: &Path) -> Result<PathBuf, EngineError> {
    let name = target_dir.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{:?} does not name a directory", target_dir),
        )
    })?;
    let mut staging_name = name.to_os_string();
    staging_name.push(format!(".{}", STAGING_SUFFIX));
    Ok(parent_dir(target_dir).join(staging_name))
}

fn is_zstd_compressed(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.ends_with(".zst") || path.ends_with(".tzst")
}

fn unpack(archive: &Path, destination: &Path, url: &str) -> io::Result<()> {
    let reader = BufReader::new(File::open(archive)?);
    let reader: Box<dyn Read> = if is_zstd_compressed(url) {
        Box::new(zstd::stream::read::Decoder::new(reader)?)
    } else {
        Box::new(reader)
    };
    tar::Archive::new(reader).unpack(destination)
}
