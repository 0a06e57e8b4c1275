use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const STRUCTURE_ID_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum IdentifierError {
    #[error(
        "Invalid structure identifier '{0}'. Expected an existing file path or a 4-character code (e.g., '6MRR')."
    )]
    InvalidStructureId(String),

    #[error("Chain selection '{0}' does not name any chain. Expected letters such as 'A' or 'A,B'.")]
    EmptyChainSelection(String),
}

/// A 4-character code identifying an entry in the public structure repository.
///
/// The code is kept exactly as given; no case folding is applied, so the cache file name
/// matches what the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructureId(String);

impl StructureId {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let is_well_formed = raw.len() == STRUCTURE_ID_LEN
            && raw.chars().all(|c| c.is_ascii_alphanumeric());
        if is_well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(IdentifierError::InvalidStructureId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name used for the co-located structure cache.
    pub fn cache_file_name(&self) -> String {
        format!("{}.pdb", self.0)
    }

    /// Substitutes every `{id}` placeholder in `template`.
    pub fn download_url(&self, template: &str) -> String {
        template.replace("{id}", &self.0)
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StructureId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An ordered set of chain identifiers.
///
/// Any run of non-letter characters acts as a single separator, so `"A,B"`, `"A B"`,
/// `"A-B"` and `"A;;B"` all select the chains `A` and `B`. The models receive the
/// comma-joined form (see [`fmt::Display`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainSelection {
    chains: Vec<String>,
}

impl ChainSelection {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let chains: Vec<String> = raw
            .split(|c: char| !c.is_ascii_alphabetic())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        if chains.is_empty() {
            return Err(IdentifierError::EmptyChainSelection(raw.to_string()));
        }
        Ok(Self { chains })
    }

    pub fn chains(&self) -> &[String] {
        &self.chains
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl fmt::Display for ChainSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chains.join(","))
    }
}

impl FromStr for ChainSelection {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ChainSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
