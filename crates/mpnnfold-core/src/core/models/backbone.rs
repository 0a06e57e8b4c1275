use crate::core::utils::identifiers::ChainSelection;
use std::path::{Path, PathBuf};

/// The fixed structure that sequences are designed onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backbone {
    path: PathBuf,
    chains: ChainSelection,
    homooligomer: bool,
}

impl Backbone {
    pub fn new(path: PathBuf, chains: ChainSelection, homooligomer: bool) -> Self {
        Self {
            path,
            chains,
            homooligomer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chains(&self) -> &ChainSelection {
        &self.chains
    }

    pub fn is_homooligomer(&self) -> bool {
        self.homooligomer
    }
}
