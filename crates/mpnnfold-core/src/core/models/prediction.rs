use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Headline accuracy and confidence metrics of one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetrics {
    pub rmsd: f64,
    pub ptm: f64,
    pub plddt: f64,
}

impl PredictionMetrics {
    /// pTM weighted by pLDDT; both lie in `0..=1`, and so does the product.
    pub fn composite(&self) -> f64 {
        self.ptm * self.plddt
    }
}

/// A predicted structure as serialized by the predictor's own exporter (PDB text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictedStructure(String);

impl PredictedStructure {
    pub fn from_pdb(pdb: impl Into<String>) -> Self {
        Self(pdb.into())
    }

    pub fn as_pdb(&self) -> &str {
        &self.0
    }
}

/// Outcome of predicting the structure of one design candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub metrics: PredictionMetrics,
    /// Value of the run's [`BestMetric`] for this prediction.
    pub best_metric_value: f64,
    pub structure: PredictedStructure,
}

/// The metric that decides which prediction of a run is kept as the best structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BestMetric {
    #[default]
    DgramCce,
    Loss,
    Rmsd,
    Pae,
    Plddt,
    Ptm,
    Composite,
}

impl BestMetric {
    pub const ALL: [BestMetric; 7] = [
        BestMetric::DgramCce,
        BestMetric::Loss,
        BestMetric::Rmsd,
        BestMetric::Pae,
        BestMetric::Plddt,
        BestMetric::Ptm,
        BestMetric::Composite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BestMetric::DgramCce => "dgram_cce",
            BestMetric::Loss => "loss",
            BestMetric::Rmsd => "rmsd",
            BestMetric::Pae => "pae",
            BestMetric::Plddt => "plddt",
            BestMetric::Ptm => "ptm",
            BestMetric::Composite => "composite",
        }
    }

    pub fn lower_is_better(&self) -> bool {
        matches!(
            self,
            BestMetric::DgramCce | BestMetric::Loss | BestMetric::Rmsd | BestMetric::Pae
        )
    }

    /// True when `candidate` strictly improves on `incumbent`.
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        if candidate.is_nan() {
            return false;
        }
        if incumbent.is_nan() {
            return true;
        }
        if self.lower_is_better() {
            candidate < incumbent
        } else {
            candidate > incumbent
        }
    }
}

impl fmt::Display for BestMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BestMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BestMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = BestMetric::ALL.iter().map(BestMetric::as_str).collect();
                format!("unknown metric '{}', expected one of: {}", s, known.join(", "))
            })
    }
}
