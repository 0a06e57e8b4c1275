use serde::{Deserialize, Serialize};

/// One sampled sequence together with the designer's own scores.
///
/// `profile` is the per-position residue distribution (rows ordered like the backbone,
/// columns in [`RESIDUE_ALPHABET`](crate::core::utils::alphabet::RESIDUE_ALPHABET) order)
/// that downstream prediction decodes into a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignCandidate {
    #[serde(rename = "seq")]
    pub sequence: String,
    pub score: f64,
    pub seqid: f64,
    #[serde(default)]
    pub profile: Vec<Vec<f32>>,
}

impl DesignCandidate {
    pub fn new(sequence: impl Into<String>, score: f64, seqid: f64, profile: Vec<Vec<f32>>) -> Self {
        Self {
            sequence: sequence.into(),
            score,
            seqid,
            profile,
        }
    }
}
