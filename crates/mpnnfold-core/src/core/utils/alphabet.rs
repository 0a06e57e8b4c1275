use phf::{Map, phf_map};
use thiserror::Error;

/// Residue order of the per-position distributions produced by the sequence designer.
///
/// The 20 canonical residues followed by the unknown residue `X`.
pub const RESIDUE_ALPHABET: [char; 21] = [
    'A', 'R', 'N', 'D', 'C', 'Q', 'E', 'G', 'H', 'I', 'L', 'K', 'M', 'F', 'P', 'S', 'T', 'W',
    'Y', 'V', 'X',
];

static RESIDUE_INDEX: Map<char, usize> = phf_map! {
    'A' => 0, 'R' => 1, 'N' => 2, 'D' => 3, 'C' => 4,
    'Q' => 5, 'E' => 6, 'G' => 7, 'H' => 8, 'I' => 9,
    'L' => 10, 'K' => 11, 'M' => 12, 'F' => 13, 'P' => 14,
    'S' => 15, 'T' => 16, 'W' => 17, 'Y' => 18, 'V' => 19,
    'X' => 20,
};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("Profile has {found} positions but the target needs {expected}")]
    ProfileTooShort { expected: usize, found: usize },

    #[error("Profile position {position} is empty")]
    EmptyPosition { position: usize },

    #[error(
        "Profile position {position} has {width} entries, more than the {max} residue types",
        max = RESIDUE_ALPHABET.len()
    )]
    PositionTooWide { position: usize, width: usize },
}

pub fn residue_index(residue: char) -> Option<usize> {
    RESIDUE_INDEX.get(&residue.to_ascii_uppercase()).copied()
}

/// True for the 20 standard amino acids (case-insensitive); `X` is not canonical.
pub fn is_canonical_residue(residue: char) -> bool {
    matches!(residue_index(residue), Some(i) if i < 20)
}

/// Turns a per-position residue distribution into a sequence.
///
/// Only the first `length` positions are used; designers may return padded profiles (for
/// example when the backbone was prepared as a homooligomer). Each position takes the residue
/// with the highest weight, the first one winning ties. NaN weights are ignored.
pub fn decode_profile(profile: &[Vec<f32>], length: usize) -> Result<String, DecodeError> {
    if profile.len() < length {
        return Err(DecodeError::ProfileTooShort {
            expected: length,
            found: profile.len(),
        });
    }

    profile[..length]
        .iter()
        .enumerate()
        .map(|(position, weights)| {
            if weights.len() > RESIDUE_ALPHABET.len() {
                return Err(DecodeError::PositionTooWide {
                    position,
                    width: weights.len(),
                });
            }
            argmax(weights)
                .map(|index| RESIDUE_ALPHABET[index])
                .ok_or(DecodeError::EmptyPosition { position })
        })
        .collect()
}

fn argmax(weights: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &w) in weights.iter().enumerate() {
        if w.is_nan() {
            continue;
        }
        match best {
            Some((_, best_w)) if w <= best_w => {}
            _ => best = Some((i, w)),
        }
    }
    best.map(|(i, _)| i)
}
