use super::traits::ResultFile;
use crate::core::models::design::DesignCandidate;
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FastaRecord {
    pub header: String,
    pub sequence: String,
}

impl FastaRecord {
    /// Recovers `(score, seqid)` from a header written by [`FastaFile`].
    pub fn design_scores(&self) -> Option<(f64, f64)> {
        let rest = self.header.strip_prefix("score:")?;
        let (score, seqid) = rest.split_once("_seqid:")?;
        Some((score.parse().ok()?, seqid.parse().ok()?))
    }
}

/// FASTA records for design candidates.
///
/// Each candidate becomes a two-line record: `>score:{score}_seqid:{seqid}` with both values
/// at three decimal places, followed by the raw sequence.
pub struct FastaFile;

impl FastaFile {
    pub fn header_for(candidate: &DesignCandidate) -> String {
        format!("score:{:.3}_seqid:{:.3}", candidate.score, candidate.seqid)
    }

    pub fn read_from(reader: &mut impl BufRead) -> Result<Vec<FastaRecord>, FastaError> {
        let mut records = Vec::new();
        let mut current: Option<FastaRecord> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('>') {
                if let Some(record) = current.take() {
                    records.push(record);
                }
                current = Some(FastaRecord {
                    header: header.trim().to_string(),
                    sequence: String::new(),
                });
            } else {
                let record = current.as_mut().ok_or_else(|| FastaError::Parse {
                    line: line_num + 1,
                    message: "sequence data before the first '>' header".to_string(),
                })?;
                record.sequence.push_str(line.trim());
            }
        }

        records.extend(current);
        Ok(records)
    }
}

impl ResultFile for FastaFile {
    type Content = [DesignCandidate];
    type Error = FastaError;

    fn write_to(content: &[DesignCandidate], writer: &mut impl Write) -> Result<(), FastaError> {
        for candidate in content {
            writeln!(writer, ">{}", Self::header_for(candidate))?;
            writeln!(writer, "{}", candidate.sequence)?;
        }
        Ok(())
    }
}

pub fn write_fasta<P: AsRef<Path>>(
    candidates: &[DesignCandidate],
    path: P,
) -> Result<(), FastaError> {
    FastaFile::write_to_path(candidates, path)
}

pub fn read_fasta(reader: &mut impl BufRead) -> Result<Vec<FastaRecord>, FastaError> {
    FastaFile::read_from(reader)
}
