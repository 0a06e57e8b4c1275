use super::traits::ResultFile;
use crate::core::models::prediction::PredictionResult;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// One row of the per-run metrics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    pub design: usize,
    pub sequence: String,
    pub rmsd: f64,
    pub ptm: f64,
    pub plddt: f64,
    pub composite: f64,
    pub best_metric: f64,
}

impl MetricsRow {
    pub fn new(design: usize, sequence: &str, result: &PredictionResult) -> Self {
        Self {
            design,
            sequence: sequence.to_string(),
            rmsd: result.metrics.rmsd,
            ptm: result.metrics.ptm,
            plddt: result.metrics.plddt,
            composite: result.metrics.composite(),
            best_metric: result.best_metric_value,
        }
    }
}

pub struct MetricsFile;

impl ResultFile for MetricsFile {
    type Content = [MetricsRow];
    type Error = csv::Error;

    fn write_to(content: &[MetricsRow], writer: &mut impl Write) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in content {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

pub fn write_metrics_csv<P: AsRef<Path>>(rows: &[MetricsRow], path: P) -> Result<(), csv::Error> {
    MetricsFile::write_to_path(rows, path)
}
