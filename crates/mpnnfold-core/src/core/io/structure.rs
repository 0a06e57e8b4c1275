use super::traits::ResultFile;
use crate::core::models::prediction::PredictedStructure;
use std::io::{self, Write};
use std::path::Path;

/// Persists structures exactly as the predictor exported them.
pub struct StructureFile;

impl ResultFile for StructureFile {
    type Content = PredictedStructure;
    type Error = io::Error;

    fn write_to(content: &PredictedStructure, writer: &mut impl Write) -> io::Result<()> {
        let pdb = content.as_pdb();
        writer.write_all(pdb.as_bytes())?;
        if !pdb.is_empty() && !pdb.ends_with('\n') {
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

pub fn write_structure<P: AsRef<Path>>(structure: &PredictedStructure, path: P) -> io::Result<()> {
    StructureFile::write_to_path(structure, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn writes_pdb_text_verbatim_with_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("design_0.pdb");
        let structure = PredictedStructure::from_pdb("ATOM      1  N   MET A   1\nEND");

        write_structure(&structure, &path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "ATOM      1  N   MET A   1\nEND\n"
        );
    }

    #[test]
    fn overwrites_existing_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("best.pdb");
        fs::write(&path, "stale content that is longer than the new one\n").unwrap();

        write_structure(&PredictedStructure::from_pdb("END\n"), &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "END\n");
    }
}
