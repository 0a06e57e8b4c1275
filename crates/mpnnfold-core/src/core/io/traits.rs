use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Defines the interface for serializing pipeline results to a file format.
///
/// Implementors handle the format-specific encoding; opening, buffering and flushing the
/// destination file is shared. Existing files are truncated.
pub trait ResultFile {
    /// What one file holds (a batch of records or a single document).
    type Content: ?Sized;

    /// The error type for write operations.
    type Error: Error + From<io::Error>;

    /// Writes `content` to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the writer reports an I/O error.
    fn write_to(content: &Self::Content, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Creates (or truncates) the file at `path` and writes `content` into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(content: &Self::Content, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(content, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
