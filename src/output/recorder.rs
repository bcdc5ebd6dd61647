//! Append-only CSV log of readings

use crate::output::Reading;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing the log
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to append to {}: {source}", path.display())]
    Append { path: PathBuf, source: io::Error },
}

/// Appends readings to a log file
///
/// The file is opened for each reading and closed again straight after, so nothing
/// is held open while the poller sleeps. Existing lines are never touched.
#[derive(Debug, Clone)]
pub struct Recorder {
    path: PathBuf,
}

impl Recorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one `value,timestamp` line, creating the file if needed
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The line was written and synced to disk
    /// * `Err(RecordError)` - The file could not be opened or written
    pub fn append(&self, reading: &Reading) -> Result<(), RecordError> {
        self.write_line(&reading.to_line())
            .map_err(|source| RecordError::Append {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!("Appended {} to {}", reading, self.path.display());
        Ok(())
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Single write so a line is never split by another appender
        file.write_all(line.as_bytes())?;
        file.sync_data()
    }
}
