//! Newline-delimited JSON source

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::{RecordIter, RecordSource, SourceError};

/// One record per non-blank line of a text file
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<BufReader<File>, SourceError> {
        Ok(BufReader::new(File::open(&self.path)?))
    }
}

impl RecordSource for JsonLinesSource {
    fn count(&self) -> Result<usize, SourceError> {
        let mut count = 0;
        for line in self.open()?.lines() {
            if !line?.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn items(&self) -> Result<RecordIter<'_>, SourceError> {
        let lines = self.open()?.lines().filter_map(|line| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(Ok(line)),
            Err(e) => Some(Err(SourceError::Io(e))),
        });
        Ok(Box::new(lines))
    }

    fn describe(&self) -> String {
        format!("JSON lines file {}", self.path.display())
    }
}
