//! Record sources
//!
//! A source hands out the raw text of each record, one at a time, and can be
//! reopened for every pass of a job:
//!
//! - [`JsonLinesSource`] - newline-delimited JSON (`.jsonl`, `.ndjson`)
//! - [`ZipArchiveSource`] - a ZIP archive of `.json` members (`archive` feature)
//! - [`MemorySource`] - records held in memory, mostly for tests and embedding

#[cfg(feature = "archive")]
mod archive;
mod jsonl;

#[cfg(feature = "archive")]
pub use archive::ZipArchiveSource;
pub use jsonl::JsonLinesSource;

use std::path::{Path, PathBuf};

/// Error while reading records from a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Input path does not exist
    #[error("Input not found: {0}")]
    NotFound(PathBuf),

    /// Input extension is not a supported container
    #[error("Unsupported source file type: {0} (expected .jsonl, .ndjson or .zip)")]
    UnsupportedSourceType(PathBuf),

    /// Underlying read failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive could not be opened or a member could not be read
    #[error("Archive error: {0}")]
    Archive(String),
}

/// Lazily produced raw record texts
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<String, SourceError>> + 'a>;

/// A finite, re-openable stream of raw records.
///
/// Each call to [`RecordSource::items`] starts a fresh pass from the first
/// record; the returned iterator is consumed once.
pub trait RecordSource {
    /// Total number of records, used for progress reporting
    fn count(&self) -> Result<usize, SourceError>;

    /// Open a new pass over the records
    fn items(&self) -> Result<RecordIter<'_>, SourceError>;

    /// Human readable description for log messages
    fn describe(&self) -> String;
}

/// Open the source matching the extension of `path`.
///
/// # Example
///
/// ```rust,no_run
/// use json2sqlite::source::open_source;
///
/// let source = open_source("nvd.jsonl".as_ref())?;
/// println!("{} records", source.count()?);
/// # Ok::<(), json2sqlite::source::SourceError>(())
/// ```
pub fn open_source(path: &Path) -> Result<Box<dyn RecordSource>, SourceError> {
    let kind = SourceKind::detect(path)?;

    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    match kind {
        SourceKind::JsonLines => Ok(Box::new(JsonLinesSource::new(path))),
        #[cfg(feature = "archive")]
        SourceKind::Archive => Ok(Box::new(ZipArchiveSource::new(path))),
    }
}

/// Container formats understood by [`open_source`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    JsonLines,
    #[cfg(feature = "archive")]
    Archive,
}

impl SourceKind {
    /// Determine the container format from the file extension
    pub fn detect(path: &Path) -> Result<Self, SourceError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "jsonl" | "ndjson" => Ok(SourceKind::JsonLines),
            #[cfg(feature = "archive")]
            "zip" => Ok(SourceKind::Archive),
            _ => Err(SourceError::UnsupportedSourceType(path.to_path_buf())),
        }
    }
}

/// Records held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<String>,
}

impl MemorySource {
    pub fn new(records: Vec<String>) -> Self {
        Self { records }
    }

    /// Build a source from JSON values
    pub fn from_values(values: &[serde_json::Value]) -> Self {
        Self::new(values.iter().map(|v| v.to_string()).collect())
    }
}

impl RecordSource for MemorySource {
    fn count(&self) -> Result<usize, SourceError> {
        Ok(self.records.len())
    }

    fn items(&self) -> Result<RecordIter<'_>, SourceError> {
        Ok(Box::new(self.records.iter().cloned().map(Ok)))
    }

    fn describe(&self) -> String {
        format!("{} in-memory records", self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_source_kind() {
        assert_eq!(
            SourceKind::detect(Path::new("data.jsonl")).unwrap(),
            SourceKind::JsonLines
        );
        assert_eq!(
            SourceKind::detect(Path::new("DATA.NDJSON")).unwrap(),
            SourceKind::JsonLines
        );
        assert!(matches!(
            SourceKind::detect(Path::new("data.csv")),
            Err(SourceError::UnsupportedSourceType(_))
        ));
        assert!(SourceKind::detect(Path::new("no_extension")).is_err());
    }

    #[cfg(feature = "archive")]
    #[test]
    fn test_detect_archive() {
        assert_eq!(
            SourceKind::detect(Path::new("items.zip")).unwrap(),
            SourceKind::Archive
        );
    }

    #[test]
    fn test_open_missing_file() {
        let result = open_source(Path::new("/nonexistent/input.jsonl"));
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_unsupported_type_reported_before_existence() {
        let result = open_source(Path::new("/nonexistent/input.xml"));
        assert!(matches!(result, Err(SourceError::UnsupportedSourceType(_))));
    }

    #[test]
    fn test_memory_source_is_reopenable() {
        let source = MemorySource::from_values(&[json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(source.count().unwrap(), 2);

        let first: Vec<String> = source.items().unwrap().map(|r| r.unwrap()).collect();
        let second: Vec<String> = source.items().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], r#"{"id":1}"#);
    }
}
