//! ZIP archive source: one record per `.json` member

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use super::{RecordIter, RecordSource, SourceError};

/// Every non-directory member whose name ends in `.json`, in archive order
#[derive(Debug, Clone)]
pub struct ZipArchiveSource {
    path: PathBuf,
}

impl ZipArchiveSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<ZipArchive<BufReader<File>>, SourceError> {
        let file = File::open(&self.path)?;
        ZipArchive::new(BufReader::new(file)).map_err(|e| {
            SourceError::Archive(format!("Failed to open {}: {}", self.path.display(), e))
        })
    }
}

fn is_record_member(name: &str, is_dir: bool) -> bool {
    !is_dir && name.to_lowercase().ends_with(".json")
}

impl RecordSource for ZipArchiveSource {
    fn count(&self) -> Result<usize, SourceError> {
        let mut archive = self.open()?;
        let mut count = 0;
        for i in 0..archive.len() {
            let member = archive.by_index(i).map_err(|e| {
                SourceError::Archive(format!("Failed to read archive entry {}: {}", i, e))
            })?;
            if is_record_member(member.name(), member.is_dir()) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn items(&self) -> Result<RecordIter<'_>, SourceError> {
        Ok(Box::new(ArchiveRecords {
            archive: self.open()?,
            next: 0,
        }))
    }

    fn describe(&self) -> String {
        format!("ZIP archive {}", self.path.display())
    }
}

struct ArchiveRecords {
    archive: ZipArchive<BufReader<File>>,
    next: usize,
}

impl Iterator for ArchiveRecords {
    type Item = Result<String, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.archive.len() {
            let index = self.next;
            self.next += 1;

            let mut member = match self.archive.by_index(index) {
                Ok(member) => member,
                Err(e) => {
                    return Some(Err(SourceError::Archive(format!(
                        "Failed to read archive entry {}: {}",
                        index, e
                    ))));
                }
            };

            if !is_record_member(member.name(), member.is_dir()) {
                continue;
            }

            let mut content = String::new();
            if let Err(e) = member.read_to_string(&mut content) {
                return Some(Err(SourceError::Archive(format!(
                    "Failed to read member {}: {}",
                    member.name(),
                    e
                ))));
            }
            return Some(Ok(content));
        }
        None
    }
}
