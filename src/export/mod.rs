//! Export functionality
//!
//! Renders a planned [`TableLayout`](crate::plan::TableLayout) for a target
//! store:
//! - SQL creation statements (SQLite dialect)

pub mod sql;

/// Result of an export operation.
///
/// Contains the exported content and format identifier.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[must_use = "export results contain the exported content and should be used"]
pub struct ExportResult {
    /// Exported content
    pub content: String,
    /// Format identifier
    pub format: String,
}

/// Error during export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Export error: {0}")]
    ExportError(String),
}

pub use sql::SQLExporter;
