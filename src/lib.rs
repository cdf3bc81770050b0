//! json2sqlite - normalize streams of JSON records into SQLite tables
//!
//! Provides:
//! - Schema inference over record streams, without a declared contract
//! - Table planning: nested arrays become child tables linked by `__parent__`
//! - SQL creation statements for the planned tables
//! - Streaming ingestion with primary-key de-duplication
//! - JSON lines and ZIP archive record sources
//!
//! ```rust
//! use json2sqlite::database::SqliteBackend;
//! use json2sqlite::pipeline::convert;
//! use json2sqlite::progress::NoProgress;
//! use json2sqlite::source::MemorySource;
//! use serde_json::json;
//!
//! let source = MemorySource::from_values(&[
//!     json!({"id": "CVE-1", "refs": [{"url": "https://a"}]}),
//! ]);
//! let mut store = SqliteBackend::in_memory().unwrap();
//! let (planned, stats) = convert(&source, &mut store, "cves", "id", &mut NoProgress).unwrap();
//!
//! assert_eq!(planned.layout.tables().len(), 2);
//! assert_eq!(stats.rows_written, 2);
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod database;
pub mod export;
pub mod inference;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod source;
pub mod validation;

// Re-export commonly used types
pub use config::{ConfigError, JobConfig};
pub use database::{DatabaseError, RowStore, SqliteBackend};
pub use export::{ExportError, ExportResult, SQLExporter};
pub use inference::{InferenceError, infer_schema};
pub use ingest::{IngestError, IngestStats, Ingestor};
pub use models::{Path, SchemaType, StorageType, TablePlan};
pub use pipeline::{JobReport, Pipeline, PipelineError};
pub use plan::{PlanError, TableLayout};
pub use source::{RecordSource, SourceError, open_source};
pub use validation::ValidationError;
