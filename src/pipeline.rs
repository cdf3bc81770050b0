//! Two-pass conversion job.
//!
//! Pass 1 reads every record and infers the merged schema, which is planned
//! into tables and turned into creation statements. Pass 2 re-reads the
//! source and writes the records into the freshly created tables.

use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::config::{ConfigError, JobConfig};
use crate::database::{DatabaseError, RowStore, SqliteBackend};
use crate::export::{ExportError, SQLExporter};
use crate::inference::{InferenceError, infer_schema_with_progress};
use crate::ingest::{IngestError, IngestStats, Ingestor};
use crate::plan::{PlanError, TableLayout, plan_schema};
use crate::progress::Progress;
use crate::source::{RecordSource, SourceError, open_source};

/// Error of a conversion job
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),
}

/// Planned tables and their creation statements
#[derive(Debug, Clone)]
pub struct PlannedJob {
    pub layout: TableLayout,
    /// One `CREATE TABLE` per table, parents first
    pub statements: Vec<String>,
}

/// Per-table summary of a finished job
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub columns: usize,
    pub rows: usize,
}

/// Outcome of a finished job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub tables: Vec<TableSummary>,
    /// Paths stored as opaque JSON text
    pub barriers: Vec<String>,
    pub ingest: IngestStats,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ingested {} of {} records in {} ({:.0} records/s)",
            self.ingest.records_ingested,
            self.ingest.records_read,
            self.ingest.duration_string(),
            self.ingest.throughput()
        )?;
        if self.ingest.duplicates_skipped > 0 {
            writeln!(f, "  Duplicates skipped: {}", self.ingest.duplicates_skipped)?;
        }
        if self.ingest.values_dropped > 0 {
            writeln!(f, "  Values dropped: {}", self.ingest.values_dropped)?;
        }
        for table in &self.tables {
            writeln!(
                f,
                "  {} ({} columns): {} rows",
                table.name, table.columns, table.rows
            )?;
        }
        for barrier in &self.barriers {
            writeln!(f, "  Stored as JSON text: {}", barrier)?;
        }
        Ok(())
    }
}

/// Pass 1: infer the schema of `source` and plan its tables
pub fn plan_source(
    source: &dyn RecordSource,
    main_table: &str,
    primary_key: &str,
    progress: &mut dyn Progress,
) -> Result<PlannedJob, PipelineError> {
    let schema = infer_schema_with_progress(source, progress)?;
    let layout = plan_schema(&schema, main_table, primary_key)?;
    let statements = SQLExporter::statements(&layout)?;
    info!(
        "Planned {} tables ({} opaque paths)",
        layout.tables().len(),
        layout.barriers().len()
    );
    Ok(PlannedJob { layout, statements })
}

/// Both passes of a job against an empty `store`.
///
/// Creation statements are executed one at a time before ingestion starts.
pub fn convert(
    source: &dyn RecordSource,
    store: &mut dyn RowStore,
    main_table: &str,
    primary_key: &str,
    progress: &mut dyn Progress,
) -> Result<(PlannedJob, IngestStats), PipelineError> {
    let planned = plan_source(source, main_table, primary_key, progress)?;
    for statement in &planned.statements {
        store.execute(statement)?;
    }

    let stats = Ingestor::new(&planned.layout, primary_key).ingest(source, store, progress)?;
    Ok((planned, stats))
}

/// A configured conversion job
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: JobConfig,
}

impl Pipeline {
    pub fn new(config: JobConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Run pass 1 only and return the plan without touching the output
    pub fn plan_only(&self, progress: &mut dyn Progress) -> Result<PlannedJob, PipelineError> {
        self.config.validate()?;
        let source = open_source(self.config.input()?)?;
        plan_source(
            source.as_ref(),
            self.config.main_table()?,
            self.config.primary_key()?,
            progress,
        )
    }

    /// Run the full job, creating the output database.
    ///
    /// All configuration is checked before the output file is created.
    pub fn run(&self, progress: &mut dyn Progress) -> Result<JobReport, PipelineError> {
        let output = self.config.output()?;
        self.config.validate()?;

        let source = open_source(self.config.input()?)?;
        let main_table = self.config.main_table()?;
        let primary_key = self.config.primary_key()?;

        let planned = plan_source(source.as_ref(), main_table, primary_key, progress)?;

        let mut store = SqliteBackend::create(output, &self.config.sqlite)?;
        for statement in &planned.statements {
            store.execute(statement)?;
        }
        let ingest = Ingestor::new(&planned.layout, primary_key).ingest(
            source.as_ref(),
            &mut store,
            progress,
        )?;

        let layout = &planned.layout;
        let names: Vec<&str> = layout.tables().iter().map(|t| t.name.as_str()).collect();
        let counts = store.row_counts(&names)?;
        let tables = layout
            .tables()
            .iter()
            .zip(counts)
            .map(|(table, (_, rows))| TableSummary {
                name: table.name.clone(),
                parent: table.parent.clone(),
                columns: table.columns.len(),
                rows,
            })
            .collect();

        info!("Wrote {}", output.display());
        Ok(JobReport {
            tables,
            barriers: layout.barriers().iter().map(|p| p.to_string()).collect(),
            ingest,
        })
    }
}
