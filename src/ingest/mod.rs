//! Streaming ingestion of records into a planned table layout.
//!
//! Each record is written depth first. The root row is created with the
//! record's top-level scalars, every array element becomes a child row
//! pointing at the row it was found in, and each row is completed once all
//! values below it have been visited. Records whose primary key was already
//! seen are skipped.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::database::{ColumnValue, Columns, DatabaseError, RowHandle, RowStore};
use crate::models::Path;
use crate::plan::TableLayout;
use crate::progress::{Phase, Progress};
use crate::source::{RecordSource, SourceError};

/// Error during ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A record is not valid JSON
    #[error("Parse error in record {record}: {error}")]
    Parse { record: usize, error: String },

    /// A record's top level is not an object
    #[error("Record {record} is not a JSON object")]
    NotAnObject { record: usize },

    /// The primary-key path is absent or null in a record
    #[error("Record {record} has no value for primary key '{path}'")]
    MissingPrimaryKey { record: usize, path: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Statistics from an ingestion pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    /// Number of records read from the source
    pub records_read: usize,
    /// Number of records written
    pub records_ingested: usize,
    /// Number of records skipped because their key was already seen
    pub duplicates_skipped: usize,
    /// Number of rows inserted across all tables
    pub rows_written: usize,
    /// Number of values with no planned column or table
    pub values_dropped: usize,
    /// Duration of the ingestion
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Get records per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_ingested as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}

/// Columns accumulated for one row between creation and finalization
struct RowBuilder {
    handle: RowHandle,
    columns: Columns,
}

impl RowBuilder {
    fn new(handle: RowHandle) -> Self {
        Self {
            handle,
            columns: Vec::new(),
        }
    }
}

/// Writes records into the tables of a [`TableLayout`]
pub struct Ingestor<'a> {
    layout: &'a TableLayout,
    primary_key: String,
    key_path: Path,
    key_segments: Vec<String>,
    seen: HashSet<String>,
    reported: HashSet<(String, String)>,
    stats: IngestStats,
}

impl<'a> Ingestor<'a> {
    /// `primary_key` is the same dot-separated path the layout was planned
    /// with.
    pub fn new(layout: &'a TableLayout, primary_key: &str) -> Self {
        Self {
            layout,
            primary_key: primary_key.to_string(),
            key_path: Path::from_key_path(primary_key),
            key_segments: primary_key.split('.').map(String::from).collect(),
            seen: HashSet::new(),
            reported: HashSet::new(),
            stats: IngestStats::new(),
        }
    }

    /// Write every record of `source` into `store` inside one transaction.
    ///
    /// The tables of the layout must already exist in the store. Any parse,
    /// key or store failure aborts the pass without committing.
    pub fn ingest(
        mut self,
        source: &dyn RecordSource,
        store: &mut dyn RowStore,
        progress: &mut dyn Progress,
    ) -> Result<IngestStats, IngestError> {
        let start = Instant::now();
        let total = source.count()?;
        info!("Ingesting {} records from {}", total, source.describe());
        progress.start(Phase::Ingestion, total);

        store.begin()?;
        for (index, item) in source.items()?.enumerate() {
            let text = item?;
            self.stats.records_read += 1;
            let record: JsonValue =
                serde_json::from_str(&text).map_err(|e| IngestError::Parse {
                    record: index,
                    error: e.to_string(),
                })?;
            self.ingest_record(index, &record, store)?;
            progress.advance(1);
        }
        store.commit()?;
        progress.finish();

        self.stats.duration = start.elapsed();
        info!(
            "Ingested {} records ({} duplicates skipped, {} rows) in {}",
            self.stats.records_ingested,
            self.stats.duplicates_skipped,
            self.stats.rows_written,
            self.stats.duration_string()
        );
        if self.stats.values_dropped > 0 {
            warn!(
                "{} values had no planned column and were dropped",
                self.stats.values_dropped
            );
        }
        Ok(self.stats)
    }

    /// Write one parsed record. Returns `false` when it was a duplicate.
    pub fn ingest_record(
        &mut self,
        index: usize,
        record: &JsonValue,
        store: &mut dyn RowStore,
    ) -> Result<bool, IngestError> {
        let JsonValue::Object(members) = record else {
            return Err(IngestError::NotAnObject { record: index });
        };

        let key = self
            .primary_key_value(record)
            .ok_or_else(|| IngestError::MissingPrimaryKey {
                record: index,
                path: self.primary_key.clone(),
            })?;
        if !self.seen.insert(self.dedup_key(key)) {
            debug!(record = index, key = %key, "Skipping duplicate record");
            self.stats.duplicates_skipped += 1;
            return Ok(false);
        }

        let layout = self.layout;
        let main_table = layout.main_table();
        let mut initial = Columns::new();
        let mut nested = Vec::new();
        for (name, value) in members {
            let path = Path::root().field(name);
            if layout.is_barrier(&path) {
                if !value.is_null() {
                    self.put(main_table, &mut initial, &path, ColumnValue::opaque(value));
                }
            } else if value.is_array() || value.is_object() {
                nested.push((path, value));
            } else if let Some(scalar) = ColumnValue::from_json(value) {
                self.put(main_table, &mut initial, &path, scalar);
            }
        }

        let handle = store.begin_row(main_table, None, &initial)?;
        self.stats.rows_written += 1;

        let mut row = RowBuilder::new(handle);
        for (path, value) in nested {
            self.visit(value, &path, &mut row, store)?;
        }
        store.finalize_row(&row.handle, &row.columns)?;

        self.stats.records_ingested += 1;
        Ok(true)
    }

    fn primary_key_value<'r>(&self, record: &'r JsonValue) -> Option<&'r JsonValue> {
        let mut current = record;
        for segment in &self.key_segments {
            current = current.as_object()?.get(segment)?;
        }
        (!current.is_null()).then_some(current)
    }

    /// Identity of a key value as the key column compares it. Numbers are
    /// folded to their stored form so `1`, `1.0` and `true` are one key.
    fn dedup_key(&self, key: &JsonValue) -> String {
        if self.layout.is_barrier(&self.key_path) {
            return key.to_string();
        }
        match ColumnValue::from_json(key) {
            Some(ColumnValue::Text(text)) => text,
            Some(ColumnValue::Integer(i)) => i.to_string(),
            Some(ColumnValue::Real(f))
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                (f as i64).to_string()
            }
            Some(ColumnValue::Real(f)) => f.to_string(),
            None => key.to_string(),
        }
    }

    fn visit(
        &mut self,
        value: &JsonValue,
        path: &Path,
        row: &mut RowBuilder,
        store: &mut dyn RowStore,
    ) -> Result<(), IngestError> {
        if value.is_null() {
            return Ok(());
        }
        if self.layout.is_barrier(path) {
            self.put(&row.handle.table, &mut row.columns, path, ColumnValue::opaque(value));
            return Ok(());
        }

        match value {
            JsonValue::Object(members) => {
                for (name, member) in members {
                    self.visit(member, &path.field(name), row, store)?;
                }
            }
            JsonValue::Array(items) => self.visit_list(items, path, row.handle.row_id, store)?,
            scalar => {
                if let Some(scalar) = ColumnValue::from_json(scalar) {
                    self.put(&row.handle.table, &mut row.columns, path, scalar);
                }
            }
        }
        Ok(())
    }

    fn visit_list(
        &mut self,
        items: &[JsonValue],
        path: &Path,
        parent: i64,
        store: &mut dyn RowStore,
    ) -> Result<(), IngestError> {
        let element_path = path.index();
        let table = element_path.table_name(self.layout.main_table());

        if !self.layout.has_table(&table) {
            let dropped = items.iter().filter(|item| !item.is_null()).count();
            if dropped > 0 {
                self.drop_value(&table, "*", dropped);
            }
            return Ok(());
        }

        let barrier = self.layout.is_barrier(&element_path);
        for item in items.iter().filter(|item| !item.is_null()) {
            // Elements off the sampled shape still get a row; their values are dropped below
            let handle = store.begin_row(&table, Some(parent), &[])?;
            self.stats.rows_written += 1;

            let mut child = RowBuilder::new(handle);
            match item {
                _ if barrier => self.put(
                    &table,
                    &mut child.columns,
                    &element_path,
                    ColumnValue::opaque(item),
                ),
                JsonValue::Object(members) => {
                    for (name, member) in members {
                        self.visit(member, &element_path.field(name), &mut child, store)?;
                    }
                }
                JsonValue::Array(_) => self.put(
                    &table,
                    &mut child.columns,
                    &element_path,
                    ColumnValue::opaque(item),
                ),
                scalar => {
                    if let Some(scalar) = ColumnValue::from_json(scalar) {
                        self.put(&table, &mut child.columns, &element_path, scalar);
                    }
                }
            }
            store.finalize_row(&child.handle, &child.columns)?;
        }
        Ok(())
    }

    /// Queue `value` for the column `path` projects to, or drop it when the
    /// layout has no such column.
    fn put(&mut self, table: &str, columns: &mut Columns, path: &Path, value: ColumnValue) {
        let column = path.column_name();
        if self.layout.has_column(table, &column) {
            columns.push((column, value));
        } else {
            self.drop_value(table, &column, 1);
        }
    }

    fn drop_value(&mut self, table: &str, column: &str, count: usize) {
        self.stats.values_dropped += count;
        if self.reported.insert((table.to_string(), column.to_string())) {
            warn!(
                "No planned column {}.{} for sampled-out values, dropping them",
                table, column
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteBackend;
    use crate::export::SQLExporter;
    use crate::inference::infer_schema;
    use crate::plan::plan_schema;
    use crate::progress::NoProgress;
    use crate::source::MemorySource;
    use serde_json::json;

    fn load(records: &[JsonValue], table: &str, key: &str) -> (SqliteBackend, IngestStats) {
        let source = MemorySource::from_values(records);
        let schema = infer_schema(&source).unwrap();
        let layout = plan_schema(&schema, table, key).unwrap();

        let mut store = SqliteBackend::in_memory().unwrap();
        for statement in SQLExporter::statements(&layout).unwrap() {
            store.execute(&statement).unwrap();
        }
        let stats = Ingestor::new(&layout, key)
            .ingest(&source, &mut store, &mut NoProgress)
            .unwrap();
        (store, stats)
    }

    /// Records every call made against the store
    #[derive(Default)]
    struct RecordingStore {
        next_id: i64,
        calls: Vec<String>,
    }

    impl RowStore for RecordingStore {
        fn execute(&mut self, statement: &str) -> Result<(), DatabaseError> {
            self.calls.push(format!("execute {}", statement));
            Ok(())
        }

        fn begin(&mut self) -> Result<(), DatabaseError> {
            self.calls.push("begin".to_string());
            Ok(())
        }

        fn begin_row(
            &mut self,
            table: &str,
            parent: Option<i64>,
            columns: &[(String, ColumnValue)],
        ) -> Result<RowHandle, DatabaseError> {
            self.next_id += 1;
            let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
            self.calls.push(format!(
                "insert {} #{} parent={:?} [{}]",
                table,
                self.next_id,
                parent,
                names.join(",")
            ));
            Ok(RowHandle {
                table: table.to_string(),
                row_id: self.next_id,
            })
        }

        fn finalize_row(
            &mut self,
            row: &RowHandle,
            columns: &[(String, ColumnValue)],
        ) -> Result<(), DatabaseError> {
            if !columns.is_empty() {
                let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
                self.calls
                    .push(format!("update {} #{} [{}]", row.table, row.row_id, names.join(",")));
            }
            Ok(())
        }

        fn commit(&mut self) -> Result<(), DatabaseError> {
            self.calls.push("commit".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_rows_are_created_then_filled() {
        let records = vec![json!({"id": 1, "meta": {"a": "x"}, "refs": [{"url": "u"}, "loose"]})];
        let source = MemorySource::from_values(&records);
        let layout = plan_schema(&infer_schema(&source).unwrap(), "main", "id").unwrap();

        let mut store = RecordingStore::default();
        let stats = Ingestor::new(&layout, "id")
            .ingest(&source, &mut store, &mut NoProgress)
            .unwrap();

        assert_eq!(
            store.calls,
            vec![
                "begin",
                "insert main #1 parent=None [id]",
                "insert main__refs #2 parent=Some(1) []",
                "update main__refs #2 [url]",
                "insert main__refs #3 parent=Some(1) []",
                "update main #1 [meta__a]",
                "commit",
            ]
        );
        // "loose" has no planned __value__ column in main__refs
        assert_eq!(stats.values_dropped, 1);
        assert_eq!(stats.rows_written, 3);
    }

    #[test]
    fn test_duplicate_keys_keep_first_record() {
        let (store, stats) = load(
            &[
                json!({"id": 1, "v": "a"}),
                json!({"id": 1, "v": "b"}),
                json!({"id": 2, "v": "c"}),
            ],
            "items",
            "id",
        );

        assert_eq!(stats.records_read, 3);
        assert_eq!(stats.records_ingested, 2);
        assert_eq!(stats.duplicates_skipped, 1);

        let rows = store.query_rows("SELECT id, v FROM items ORDER BY id").unwrap();
        assert_eq!(rows, vec![json!({"id": 1, "v": "a"}), json!({"id": 2, "v": "c"})]);
    }

    #[test]
    fn test_numeric_spellings_of_a_key_are_duplicates() {
        let (store, stats) = load(
            &[
                json!({"id": 1, "v": "a"}),
                json!({"id": 1.0, "v": "b"}),
                json!({"id": true, "v": "c"}),
                json!({"id": 2.5, "v": "d"}),
            ],
            "items",
            "id",
        );

        assert_eq!(stats.records_ingested, 2);
        assert_eq!(stats.duplicates_skipped, 2);
        let rows = store.query_rows("SELECT id, v FROM items ORDER BY id").unwrap();
        assert_eq!(rows, vec![json!({"id": 1, "v": "a"}), json!({"id": 2.5, "v": "d"})]);
    }

    #[test]
    fn test_mixed_values_are_stored_as_json_text() {
        let (store, _) = load(
            &[json!({"id": 1, "x": "hello"}), json!({"id": 2, "x": 42})],
            "items",
            "id",
        );
        let rows = store.query_rows("SELECT x FROM items ORDER BY id").unwrap();
        assert_eq!(rows, vec![json!({"x": "\"hello\""}), json!({"x": "42"})]);
    }

    #[test]
    fn test_nested_lists_are_decomposed() {
        let (store, _) = load(
            &[json!({"id": "A", "tags": ["red", "blue"]})],
            "items",
            "id",
        );

        let root = store.query_rows("SELECT rowid, id FROM items").unwrap();
        assert_eq!(root.len(), 1);
        let root_id = root[0]["rowid"].clone();

        let tags = store
            .query_rows("SELECT __value__, __parent__ FROM items__tags ORDER BY rowid")
            .unwrap();
        assert_eq!(
            tags,
            vec![
                json!({"__value__": "red", "__parent__": root_id}),
                json!({"__value__": "blue", "__parent__": root_id}),
            ]
        );
    }

    #[test]
    fn test_empty_list_and_object_write_only_root() {
        let (store, stats) = load(&[json!({"id": 1, "a": [], "b": {}})], "items", "id");
        assert_eq!(store.table_names().unwrap(), vec!["items"]);
        assert_eq!(stats.rows_written, 1);
        let rows = store.query_rows("SELECT * FROM items").unwrap();
        assert_eq!(rows, vec![json!({"id": 1})]);
    }

    #[test]
    fn test_null_values_are_not_written() {
        let (store, _) = load(
            &[
                json!({"id": 1, "v": "a", "tags": ["x", null]}),
                json!({"id": 2, "v": null, "tags": null}),
            ],
            "items",
            "id",
        );
        let rows = store.query_rows("SELECT id, v FROM items ORDER BY id").unwrap();
        assert_eq!(rows[1], json!({"id": 2, "v": null}));
        assert_eq!(store.row_counts(&["items__tags"]).unwrap()[0].1, 1);
    }

    #[test]
    fn test_booleans_are_stored_as_numbers() {
        let (store, _) = load(&[json!({"id": 1, "ok": true}), json!({"id": 2, "ok": false})], "t", "id");
        let rows = store.query_rows("SELECT ok FROM t ORDER BY id").unwrap();
        assert_eq!(rows, vec![json!({"ok": 1}), json!({"ok": 0})]);
    }

    #[test]
    fn test_list_of_lists_is_serialized() {
        let (store, _) = load(&[json!({"id": 1, "m": [[1, 2], [3]]})], "t", "id");
        let rows = store
            .query_rows("SELECT __value__ FROM t__m ORDER BY rowid")
            .unwrap();
        assert_eq!(rows, vec![json!({"__value__": "[1,2]"}), json!({"__value__": "[3]"})]);
    }

    #[test]
    fn test_grandchild_rows_reference_their_parent_row() {
        let (store, _) = load(
            &[json!({"id": 1, "refs": [{"url": "a", "tags": ["x", "y"]}, {"url": "b", "tags": ["z"]}]})],
            "t",
            "id",
        );
        let rows = store
            .query_rows(
                "SELECT r.url AS url, g.__value__ AS tag FROM t__refs r \
                 JOIN t__refs__0__tags g ON g.__parent__ = r.rowid ORDER BY g.rowid",
            )
            .unwrap();
        assert_eq!(
            rows,
            vec![
                json!({"url": "a", "tag": "x"}),
                json!({"url": "a", "tag": "y"}),
                json!({"url": "b", "tag": "z"}),
            ]
        );
    }

    #[test]
    fn test_missing_primary_key_is_fatal() {
        let layout_source = MemorySource::from_values(&[json!({"id": 1})]);
        let layout = plan_schema(&infer_schema(&layout_source).unwrap(), "t", "id").unwrap();

        let source = MemorySource::from_values(&[json!({"id": 1}), json!({"other": 2})]);
        let mut store = RecordingStore::default();
        let err = Ingestor::new(&layout, "id")
            .ingest(&source, &mut store, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, IngestError::MissingPrimaryKey { record: 1, .. }));
        assert!(!store.calls.contains(&"commit".to_string()));
    }

    #[test]
    fn test_null_primary_key_is_missing() {
        let layout_source = MemorySource::from_values(&[json!({"id": 1})]);
        let layout = plan_schema(&infer_schema(&layout_source).unwrap(), "t", "id").unwrap();

        let mut ingestor = Ingestor::new(&layout, "id");
        let mut store = RecordingStore::default();
        let err = ingestor
            .ingest_record(0, &json!({"id": null}), &mut store)
            .unwrap_err();
        assert!(matches!(err, IngestError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let layout_source = MemorySource::from_values(&[json!({"id": 1})]);
        let layout = plan_schema(&infer_schema(&layout_source).unwrap(), "t", "id").unwrap();

        let mut ingestor = Ingestor::new(&layout, "id");
        let mut store = RecordingStore::default();
        let err = ingestor
            .ingest_record(3, &json!([1, 2]), &mut store)
            .unwrap_err();
        assert!(matches!(err, IngestError::NotAnObject { record: 3 }));
    }

    #[test]
    fn test_nested_primary_key() {
        let (store, stats) = load(
            &[
                json!({"meta": {"id": "a"}, "v": 1}),
                json!({"meta": {"id": "a"}, "v": 2}),
            ],
            "t",
            "meta.id",
        );
        assert_eq!(stats.duplicates_skipped, 1);
        let rows = store.query_rows("SELECT meta__id, v FROM t").unwrap();
        assert_eq!(rows, vec![json!({"meta__id": "a", "v": 1})]);
    }

    #[test]
    fn test_duration_string() {
        let mut stats = IngestStats::new();
        stats.duration = Duration::from_secs(3725);
        assert_eq!(stats.duration_string(), "1h 2m 5s");
        stats.duration = Duration::from_secs(42);
        assert_eq!(stats.duration_string(), "42s");
        assert_eq!(stats.throughput(), 0.0);
    }
}
