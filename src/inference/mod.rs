//! Schema inference from JSON records.
//!
//! Each record is classified into a [`SchemaType`] tree by [`infer_one`] and
//! folded into the running schema with [`SchemaType::merge`]. Only the
//! running schema and the record being inspected are held in memory.
//!
//! Arrays are sampled by their first element only: the element type of a
//! list is whatever its first element looks like, and later elements are
//! assumed to share that shape.

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::models::SchemaType;
use crate::progress::{NoProgress, Phase, Progress};
use crate::source::{RecordSource, SourceError};

/// Error during schema inference
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A record is not valid JSON
    #[error("Parse error in record {record}: {error}")]
    Parse { record: usize, error: String },
}

/// Classify a single JSON value.
///
/// Strings are `Text`; numbers and booleans are `Number`; arrays are a
/// `List` of their first element's type (`List(Null)` when empty); objects
/// map each member.
///
/// # Example
///
/// ```rust
/// use json2sqlite::inference::infer_one;
/// use json2sqlite::models::SchemaType;
/// use serde_json::json;
///
/// let schema = infer_one(&json!({"id": 1, "tags": ["a"]}));
/// assert_eq!(schema.to_string(), "{id: number, tags: list<text>}");
/// ```
pub fn infer_one(value: &JsonValue) -> SchemaType {
    match value {
        JsonValue::Null => SchemaType::Null,
        JsonValue::String(_) => SchemaType::Text,
        JsonValue::Number(_) | JsonValue::Bool(_) => SchemaType::Number,
        JsonValue::Array(items) => SchemaType::List(Box::new(
            items.first().map(infer_one).unwrap_or(SchemaType::Null),
        )),
        JsonValue::Object(members) => SchemaType::Object(
            members
                .iter()
                .map(|(name, member)| (name.clone(), infer_one(member)))
                .collect(),
        ),
    }
}

/// Running schema over a stream of records
#[derive(Debug, Default, Clone)]
pub struct SchemaInferencer {
    schema: SchemaType,
    records: usize,
}

impl SchemaInferencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one parsed record into the schema
    pub fn observe(&mut self, record: &JsonValue) {
        let observed = infer_one(record);
        let current = std::mem::take(&mut self.schema);
        self.schema = current.merge(observed);
        self.records += 1;
    }

    /// Parse and fold one raw record
    pub fn observe_text(&mut self, text: &str) -> Result<(), InferenceError> {
        let record: JsonValue =
            serde_json::from_str(text).map_err(|e| InferenceError::Parse {
                record: self.records,
                error: e.to_string(),
            })?;
        self.observe(&record);
        Ok(())
    }

    /// Schema merged so far
    pub fn schema(&self) -> &SchemaType {
        &self.schema
    }

    /// Number of records observed
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn finish(self) -> SchemaType {
        self.schema
    }
}

/// Infer the merged schema of every record in `source`.
pub fn infer_schema(source: &dyn RecordSource) -> Result<SchemaType, InferenceError> {
    infer_schema_with_progress(source, &mut NoProgress)
}

/// Infer the merged schema of every record in `source`, reporting progress.
pub fn infer_schema_with_progress(
    source: &dyn RecordSource,
    progress: &mut dyn Progress,
) -> Result<SchemaType, InferenceError> {
    let total = source.count()?;
    info!("Inferring schema from {} ({} records)", source.describe(), total);
    progress.start(Phase::Inference, total);

    let mut inferencer = SchemaInferencer::new();
    for item in source.items()? {
        inferencer.observe_text(&item?)?;
        progress.advance(1);
    }
    progress.finish();

    debug!(records = inferencer.records(), schema = %inferencer.schema(), "Schema inferred");
    Ok(inferencer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use serde_json::json;

    #[test]
    fn test_numbers_are_unified() {
        assert_eq!(infer_one(&json!(1)), SchemaType::Number);
        assert_eq!(infer_one(&json!(1.5)), SchemaType::Number);
        assert_eq!(infer_one(&json!(true)), SchemaType::Number);
        assert_eq!(
            infer_one(&json!(1)).merge(infer_one(&json!(2.5))),
            SchemaType::Number
        );
    }

    #[test]
    fn test_only_first_array_element_is_sampled() {
        let schema = infer_one(&json!(["a", 1, {"x": 1}]));
        assert_eq!(schema, SchemaType::List(Box::new(SchemaType::Text)));
    }

    #[test]
    fn test_empty_array_is_list_of_null() {
        assert_eq!(
            infer_one(&json!([])),
            SchemaType::List(Box::new(SchemaType::Null))
        );
    }

    #[test]
    fn test_mixed_field_across_records() {
        let source = MemorySource::from_values(&[json!({"id": 1, "x": "hello"}), json!({"id": 2, "x": 42})]);
        let schema = infer_schema(&source).unwrap();
        assert_eq!(schema.to_string(), "{id: number, x: mixed}");
    }

    #[test]
    fn test_schema_is_independent_of_record_order() {
        let records = vec![
            json!({"id": 1, "a": {"b": "x"}}),
            json!({"id": 2, "a": {"c": 3}, "tags": []}),
            json!({"id": 3, "tags": ["t"], "a": null}),
        ];
        let forward = infer_schema(&MemorySource::from_values(&records)).unwrap();

        let mut reversed = records.clone();
        reversed.reverse();
        let backward = infer_schema(&MemorySource::from_values(&reversed)).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_reobserving_a_record_is_idempotent() {
        let records = vec![
            json!({"id": 1, "tags": ["a"], "meta": {"k": "v"}}),
            json!({"id": 2, "x": [1, 2]}),
        ];
        let schema = infer_schema(&MemorySource::from_values(&records)).unwrap();
        for r in &records {
            assert_eq!(schema.clone().merge(infer_one(r)), schema);
        }
    }

    #[test]
    fn test_parse_error_reports_record_index() {
        let source = MemorySource::new(vec!["{\"id\": 1}".into(), "{not json".into()]);
        let err = infer_schema(&source).unwrap_err();
        assert!(matches!(err, InferenceError::Parse { record: 1, .. }));
    }

    #[test]
    fn test_empty_stream_is_null() {
        let schema = infer_schema(&MemorySource::default()).unwrap();
        assert_eq!(schema, SchemaType::Null);
    }
}
