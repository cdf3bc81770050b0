//! Relational store abstraction
//!
//! Ingestion writes through the [`RowStore`] trait. A row is created first,
//! which yields its store-assigned row identifier, and completed later with
//! the columns discovered while its nested values were visited:
//!
//! 1. [`RowStore::begin_row`] inserts the row with the columns known up front
//! 2. child rows reference the returned [`RowHandle`] as their parent
//! 3. [`RowStore::finalize_row`] fills in the remaining columns
//!
//! [`SqliteBackend`] is the SQLite implementation.

use serde_json::Value as JsonValue;
use std::path::PathBuf;

pub mod config;
pub mod sqlite;

pub use config::{SqliteSection, SynchronousMode};
pub use sqlite::SqliteBackend;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to open the database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction could not be started or committed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// The output database already exists
    #[error("Output database already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// A scalar written to a column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl ColumnValue {
    /// Storage value of a JSON scalar; `None` for null and containers.
    ///
    /// Booleans are stored as `1` and `0`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use json2sqlite::database::ColumnValue;
    /// use serde_json::json;
    ///
    /// assert_eq!(ColumnValue::from_json(&json!(true)), Some(ColumnValue::Integer(1)));
    /// assert_eq!(ColumnValue::from_json(&json!(2.5)), Some(ColumnValue::Real(2.5)));
    /// assert_eq!(ColumnValue::from_json(&json!(null)), None);
    /// ```
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => Some(ColumnValue::Text(s.clone())),
            JsonValue::Bool(b) => Some(ColumnValue::Integer(i64::from(*b))),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Some(ColumnValue::Integer(i)),
                None => n.as_f64().map(ColumnValue::Real),
            },
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    /// Opaque storage value: the compact JSON serialization of `value`
    pub fn opaque(value: &JsonValue) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

/// Column name and value pairs written by one statement
pub type Columns = Vec<(String, ColumnValue)>;

/// A row created by [`RowStore::begin_row`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowHandle {
    /// Table the row lives in
    pub table: String,
    /// Store-assigned row identifier
    pub row_id: i64,
}

/// Write access to the target store used by ingestion
pub trait RowStore {
    /// Execute a statement outside of row writes, such as a table creation
    fn execute(&mut self, statement: &str) -> DatabaseResult<()>;

    /// Start the transaction covering all following row writes
    fn begin(&mut self) -> DatabaseResult<()>;

    /// Insert a row, returning its store-assigned identifier.
    ///
    /// `parent` is written to the `__parent__` column of child tables.
    fn begin_row(
        &mut self,
        table: &str,
        parent: Option<i64>,
        columns: &[(String, ColumnValue)],
    ) -> DatabaseResult<RowHandle>;

    /// Write the columns discovered after the row was created
    fn finalize_row(
        &mut self,
        row: &RowHandle,
        columns: &[(String, ColumnValue)],
    ) -> DatabaseResult<()>;

    /// Commit the transaction started by [`RowStore::begin`]
    fn commit(&mut self) -> DatabaseResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(
            ColumnValue::from_json(&json!("x")),
            Some(ColumnValue::Text("x".to_string()))
        );
        assert_eq!(
            ColumnValue::from_json(&json!(false)),
            Some(ColumnValue::Integer(0))
        );
        assert_eq!(
            ColumnValue::from_json(&json!(42)),
            Some(ColumnValue::Integer(42))
        );
        assert_eq!(ColumnValue::from_json(&json!([1])), None);
        assert_eq!(ColumnValue::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_large_unsigned_falls_back_to_real() {
        let value = json!(u64::MAX);
        assert!(matches!(
            ColumnValue::from_json(&value),
            Some(ColumnValue::Real(_))
        ));
    }

    #[test]
    fn test_opaque_is_json_text() {
        assert_eq!(
            ColumnValue::opaque(&json!("hello")),
            ColumnValue::Text("\"hello\"".to_string())
        );
        assert_eq!(
            ColumnValue::opaque(&json!({"a": [1, 2]})),
            ColumnValue::Text(r#"{"a":[1,2]}"#.to_string())
        );
    }
}
