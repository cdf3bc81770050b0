//! SQLite database backend implementation
//!
//! Provides the embedded target store for ingestion. Supports file-based
//! output and in-memory mode.

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::config::SqliteSection;
use super::{ColumnValue, DatabaseError, DatabaseResult, QueryRow, RowHandle, RowStore};
use crate::models::PARENT_COLUMN;
use crate::validation::input::quote_identifier;

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ColumnValue::Text(s) => ToSqlOutput::from(s.as_str()),
            ColumnValue::Integer(i) => ToSqlOutput::from(*i),
            ColumnValue::Real(f) => ToSqlOutput::from(*f),
        })
    }
}

/// SQLite database backend
///
/// Foreign keys declared by the generated tables reference `rowid`, which
/// SQLite cannot enforce; enforcement is switched off on every connection.
pub struct SqliteBackend {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    connection: Connection,
    in_transaction: bool,
}

impl SqliteBackend {
    /// Create a new database file at `db_path`.
    ///
    /// Fails with [`DatabaseError::AlreadyExists`] when the file exists; a
    /// job always starts from an empty store.
    pub fn create(db_path: impl AsRef<Path>, settings: &SqliteSection) -> DatabaseResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        if path.exists() {
            return Err(DatabaseError::AlreadyExists(path));
        }

        let connection = Connection::open(&path).map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open SQLite database: {}", e))
        })?;
        Self::configure(&connection, settings)?;

        Ok(Self {
            db_path: Some(path),
            connection,
            in_transaction: false,
        })
    }

    /// Create an in-memory SQLite backend
    pub fn in_memory() -> DatabaseResult<Self> {
        Self::in_memory_with(&SqliteSection::default())
    }

    pub fn in_memory_with(settings: &SqliteSection) -> DatabaseResult<Self> {
        let connection = Connection::open_in_memory().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to create in-memory SQLite: {}", e))
        })?;
        Self::configure(&connection, settings)?;

        Ok(Self {
            db_path: None,
            connection,
            in_transaction: false,
        })
    }

    fn configure(connection: &Connection, settings: &SqliteSection) -> DatabaseResult<()> {
        connection
            .pragma_update(None, "foreign_keys", "OFF")
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Pragma failed: {}", e)))?;
        connection
            .pragma_update(None, "synchronous", settings.synchronous.as_pragma())
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Pragma failed: {}", e)))?;
        connection.set_prepared_statement_cache_capacity(settings.statement_cache_capacity);
        debug!(
            synchronous = %settings.synchronous,
            cache = settings.statement_cache_capacity,
            "SQLite connection configured"
        );
        Ok(())
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Check if this is an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    /// Run a query and return every row as a JSON object keyed by column name
    pub fn query_rows(&self, sql: &str) -> DatabaseResult<Vec<QueryRow>> {
        let mut stmt = self
            .connection
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query([])
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let mut result = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            result.push(Self::row_to_json(row, &columns)?);
        }
        Ok(result)
    }

    /// Number of rows in each of `tables`, in the given order
    pub fn row_counts<S: AsRef<str>>(&self, tables: &[S]) -> DatabaseResult<Vec<(String, usize)>> {
        tables
            .iter()
            .map(|table| {
                let table = table.as_ref();
                let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
                let count: i64 = self
                    .connection
                    .query_row(&sql, [], |row| row.get(0))
                    .map_err(|e| {
                        DatabaseError::QueryFailed(format!("Failed to count {}: {}", table, e))
                    })?;
                Ok((table.to_string(), count.max(0) as usize))
            })
            .collect()
    }

    /// Names of the user tables in the database, sorted
    pub fn table_names(&self) -> DatabaseResult<Vec<String>> {
        let rows = self.query_rows(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        Ok(rows
            .iter()
            .filter_map(|row| row["name"].as_str().map(String::from))
            .collect())
    }

    /// Convert a SQLite row to a JSON value
    fn row_to_json(row: &rusqlite::Row, columns: &[String]) -> DatabaseResult<QueryRow> {
        let mut map = serde_json::Map::new();

        for (i, col_name) in columns.iter().enumerate() {
            let value = match row.get_ref(i) {
                Ok(value_ref) => Self::value_ref_to_json(value_ref),
                Err(_) => serde_json::Value::Null,
            };
            map.insert(col_name.clone(), value);
        }

        Ok(serde_json::Value::Object(map))
    }

    /// Convert a SQLite ValueRef to a JSON value
    fn value_ref_to_json(value: ValueRef) -> serde_json::Value {
        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
            ValueRef::Real(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                String::from_utf8_lossy(bytes).into_owned().into()
            }
        }
    }

    fn query_failed(table: &str, e: rusqlite::Error) -> DatabaseError {
        DatabaseError::QueryFailed(format!("Write to {} failed: {}", table, e))
    }
}

impl RowStore for SqliteBackend {
    fn execute(&mut self, statement: &str) -> DatabaseResult<()> {
        self.connection
            .execute_batch(statement)
            .map_err(|e| DatabaseError::QueryFailed(format!("Execute failed: {}", e)))
    }

    fn begin(&mut self) -> DatabaseResult<()> {
        if self.in_transaction {
            return Err(DatabaseError::TransactionFailed(
                "Transaction already started".to_string(),
            ));
        }
        self.connection
            .execute_batch("BEGIN")
            .map_err(|e| DatabaseError::TransactionFailed(format!("Begin failed: {}", e)))?;
        self.in_transaction = true;
        Ok(())
    }

    fn begin_row(
        &mut self,
        table: &str,
        parent: Option<i64>,
        columns: &[(String, ColumnValue)],
    ) -> DatabaseResult<RowHandle> {
        let mut names: Vec<String> = columns.iter().map(|(n, _)| quote_identifier(n)).collect();
        let mut params: Vec<&dyn ToSql> = columns.iter().map(|(_, v)| v as &dyn ToSql).collect();
        if let Some(parent) = parent.as_ref() {
            names.push(quote_identifier(PARENT_COLUMN));
            params.push(parent);
        }

        let sql = if names.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(table))
        } else {
            let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_identifier(table),
                names.join(", "),
                placeholders.join(", ")
            )
        };

        let mut stmt = self
            .connection
            .prepare_cached(&sql)
            .map_err(|e| Self::query_failed(table, e))?;
        stmt.execute(params.as_slice())
            .map_err(|e| Self::query_failed(table, e))?;

        Ok(RowHandle {
            table: table.to_string(),
            row_id: self.connection.last_insert_rowid(),
        })
    }

    fn finalize_row(
        &mut self,
        row: &RowHandle,
        columns: &[(String, ColumnValue)],
    ) -> DatabaseResult<()> {
        if columns.is_empty() {
            return Ok(());
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ?{}", quote_identifier(name), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE rowid = ?{}",
            quote_identifier(&row.table),
            assignments.join(", "),
            columns.len() + 1
        );

        let mut params: Vec<&dyn ToSql> = columns.iter().map(|(_, v)| v as &dyn ToSql).collect();
        params.push(&row.row_id);

        let mut stmt = self
            .connection
            .prepare_cached(&sql)
            .map_err(|e| Self::query_failed(&row.table, e))?;
        let updated = stmt
            .execute(params.as_slice())
            .map_err(|e| Self::query_failed(&row.table, e))?;
        if updated != 1 {
            return Err(DatabaseError::InvalidInput(format!(
                "Row {} of {} does not exist",
                row.row_id, row.table
            )));
        }
        Ok(())
    }

    fn commit(&mut self) -> DatabaseResult<()> {
        if !self.in_transaction {
            return Err(DatabaseError::TransactionFailed(
                "No transaction to commit".to_string(),
            ));
        }
        self.connection
            .execute_batch("COMMIT")
            .map_err(|e| DatabaseError::TransactionFailed(format!("Commit failed: {}", e)))?;
        self.in_transaction = false;
        Ok(())
    }
}
