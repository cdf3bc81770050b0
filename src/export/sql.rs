//! SQL creation statements for a planned table layout.

use super::{ExportError, ExportResult};
use crate::models::{PARENT_COLUMN, TablePlan};
use crate::plan::TableLayout;
use crate::validation::input::{quote_identifier, validate_identifier};

/// Exporter for SQLite `CREATE TABLE` statements.
pub struct SQLExporter;

impl SQLExporter {
    /// Export a layout as one script, statements separated by `;`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use json2sqlite::export::sql::SQLExporter;
    /// use json2sqlite::inference::infer_one;
    /// use json2sqlite::plan::plan_schema;
    /// use serde_json::json;
    ///
    /// let schema = infer_one(&json!({"id": "CVE-1", "tags": ["a"]}));
    /// let layout = plan_schema(&schema, "cves", "id").unwrap();
    ///
    /// let result = SQLExporter.export(&layout).unwrap();
    /// assert_eq!(result.format, "sql");
    /// assert!(result.content.contains("CREATE TABLE [cves__tags]"));
    /// ```
    pub fn export(&self, layout: &TableLayout) -> Result<ExportResult, ExportError> {
        let statements = Self::statements(layout)?;
        Ok(ExportResult {
            content: format!("{};\n", statements.join(";\n\n")),
            format: "sql".to_string(),
        })
    }

    /// One creation statement per table, every parent before its children.
    pub fn statements(layout: &TableLayout) -> Result<Vec<String>, ExportError> {
        let order = layout
            .creation_order()
            .map_err(|e| ExportError::ExportError(e.to_string()))?;
        order.into_iter().map(Self::create_table).collect()
    }

    /// Creation statement for a single table.
    ///
    /// Columns follow plan order; the primary key is declared inline. A
    /// child table gets a trailing `__parent__ INTEGER` column referencing
    /// the parent's `rowid`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use json2sqlite::export::sql::SQLExporter;
    /// use json2sqlite::models::{PlannedColumn, StorageType, TablePlan};
    ///
    /// let mut table = TablePlan::new("cves__refs", Some("cves".to_string()));
    /// table.columns.push(PlannedColumn::new("url", StorageType::Text));
    ///
    /// let sql = SQLExporter::create_table(&table).unwrap();
    /// assert_eq!(
    ///     sql,
    ///     "CREATE TABLE [cves__refs] (\n    [url] TEXT,\n    [__parent__] INTEGER,\n    \
    ///      FOREIGN KEY([__parent__]) REFERENCES [cves](rowid)\n)"
    /// );
    /// ```
    pub fn create_table(table: &TablePlan) -> Result<String, ExportError> {
        Self::check_identifier("table name", &table.name)?;

        let mut definitions = Vec::with_capacity(table.columns.len() + 2);
        for column in &table.columns {
            Self::check_identifier("column name", &column.name)?;
            let mut definition = format!(
                "{} {}",
                quote_identifier(&column.name),
                column.storage.sql_type()
            );
            if column.primary_key {
                definition.push_str(" PRIMARY KEY");
            }
            definitions.push(definition);
        }

        if let Some(parent) = &table.parent {
            Self::check_identifier("table name", parent)?;
            let parent_column = quote_identifier(PARENT_COLUMN);
            definitions.push(format!("{} INTEGER", parent_column));
            definitions.push(format!(
                "FOREIGN KEY({}) REFERENCES {}(rowid)",
                parent_column,
                quote_identifier(parent)
            ));
        }

        if definitions.is_empty() {
            return Err(ExportError::ExportError(format!(
                "Table '{}' has no columns",
                table.name
            )));
        }

        Ok(format!(
            "CREATE TABLE {} (\n    {}\n)",
            quote_identifier(&table.name),
            definitions.join(",\n    ")
        ))
    }

    fn check_identifier(field: &'static str, name: &str) -> Result<(), ExportError> {
        validate_identifier(field, name).map_err(|e| ExportError::ValidationError(e.to_string()))
    }
}
