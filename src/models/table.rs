//! Planned table and column model

use serde::{Deserialize, Serialize};
use std::fmt;

use super::schema_type::SchemaType;

/// Storage class of a planned column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Text scalar
    Text,
    /// Numeric scalar
    Number,
    /// JSON serialization of a conflicting or nested-list value
    Opaque,
}

impl StorageType {
    /// Storage type for a scalar schema type, `None` for containers and `Null`
    pub fn for_schema(schema: &SchemaType) -> Option<Self> {
        match schema {
            SchemaType::Text => Some(StorageType::Text),
            SchemaType::Number => Some(StorageType::Number),
            SchemaType::Mixed => Some(StorageType::Opaque),
            _ => None,
        }
    }

    /// SQL type name used in creation statements
    pub fn sql_type(&self) -> &'static str {
        match self {
            StorageType::Text | StorageType::Opaque => "TEXT",
            StorageType::Number => "NUMBER",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Text => write!(f, "text"),
            StorageType::Number => write!(f, "number"),
            StorageType::Opaque => write!(f, "opaque-text"),
        }
    }
}

/// Column of a planned table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedColumn {
    /// Sanitized column name
    pub name: String,
    /// Storage class
    pub storage: StorageType,
    /// Whether this is the configured primary key (root table only)
    #[serde(default)]
    pub primary_key: bool,
}

impl PlannedColumn {
    pub fn new(name: impl Into<String>, storage: StorageType) -> Self {
        Self {
            name: name.into(),
            storage,
            primary_key: false,
        }
    }
}

/// Table produced by the planner
///
/// The implicit `__parent__` column of child tables is not listed in
/// `columns`; it is added by the creation statement and by the row store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePlan {
    /// Sanitized table name
    pub name: String,
    /// Columns in creation order
    pub columns: Vec<PlannedColumn>,
    /// Parent table name, `None` for the root table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl TablePlan {
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            parent,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Find a column by name
    pub fn column(&self, name: &str) -> Option<&PlannedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The primary key column, if one was designated
    pub fn primary_key(&self) -> Option<&PlannedColumn> {
        self.columns.iter().find(|c| c.primary_key)
    }
}
