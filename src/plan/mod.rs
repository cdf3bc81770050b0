//! Table planning.
//!
//! Turns a merged [`SchemaType`] into a [`TableLayout`]: the root table, one
//! child table per array boundary, the parent hierarchy between them and the
//! set of barrier paths stored opaquely.
//!
//! Planning is a pure function of the flattened schema, the main table name
//! and the primary-key path.

mod flatten;
mod graph;

pub use flatten::{BarrierSet, FlatColumn, flatten};
pub use graph::ParentGraph;

use std::collections::HashMap;

use tracing::debug;

use crate::models::{PARENT_COLUMN, Path, PlannedColumn, SchemaType, TablePlan};
use crate::validation::input::{ValidationError, validate_key_path, validate_table_name};

/// Error during table planning
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The primary-key path does not name a column of the root table
    #[error("Primary key '{path}' does not match any column of table '{table}'")]
    MissingPrimaryKey { path: String, table: String },

    /// Two distinct paths project onto the same column
    #[error("Path '{path}' collides with existing column '{column}' of table '{table}'")]
    ColumnCollision {
        table: String,
        column: String,
        path: String,
    },

    /// Two distinct array paths project onto the same table name
    #[error("Table '{table}' is derived from more than one array path")]
    TableCollision { table: String },

    #[error("Parent table '{parent}' of '{table}' is not planned")]
    UnknownParent { table: String, parent: String },

    #[error("Table hierarchy contains a cycle through '{table}'")]
    Cycle { table: String },
}

/// Output of the planner
#[derive(Debug, Clone)]
pub struct TableLayout {
    main_table: String,
    tables: Vec<TablePlan>,
    index: HashMap<String, usize>,
    parents: ParentGraph,
    barriers: BarrierSet,
}

impl TableLayout {
    /// Sanitized name of the root table
    pub fn main_table(&self) -> &str {
        &self.main_table
    }

    /// Planned tables, ordered by depth then first appearance
    pub fn tables(&self) -> &[TablePlan] {
        &self.tables
    }

    pub fn root(&self) -> &TablePlan {
        &self.tables[0]
    }

    pub fn table(&self, name: &str) -> Option<&TablePlan> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.table(table).is_some_and(|t| t.has_column(column))
    }

    pub fn parents(&self) -> &ParentGraph {
        &self.parents
    }

    pub fn barriers(&self) -> &BarrierSet {
        &self.barriers
    }

    pub fn is_barrier(&self, path: &Path) -> bool {
        self.barriers.contains(path)
    }

    /// Tables in an order where every parent precedes its children
    pub fn creation_order(&self) -> Result<Vec<&TablePlan>, PlanError> {
        Ok(self
            .parents
            .creation_order()?
            .into_iter()
            .filter_map(|name| self.table(name))
            .collect())
    }
}

/// Flatten and plan a merged schema in one step.
///
/// # Example
///
/// ```rust
/// use json2sqlite::inference::infer_one;
/// use json2sqlite::plan::plan_schema;
/// use serde_json::json;
///
/// let schema = infer_one(&json!({"id": "CVE-1", "refs": [{"url": "u"}]}));
/// let layout = plan_schema(&schema, "cves", "id").unwrap();
/// assert_eq!(layout.tables().len(), 2);
/// assert!(layout.has_column("cves__refs", "url"));
/// assert_eq!(layout.parents().parent("cves__refs"), Some("cves"));
/// ```
pub fn plan_schema(
    schema: &SchemaType,
    main_table: &str,
    primary_key: &str,
) -> Result<TableLayout, PlanError> {
    let (columns, barriers) = flatten(schema);
    plan(&columns, barriers, main_table, primary_key)
}

/// Build the table layout from flattened columns.
///
/// Every path becomes a chain of tables, one per array boundary it crosses.
/// The column lands in the last table of its chain under
/// [`Path::column_name`]. The primary-key path is projected the same way
/// and must match a column of the root table.
pub fn plan(
    columns: &[FlatColumn],
    barriers: BarrierSet,
    main_table: &str,
    primary_key: &str,
) -> Result<TableLayout, PlanError> {
    validate_table_name(main_table)?;
    validate_key_path(primary_key)?;

    let root_name = Path::root().table_name(main_table);
    let mut tables = vec![TablePlan::new(root_name.clone(), None)];
    let mut index = HashMap::from([(root_name.clone(), 0)]);
    let mut parents = ParentGraph::new();
    parents.add_table(&root_name, None)?;
    // Array path each table was created for
    let mut origins: HashMap<String, Path> = HashMap::from([(root_name.clone(), Path::root())]);

    // Stable sort keeps flattening order within each depth.
    let mut ordered: Vec<(Vec<String>, &FlatColumn)> = columns
        .iter()
        .map(|c| (c.path.table_chain(main_table), c))
        .collect();
    ordered.sort_by_key(|(chain, _)| chain.len());

    for (chain, flat) in ordered {
        let mut parent: Option<&str> = None;
        for (name, origin) in chain.iter().zip(flat.path.array_prefixes()) {
            match origins.get(name) {
                None => {
                    parents.add_table(name, parent)?;
                    index.insert(name.clone(), tables.len());
                    tables.push(TablePlan::new(name.clone(), parent.map(str::to_string)));
                    debug!(table = %name, parent = ?parent, "Planned table");
                    origins.insert(name.clone(), origin);
                }
                Some(existing) if *existing != origin => {
                    return Err(PlanError::TableCollision {
                        table: name.clone(),
                    });
                }
                Some(_) => {}
            }
            parent = Some(name);
        }

        let Some(holder) = chain.last() else {
            continue;
        };
        let table = &mut tables[index[holder]];
        let column = flat.path.column_name();
        if table.has_column(&column) || (!table.is_root() && column == PARENT_COLUMN) {
            return Err(PlanError::ColumnCollision {
                table: table.name.clone(),
                column,
                path: flat.path.to_string(),
            });
        }
        table.columns.push(PlannedColumn::new(column, flat.storage));
    }

    let key_column = Path::from_key_path(primary_key).column_name();
    match tables[0].columns.iter_mut().find(|c| c.name == key_column) {
        Some(column) => column.primary_key = true,
        None => {
            return Err(PlanError::MissingPrimaryKey {
                path: primary_key.to_string(),
                table: root_name,
            });
        }
    }

    debug!(
        tables = tables.len(),
        barriers = barriers.len(),
        "Table layout planned"
    );

    Ok(TableLayout {
        main_table: root_name,
        tables,
        index,
        parents,
        barriers,
    })
}
