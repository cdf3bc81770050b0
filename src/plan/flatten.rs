//! Depth-first flattening of a merged schema into leaf columns

use std::collections::BTreeSet;

use tracing::warn;

use crate::models::{Path, SchemaType, StorageType};

/// Paths whose observations conflicted; stored as one opaque column each
pub type BarrierSet = BTreeSet<Path>;

/// A leaf of the merged schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatColumn {
    /// Location of the leaf from the record root
    pub path: Path,
    /// How the leaf is stored
    pub storage: StorageType,
}

/// Flatten `schema` into leaf columns, in sorted member order.
///
/// - `Text` and `Number` leaves become typed columns.
/// - `Mixed` leaves become opaque columns and are added to the barrier set;
///   nothing below them is visited.
/// - A list descends through an index segment. A list of lists stops at the
///   outer element, which is stored serialized as an opaque own-value column.
/// - `Null` leaves carry no type and produce no column.
///
/// # Example
///
/// ```rust
/// use json2sqlite::inference::infer_one;
/// use json2sqlite::plan::flatten;
/// use serde_json::json;
///
/// let (columns, barriers) = flatten(&infer_one(&json!({"id": 1, "tags": ["a"]})));
/// let paths: Vec<String> = columns.iter().map(|c| c.path.to_string()).collect();
/// assert_eq!(paths, vec!["id", "tags.0"]);
/// assert!(barriers.is_empty());
/// ```
pub fn flatten(schema: &SchemaType) -> (Vec<FlatColumn>, BarrierSet) {
    let mut columns = Vec::new();
    let mut barriers = BarrierSet::new();
    walk(schema, Path::root(), &mut columns, &mut barriers);
    (columns, barriers)
}

fn walk(node: &SchemaType, path: Path, columns: &mut Vec<FlatColumn>, barriers: &mut BarrierSet) {
    match node {
        SchemaType::Null => {}
        SchemaType::Text | SchemaType::Number | SchemaType::Mixed => {
            let Some(storage) = StorageType::for_schema(node) else {
                return;
            };
            if storage == StorageType::Opaque {
                warn!("Conflicting types at '{}', storing as opaque text", path);
                barriers.insert(path.clone());
            }
            columns.push(FlatColumn { path, storage });
        }
        SchemaType::Object(members) => {
            for (name, member) in members {
                walk(member, path.field(name), columns, barriers);
            }
        }
        SchemaType::List(element) => {
            let element_path = path.index();
            if let SchemaType::List(_) = element.as_ref() {
                columns.push(FlatColumn {
                    path: element_path,
                    storage: StorageType::Opaque,
                });
            } else {
                walk(element, element_path, columns, barriers);
            }
        }
    }
}
