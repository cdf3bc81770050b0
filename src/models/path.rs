//! Typed record paths and their projection onto table and column names

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::input::sanitize_identifier;

/// Separator used when joining path segments into table or column names
pub const COLUMN_PATH_JOINER: &str = "__";

/// Reserved column holding an array element's own value
pub const VALUE_COLUMN: &str = "__value__";

/// Reserved column holding the parent row identifier in child tables
pub const PARENT_COLUMN: &str = "__parent__";

/// Name rendering of the array element placeholder
const INDEX_MARKER: &str = "0";

/// One step of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    /// Object member
    Field(String),
    /// Any element of an array
    Index,
}

impl Segment {
    fn render(&self) -> &str {
        match self {
            Segment::Field(name) => name,
            Segment::Index => INDEX_MARKER,
        }
    }
}

/// Location of a value inside a record, from the record root.
///
/// Every [`Segment::Index`] crossed by a path is a table boundary: the value
/// lives in a child table named after the segments before that index. Names
/// are derived only through [`Path::table_name`] and [`Path::column_name`],
/// which keeps the planner and the ingestion engine in agreement.
///
/// # Example
///
/// ```rust
/// use json2sqlite::models::Path;
///
/// let path = Path::root().field("refs").index().field("url");
/// assert_eq!(path.table_name("cves"), "cves__refs");
/// assert_eq!(path.column_name(), "url");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The empty path, addressing the record itself
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path of object members from a dot-separated key path
    pub fn from_key_path(dotted: &str) -> Self {
        Self {
            segments: dotted
                .split('.')
                .map(|s| Segment::Field(s.to_string()))
                .collect(),
        }
    }

    /// Child path through the object member `name`
    pub fn field(&self, name: &str) -> Path {
        self.with(Segment::Field(name.to_string()))
    }

    /// Child path through the array element placeholder
    pub fn index(&self) -> Path {
        self.with(Segment::Index)
    }

    fn with(&self, segment: Segment) -> Path {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Path { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of array boundaries crossed
    pub fn depth(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Index))
            .count()
    }

    fn last_index(&self) -> Option<usize> {
        self.segments
            .iter()
            .rposition(|s| matches!(s, Segment::Index))
    }

    /// Name of the table a value at this path is stored in
    pub fn table_name(&self, main_table: &str) -> String {
        match self.last_index() {
            None => sanitize_identifier(main_table),
            Some(end) => Self::child_table_name(main_table, &self.segments[..end]),
        }
    }

    /// Names of every table from the root down to the one holding this path
    pub fn table_chain(&self, main_table: &str) -> Vec<String> {
        let mut chain = vec![sanitize_identifier(main_table)];
        for (i, segment) in self.segments.iter().enumerate() {
            if matches!(segment, Segment::Index) {
                chain.push(Self::child_table_name(main_table, &self.segments[..i]));
            }
        }
        chain
    }

    /// Array paths behind each entry of [`Path::table_chain`], the root
    /// path first
    pub fn array_prefixes(&self) -> Vec<Path> {
        let mut prefixes = vec![Path::root()];
        for (i, segment) in self.segments.iter().enumerate() {
            if matches!(segment, Segment::Index) {
                prefixes.push(Path {
                    segments: self.segments[..=i].to_vec(),
                });
            }
        }
        prefixes
    }

    /// Name of the column a value at this path is stored in
    pub fn column_name(&self) -> String {
        let start = self.last_index().map(|i| i + 1).unwrap_or(0);
        let tail = &self.segments[start..];
        if tail.is_empty() {
            return VALUE_COLUMN.to_string();
        }
        sanitize_identifier(&join(tail))
    }

    fn child_table_name(main_table: &str, prefix: &[Segment]) -> String {
        sanitize_identifier(&format!(
            "{}{}{}",
            main_table,
            COLUMN_PATH_JOINER,
            join(prefix)
        ))
    }
}

fn join(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(Segment::render)
        .collect::<Vec<_>>()
        .join(COLUMN_PATH_JOINER)
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<&str> = self.segments.iter().map(Segment::render).collect();
        f.write_str(&rendered.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path_maps_to_main_table() {
        let path = Path::root().field("id");
        assert_eq!(path.table_name("cves"), "cves");
        assert_eq!(path.column_name(), "id");
        assert_eq!(path.depth(), 0);
    }

    #[test]
    fn test_nested_object_columns_are_joined() {
        let path = Path::root().field("impact").field("base score");
        assert_eq!(path.table_name("cves"), "cves");
        assert_eq!(path.column_name(), "impact__base_score");
    }

    #[test]
    fn test_array_of_scalars_uses_value_column() {
        let path = Path::root().field("tags").index();
        assert_eq!(path.table_name("cves"), "cves__tags");
        assert_eq!(path.column_name(), VALUE_COLUMN);
    }

    #[test]
    fn test_nested_tables_reuse_index_marker() {
        let path = Path::root()
            .field("a")
            .index()
            .field("b")
            .index()
            .field("c");
        assert_eq!(path.table_name("main"), "main__a__0__b");
        assert_eq!(path.column_name(), "c");
        assert_eq!(
            path.table_chain("main"),
            vec!["main", "main__a", "main__a__0__b"]
        );
        assert_eq!(path.depth(), 2);
        assert_eq!(
            path.array_prefixes(),
            vec![
                Path::root(),
                Path::root().field("a").index(),
                Path::root().field("a").index().field("b").index(),
            ]
        );
    }

    #[test]
    fn test_table_names_are_sanitized() {
        let path = Path::root().field("related-items").index();
        assert_eq!(path.table_name("my table"), "my_table__related_items");
        assert_eq!(Path::root().table_name("my table"), "my_table");
    }

    #[test]
    fn test_from_key_path() {
        let path = Path::from_key_path("meta.id");
        assert_eq!(path, Path::root().field("meta").field("id"));
        assert_eq!(path.column_name(), "meta__id");
    }

    #[test]
    fn test_display() {
        let path = Path::root().field("a").index().field("b");
        assert_eq!(path.to_string(), "a.0.b");
        assert!(Path::root().is_root());
    }

    #[test]
    fn test_child_paths_do_not_alias_parent() {
        let parent = Path::root().field("a");
        let child = parent.field("b");
        assert_eq!(parent.segments().len(), 1);
        assert_eq!(child.segments().len(), 2);
    }
}
