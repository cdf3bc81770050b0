//! Models for inferred schemas, record paths and planned tables

pub mod path;
pub mod schema_type;
pub mod table;

pub use path::{COLUMN_PATH_JOINER, PARENT_COLUMN, Path, Segment, VALUE_COLUMN};
pub use schema_type::SchemaType;
pub use table::{PlannedColumn, StorageType, TablePlan};
