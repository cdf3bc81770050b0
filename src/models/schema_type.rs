//! Inferred structural type lattice

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The inferred shape of the value found at a path.
///
/// `SchemaType` forms a join semi-lattice under [`SchemaType::merge`]:
/// `Null` is the identity, `Mixed` absorbs everything, equal scalar kinds
/// merge to themselves, lists merge element-wise and objects merge key-wise.
/// Any other combination is a conflict and yields `Mixed`.
///
/// Object members live in a sorted map so that two schemas built from the
/// same observations in a different order compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "lowercase")]
pub enum SchemaType {
    /// Nothing observed yet, or only `null`s / empty arrays
    #[default]
    Null,
    /// String scalar
    Text,
    /// Numeric scalar (integral, fractional and boolean input alike)
    Number,
    /// Homogeneous array of the given element type
    List(Box<SchemaType>),
    /// Object with named members
    Object(BTreeMap<String, SchemaType>),
    /// Conflicting observations; stored opaquely
    Mixed,
}

impl SchemaType {
    /// Least upper bound of two schema types.
    ///
    /// Total, commutative and associative; never fails.
    ///
    /// # Example
    ///
    /// ```rust
    /// use json2sqlite::models::SchemaType;
    ///
    /// assert_eq!(SchemaType::Null.merge(SchemaType::Text), SchemaType::Text);
    /// assert_eq!(SchemaType::Text.merge(SchemaType::Number), SchemaType::Mixed);
    /// ```
    pub fn merge(self, other: SchemaType) -> SchemaType {
        use SchemaType::*;

        match (self, other) {
            (Mixed, _) | (_, Mixed) => Mixed,
            (Null, other) | (other, Null) => other,
            (Text, Text) => Text,
            (Number, Number) => Number,
            (List(a), List(b)) => List(Box::new(a.merge(*b))),
            (Object(mut a), Object(b)) => {
                for (key, theirs) in b {
                    let merged = match a.remove(&key) {
                        Some(ours) => ours.merge(theirs),
                        None => theirs,
                    };
                    a.insert(key, merged);
                }
                Object(a)
            }
            _ => Mixed,
        }
    }

    /// Short name of the variant, used in log messages
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaType::Null => "null",
            SchemaType::Text => "text",
            SchemaType::Number => "number",
            SchemaType::List(_) => "list",
            SchemaType::Object(_) => "object",
            SchemaType::Mixed => "mixed",
        }
    }

    /// Whether this is a leaf scalar (`Text` or `Number`)
    pub fn is_scalar(&self) -> bool {
        matches!(self, SchemaType::Text | SchemaType::Number)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaType::List(elem) => write!(f, "list<{}>", elem),
            SchemaType::Object(members) => {
                write!(f, "{{")?;
                for (i, (name, ty)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, "}}")
            }
            other => f.write_str(other.kind()),
        }
    }
}
