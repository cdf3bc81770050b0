//! SQLite connection settings
//!
//! The `[sqlite]` section of a job configuration file.

use serde::{Deserialize, Serialize};

/// Default prepared statement cache capacity
pub const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 64;

/// Value of SQLite's `synchronous` pragma
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynchronousMode {
    Off,
    /// Default for bulk loads
    #[default]
    Normal,
    Full,
    Extra,
}

impl SynchronousMode {
    /// Pragma keyword
    pub fn as_pragma(&self) -> &'static str {
        match self {
            SynchronousMode::Off => "OFF",
            SynchronousMode::Normal => "NORMAL",
            SynchronousMode::Full => "FULL",
            SynchronousMode::Extra => "EXTRA",
        }
    }
}

impl std::str::FromStr for SynchronousMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Ok(SynchronousMode::Off),
            "normal" | "1" => Ok(SynchronousMode::Normal),
            "full" | "2" => Ok(SynchronousMode::Full),
            "extra" | "3" => Ok(SynchronousMode::Extra),
            _ => Err(format!(
                "Unknown synchronous mode: {}. Use 'off', 'normal', 'full' or 'extra'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for SynchronousMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_pragma().to_lowercase())
    }
}

/// SQLite configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteSection {
    /// `synchronous` pragma applied when the connection is opened
    #[serde(default)]
    pub synchronous: SynchronousMode,

    /// Number of prepared statements kept per connection
    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: usize,
}

fn default_statement_cache_capacity() -> usize {
    DEFAULT_STATEMENT_CACHE_CAPACITY
}

impl Default for SqliteSection {
    fn default() -> Self {
        Self {
            synchronous: SynchronousMode::default(),
            statement_cache_capacity: default_statement_cache_capacity(),
        }
    }
}
