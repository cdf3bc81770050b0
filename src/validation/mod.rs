//! Validation functionality
//!
//! Provides identifier sanitization and the configuration checks that run
//! before a job touches the output store.

pub mod input;

pub use input::{
    ValidationError, quote_identifier, sanitize_identifier, validate_identifier,
    validate_key_path, validate_table_name,
};
