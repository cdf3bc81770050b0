//! Identifier validation and sanitization utilities.
//!
//! Every table and column name the planner derives from record paths goes
//! through [`sanitize_identifier`], and every name that reaches a SQL
//! statement is wrapped by [`quote_identifier`]. Both are total and
//! deterministic so that planning and ingestion always derive the same name
//! for the same path.
//!
//! # Security
//!
//! Identifiers are bracket quoted. A name containing `[` or `]` would break
//! out of the quoting, so such names are rejected up front by
//! [`validate_table_name`] and [`validate_identifier`].

use thiserror::Error;

/// Maximum length for table names
pub const MAX_TABLE_NAME_LENGTH: usize = 255;

/// Maximum length for primary key paths
pub const MAX_KEY_PATH_LENGTH: usize = 1024;

/// Errors that can occur during input validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Characters replaced by [`sanitize_identifier`] and their substitutions.
const SUBSTITUTIONS: &[(char, &str)] = &[(' ', "_"), ('-', "_"), (':', "_"), ('[', "_"), (']', "_")];

/// Map a raw path segment or joined name to a safe storage identifier.
///
/// Spaces, dashes, colons and square brackets are replaced by underscores;
/// every other character is kept as is.
///
/// # Examples
///
/// ```
/// use json2sqlite::validation::input::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("first name"), "first_name");
/// assert_eq!(sanitize_identifier("cvss:v3-score"), "cvss_v3_score");
/// assert_eq!(sanitize_identifier("plain"), "plain");
/// ```
pub fn sanitize_identifier(raw: &str) -> String {
    let mut sanitized = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match SUBSTITUTIONS.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => sanitized.push_str(to),
            None => sanitized.push(ch),
        }
    }
    sanitized
}

/// Validate the configured main table name.
///
/// # Rules
///
/// - Must not be empty
/// - Must not exceed 255 bytes
/// - Must not contain `[` or `]` (they break identifier quoting)
/// - Must not contain control characters
///
/// # Examples
///
/// ```
/// use json2sqlite::validation::input::validate_table_name;
///
/// assert!(validate_table_name("cves").is_ok());
/// assert!(validate_table_name("my table").is_ok());
/// assert!(validate_table_name("").is_err());
/// assert!(validate_table_name("bad]name").is_err());
/// ```
pub fn validate_table_name(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Empty("table name"));
    }

    if name.len() > MAX_TABLE_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "table name",
            max: MAX_TABLE_NAME_LENGTH,
            actual: name.len(),
        });
    }

    if let Some(c) = name.chars().find(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacters {
            field: "table name",
            reason: format!("control character U+{:04X}", c as u32),
        });
    }

    validate_identifier("table name", name)
}

/// Reject identifiers that cannot be bracket quoted.
pub fn validate_identifier(field: &'static str, name: &str) -> ValidationResult<()> {
    match name.chars().find(|c| *c == '[' || *c == ']') {
        Some(c) => Err(ValidationError::InvalidCharacters {
            field,
            reason: format!("'{}' would break identifier quoting", c),
        }),
        None => Ok(()),
    }
}

/// Validate a dot-separated primary key path such as `cve.id`.
///
/// # Examples
///
/// ```
/// use json2sqlite::validation::input::validate_key_path;
///
/// assert!(validate_key_path("id").is_ok());
/// assert!(validate_key_path("meta.id").is_ok());
/// assert!(validate_key_path("meta..id").is_err());
/// ```
pub fn validate_key_path(path: &str) -> ValidationResult<()> {
    if path.is_empty() {
        return Err(ValidationError::Empty("primary key path"));
    }

    if path.len() > MAX_KEY_PATH_LENGTH {
        return Err(ValidationError::TooLong {
            field: "primary key path",
            max: MAX_KEY_PATH_LENGTH,
            actual: path.len(),
        });
    }

    if path.split('.').any(str::is_empty) {
        return Err(ValidationError::InvalidFormat(
            "primary key path",
            format!("'{}' contains an empty segment", path),
        ));
    }

    Ok(())
}

/// Quote a SQL identifier with square brackets.
///
/// Callers must have rejected names containing brackets first; see
/// [`validate_identifier`].
///
/// # Examples
///
/// ```
/// use json2sqlite::validation::input::quote_identifier;
///
/// assert_eq!(quote_identifier("cves__tags"), "[cves__tags]");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name)
}
