//! Job configuration file support
//!
//! Handles parsing of TOML job files and environment variable overrides.
//! Precedence, lowest first: defaults, the TOML file, environment
//! variables, then explicit settings applied by the caller (command line
//! flags).
//!
//! ```toml
//! [job]
//! input = "nvdcve.jsonl"
//! output = "nvd.sqlite"
//! main_table = "cves"
//! primary_key = "cve.id"
//!
//! [sqlite]
//! synchronous = "off"
//! statement_cache_capacity = 128
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::database::SqliteSection;
use crate::source::{SourceError, SourceKind};
use crate::validation::input::{ValidationError, validate_key_path, validate_table_name};

/// Environment variable for the main table name
pub const ENV_MAIN_TABLE: &str = "JSON2SQLITE_MAIN_TABLE";

/// Environment variable for the primary-key path
pub const ENV_PRIMARY_KEY: &str = "JSON2SQLITE_PRIMARY_KEY";

/// Environment variable for the SQLite `synchronous` pragma
pub const ENV_SYNCHRONOUS: &str = "JSON2SQLITE_SYNCHRONOUS";

/// Configuration error, raised before any side effect
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A required setting was not provided
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid input: {0}")]
    Source(#[from] SourceError),

    /// The output database must not exist yet
    #[error("Output already exists: {0}")]
    OutputExists(PathBuf),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Job configuration section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSection {
    /// Record source (`.jsonl`, `.ndjson` or `.zip`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,

    /// SQLite database to create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Name of the root table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_table: Option<String>,

    /// Dot-separated path of the unique record key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub job: JobSection,

    #[serde(default)]
    pub sqlite: SqliteSection,
}

impl JobConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from an optional TOML file, then apply
    /// environment variable overrides.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    ConfigError::IoError(format!(
                        "Failed to read config {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::parse(&content)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(table) = lookup(ENV_MAIN_TABLE) {
            self.job.main_table = Some(table);
        }

        if let Some(key) = lookup(ENV_PRIMARY_KEY) {
            self.job.primary_key = Some(key);
        }

        if let Some(mode) = lookup(ENV_SYNCHRONOUS)
            && let Ok(mode) = mode.parse()
        {
            self.sqlite.synchronous = mode;
        }
    }

    /// Record source, required
    pub fn input(&self) -> ConfigResult<&Path> {
        self.job.input.as_deref().ok_or(ConfigError::Missing("input"))
    }

    /// Output database, required for a full job
    pub fn output(&self) -> ConfigResult<&Path> {
        self.job.output.as_deref().ok_or(ConfigError::Missing("output"))
    }

    pub fn main_table(&self) -> ConfigResult<&str> {
        self.job
            .main_table
            .as_deref()
            .ok_or(ConfigError::Missing("main table"))
    }

    pub fn primary_key(&self) -> ConfigResult<&str> {
        self.job
            .primary_key
            .as_deref()
            .ok_or(ConfigError::Missing("primary key"))
    }

    /// Check every setting a job relies on.
    ///
    /// The output path is optional here so that a dry run can be validated;
    /// when present it must not exist yet.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_table_name(self.main_table()?)?;
        validate_key_path(self.primary_key()?)?;

        let input = self.input()?;
        SourceKind::detect(input)?;
        if !input.exists() {
            return Err(SourceError::NotFound(input.to_path_buf()).into());
        }

        if let Some(output) = &self.job.output
            && output.exists()
        {
            return Err(ConfigError::OutputExists(output.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SynchronousMode;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn valid_config(dir: &Path) -> JobConfig {
        let input = dir.join("records.jsonl");
        std::fs::write(&input, "{\"id\": 1}\n").unwrap();

        let mut config = JobConfig::new();
        config.job.input = Some(input);
        config.job.output = Some(dir.join("out.sqlite"));
        config.job.main_table = Some("items".to_string());
        config.job.primary_key = Some("id".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = JobConfig::new();
        assert_eq!(config.sqlite.synchronous, SynchronousMode::Normal);
        assert!(matches!(config.input(), Err(ConfigError::Missing("input"))));
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[job]
input = "nvd.zip"
main_table = "cves"
primary_key = "cve.id"

[sqlite]
synchronous = "off"
statement_cache_capacity = 8
"#;
        let config = JobConfig::parse(toml).unwrap();
        assert_eq!(config.input().unwrap(), Path::new("nvd.zip"));
        assert_eq!(config.main_table().unwrap(), "cves");
        assert_eq!(config.primary_key().unwrap(), "cve.id");
        assert!(config.job.output.is_none());
        assert_eq!(config.sqlite.synchronous, SynchronousMode::Off);
        assert_eq!(config.sqlite.statement_cache_capacity, 8);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = JobConfig::parse("[job\nmain_table = 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let mut config = JobConfig::new();
        config.job.main_table = Some("cves".to_string());
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("main_table = \"cves\""));
        assert_eq!(JobConfig::parse(&toml).unwrap(), config);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_MAIN_TABLE, "from_env"),
            (ENV_SYNCHRONOUS, "full"),
        ]);
        let mut config = JobConfig::parse("[job]\nmain_table = \"from_file\"\nprimary_key = \"id\"").unwrap();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.main_table().unwrap(), "from_env");
        assert_eq!(config.primary_key().unwrap(), "id");
        assert_eq!(config.sqlite.synchronous, SynchronousMode::Full);
    }

    #[test]
    fn test_invalid_synchronous_override_is_ignored() {
        let mut config = JobConfig::new();
        config.apply_overrides(|name| (name == ENV_SYNCHRONOUS).then(|| "bogus".to_string()));
        assert_eq!(config.sqlite.synchronous, SynchronousMode::Normal);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(&path, "[job]\nprimary_key = \"meta.id\"\n").unwrap();

        let config = JobConfig::load(Some(&path)).unwrap();
        assert!(config.job.primary_key.is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let result = JobConfig::load(Some(Path::new("/nonexistent/job.toml")));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let dir = tempdir().unwrap();
        assert!(valid_config(dir.path()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_existing_output() {
        let dir = tempdir().unwrap();
        let config = valid_config(dir.path());
        std::fs::write(config.job.output.as_ref().unwrap(), "").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutputExists(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_table_name() {
        let dir = tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.job.main_table = Some("bad[name".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_unsupported_source() {
        let dir = tempdir().unwrap();
        let mut config = valid_config(dir.path());
        let csv = dir.path().join("records.csv");
        std::fs::write(&csv, "id\n1\n").unwrap();
        config.job.input = Some(csv);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Source(SourceError::UnsupportedSourceType(_)))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_input() {
        let dir = tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.job.input = Some(dir.path().join("absent.jsonl"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Source(SourceError::NotFound(_)))
        ));
    }
}
