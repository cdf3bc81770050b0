//! CLI command implementations

pub mod convert;
pub mod plan;

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::config::JobConfig;

/// Settings shared by every command
#[derive(Debug, Clone, Default)]
pub struct JobArgs {
    pub input: PathBuf,
    pub table: Option<String>,
    pub primary_key: Option<String>,
    pub config: Option<PathBuf>,
}

impl JobArgs {
    /// Load the configuration file and environment, then apply flags
    pub fn load_config(&self) -> Result<JobConfig, CliError> {
        let mut config = JobConfig::load(self.config.as_deref())?;
        config.job.input = Some(self.input.clone());
        if let Some(table) = &self.table {
            config.job.main_table = Some(table.clone());
        }
        if let Some(key) = &self.primary_key {
            config.job.primary_key = Some(key.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(
            &path,
            "[job]\ninput = \"ignored.jsonl\"\nmain_table = \"from_file\"\nprimary_key = \"id\"\n",
        )
        .unwrap();

        let args = JobArgs {
            input: PathBuf::from("records.jsonl"),
            table: Some("from_flag".to_string()),
            primary_key: None,
            config: Some(path),
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.job.input, Some(PathBuf::from("records.jsonl")));
        assert_eq!(config.job.main_table.as_deref(), Some("from_flag"));
        assert!(config.job.primary_key.is_some());
    }
}
