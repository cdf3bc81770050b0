//! CLI-specific error types

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::pipeline::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("{0}")]
    ConfigError(#[from] ConfigError),

    #[error("{0}")]
    PipelineError(#[from] PipelineError),

    #[error("Export error: {0}")]
    ExportError(#[from] ExportError),
}
