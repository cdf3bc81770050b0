//! Command-line front end

pub mod commands;
pub mod error;
pub mod progress;

pub use error::CliError;
