//! Convert command implementation

use std::path::PathBuf;

use super::JobArgs;
use crate::cli::error::CliError;
use crate::cli::progress::BarProgress;
use crate::pipeline::Pipeline;
use crate::progress::{NoProgress, Progress};

/// Arguments for the convert command
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    pub job: JobArgs,
    pub output: PathBuf,
    pub no_progress: bool,
}

/// Handle the convert command
pub fn handle_convert(args: &ConvertArgs) -> Result<(), CliError> {
    let mut config = args.job.load_config()?;
    config.job.output = Some(args.output.clone());

    let mut bars = BarProgress::new();
    let mut quiet = NoProgress;
    let progress: &mut dyn Progress = if args.no_progress {
        &mut quiet
    } else {
        &mut bars
    };

    let report = Pipeline::new(config).run(progress)?;
    print!("{}", report);
    println!("Wrote {}", args.output.display());
    Ok(())
}
