//! Plan command implementation

use std::path::PathBuf;

use super::JobArgs;
use crate::cli::error::CliError;
use crate::export::SQLExporter;
use crate::pipeline::Pipeline;
use crate::progress::NoProgress;

/// Arguments for the plan command
#[derive(Debug, Clone)]
pub struct PlanArgs {
    pub job: JobArgs,
    /// Where to write the table hierarchy as Graphviz DOT
    pub graph: Option<PathBuf>,
}

/// Handle the plan command: print the creation statements of a dry run
pub fn handle_plan(args: &PlanArgs) -> Result<(), CliError> {
    let mut config = args.job.load_config()?;
    config.job.output = None;
    let planned = Pipeline::new(config).plan_only(&mut NoProgress)?;

    let script = SQLExporter.export(&planned.layout)?;
    print!("{}", script.content);

    for barrier in planned.layout.barriers() {
        eprintln!("Conflicting types, stored as JSON text: {}", barrier);
    }

    if let Some(path) = &args.graph {
        std::fs::write(path, planned.layout.parents().to_dot())
            .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?;
        eprintln!("Wrote table graph to {}", path.display());
    }
    Ok(())
}
