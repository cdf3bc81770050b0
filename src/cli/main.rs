//! CLI binary entry point for json2sqlite

use anyhow::Result;
use clap::{Parser, Subcommand};
use json2sqlite::cli::commands::JobArgs;
use json2sqlite::cli::commands::convert::{ConvertArgs, handle_convert};
use json2sqlite::cli::commands::plan::{PlanArgs, handle_plan};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "json2sqlite")]
#[command(about = "Load semi-structured JSON records into normalized SQLite tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error) or a filter directive
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer the schema, create the tables and ingest every record
    Convert {
        /// Input file (.jsonl, .ndjson or .zip)
        input: PathBuf,
        /// SQLite database to create (must not exist)
        output: PathBuf,
        /// Name of the root table
        #[arg(short, long)]
        table: Option<String>,
        /// Dot-separated path of the unique record key
        #[arg(short = 'k', long)]
        primary_key: Option<String>,
        /// TOML job configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Disable progress bars
        #[arg(long)]
        no_progress: bool,
    },
    /// Infer the schema and print the creation statements without writing
    Plan {
        /// Input file (.jsonl, .ndjson or .zip)
        input: PathBuf,
        /// Name of the root table
        #[arg(short, long)]
        table: Option<String>,
        /// Dot-separated path of the unique record key
        #[arg(short = 'k', long)]
        primary_key: Option<String>,
        /// TOML job configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the table hierarchy as a Graphviz DOT file
        #[arg(long)]
        graph: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            table,
            primary_key,
            config,
            no_progress,
        } => {
            let args = ConvertArgs {
                job: JobArgs {
                    input,
                    table,
                    primary_key,
                    config,
                },
                output,
                no_progress,
            };
            handle_convert(&args)
        }
        Commands::Plan {
            input,
            table,
            primary_key,
            config,
            graph,
        } => {
            let args = PlanArgs {
                job: JobArgs {
                    input,
                    table,
                    primary_key,
                    config,
                },
                graph,
            };
            handle_plan(&args)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    Ok(())
}
