use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chat_export_merge::handlers::{self, ConfigUpdate, MergeOptions};
use chat_export_merge::package::RecencyStrategy;
use chat_export_merge::{logger, report, VerbosityLevel};

#[derive(Parser)]
#[command(name = "chat-export-merge")]
#[command(about = "Combine chat-export archives of one conversation into a single archive", long_about = None)]
#[command(version)]
struct Cli {
    /// Show more detail
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors and the final result
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where each archive's export root is and what it contains
    Inspect {
        /// Archive files, or directories to search for *.zip files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Check whether archives can be merged
    Check {
        /// Archive files, or directories to search for *.zip files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Merge archives into one combined archive
    Merge {
        /// Archive files, or directories to search for *.zip files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output file (default: combined_<chat name>.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,

        /// Also write the combine report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Report format: json or markdown
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },

    /// Configure merge settings
    Config {
        /// File name of the message log inside an export
        #[arg(long)]
        log_file_name: Option<String>,

        /// How same-path files are ranked: first-seen or modified-time
        #[arg(long)]
        recency: Option<RecencyStrategy>,

        /// Archive paths to ignore (comma-separated glob patterns)
        #[arg(long)]
        exclude_patterns: Option<String>,

        /// Platform metadata directories to ignore (comma-separated)
        #[arg(long)]
        metadata_dirs: Option<String>,

        /// Directory combined archives are written to
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },

    /// View the latest combine report
    Report {
        /// Output format: json, markdown or summary
        #[arg(short, long, default_value = "summary")]
        format: String,

        /// Output file (default: print to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = VerbosityLevel::from_flags(cli.verbose, cli.quiet);

    if let Err(e) = logger::init_logger(verbosity) {
        eprintln!("Warning: file logging unavailable: {e:#}");
    }

    match cli.command {
        Commands::Inspect { paths } => {
            handlers::handle_inspect(&paths, verbosity)?;
        }
        Commands::Check { paths } => {
            handlers::handle_check(&paths, verbosity)?;
        }
        Commands::Merge {
            paths,
            output,
            force,
            report,
            format,
        } => {
            let options = MergeOptions {
                output,
                force,
                report,
                format,
            };
            handlers::handle_merge(&paths, &options, verbosity)?;
        }
        Commands::Config {
            log_file_name,
            recency,
            exclude_patterns,
            metadata_dirs,
            output_dir,
            show,
        } => {
            let update = ConfigUpdate {
                message_log_file_name: log_file_name,
                recency,
                exclude_patterns,
                metadata_dirs,
                output_dir,
            };
            if show || update.is_empty() {
                handlers::handle_config_show()?;
            } else {
                handlers::handle_config_update(update)?;
            }
        }
        Commands::Report { format, output } => {
            report::generate_report(&format, output.as_deref())?;
        }
    }

    Ok(())
}
