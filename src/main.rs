// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! prdtrack CLI - PRD status, traceability and progress dashboards

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "prdtrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PRDTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Validation report format
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Markdown report
    Markdown,
    /// Pretty JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan PRD documents and tally their status
    Scan {
        /// PRD directory (defaults to the configured one)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Cross-reference requirements with source files
    Code {
        /// Source directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the project's tests and collect coverage
    Tests {
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch issue tracker status
    Issues {
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that every requirement is mentioned by a test
    Consistency {
        /// Tests directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate PRD documents against the template
    Validate {
        /// PRD directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Validate a single file
        #[arg(long, conflicts_with = "dir")]
        file: Option<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value = "markdown")]
        format: Format,

        /// Write the report to this file instead of stdout
        #[arg(long)]
        save: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build the traceability matrix and patch the tracking document
    Matrix {
        /// Tracking document to patch
        #[arg(long)]
        document: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check go-live status of every registered module
    Modules {
        /// Tracking document to patch
        #[arg(long)]
        document: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the daily quality report
    Report {
        /// Summarize the latest daily reports instead
        #[arg(long)]
        weekly: bool,

        /// PRD directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write statistics and the dashboard summary
    Dashboard {
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Print the user configuration file path instead
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: clap_complete::Shell,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    // Completions need no configuration
    if let Commands::Completions { shell } = cli.command {
        commands::completions::run(shell);
        return Ok(ExitCode::SUCCESS);
    }

    let config = prd_tracker::config::load(cli.config.as_deref(), cli.root.as_deref())?;
    let ctx = Context::new(config, !cli.no_color, cli.quiet);

    match cli.command {
        Commands::Scan { dir, output } => commands::scan::run(&ctx, dir, output)?,
        Commands::Code { dir, output } => commands::code::run(&ctx, dir, output)?,
        Commands::Tests { output } => commands::tests::run(&ctx, output)?,
        Commands::Issues { output } => commands::issues::run(&ctx, output)?,
        Commands::Consistency { dir, output } => commands::consistency::run(&ctx, dir, output)?,
        Commands::Validate { dir, file, format, save, output } => {
            let passed = commands::validate::run(&ctx, dir, file, format, save, output)?;
            if !passed {
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Matrix { document, output } => commands::matrix::run(&ctx, document, output)?,
        Commands::Modules { document, output } => commands::modules::run(&ctx, document, output)?,
        Commands::Report { weekly, dir, output } => commands::report::run(&ctx, weekly, dir, output)?,
        Commands::Dashboard { output } => commands::dashboard::run(&ctx, output)?,
        Commands::Config { path } => commands::config::run(&ctx, path)?,
        Commands::Completions { .. } => {}
    }
    Ok(ExitCode::SUCCESS)
}
