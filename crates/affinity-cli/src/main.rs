#![forbid(unsafe_code)]

mod cmd;
mod export;
mod output;

use affinity_core::timing;
use clap::{CommandFactory, Parser, Subcommand};
use output::{OutputMode, is_reported, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "affinity: similarity, co-occurrence, and centrality for subject/item data",
    long_about = None
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit per-stage timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Output format. Defaults to pretty on a TTY, text when piped.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Alias for --format json.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file. Defaults to ./affinity.toml when present.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Analysis",
        about = "Build graphs and rank nodes",
        long_about = "Load a subject,item[,weight] dataset, build the incidence, similarity and \
                      co-occurrence graphs, report each graph's most central node, and export \
                      the graphs as JSON.",
        after_help = "EXAMPLES:\n    # Analyze a dataset and export to ./results\n    affinity analyze survey.csv\n\n    # Semicolon-separated input, custom output dir\n    affinity analyze survey.csv --delimiter semicolon --out graphs\n\n    # Emit machine-readable output without writing exports\n    affinity analyze survey.csv --no-export --json"
    )]
    Analyze(cmd::analyze::AnalyzeArgs),

    #[command(
        next_help_heading = "Analysis",
        about = "Print relation matrices",
        long_about = "Print the incidence, similarity, and co-occurrence matrices of a dataset.",
        after_help = "EXAMPLES:\n    # Print all three matrices\n    affinity matrices survey.csv\n\n    # Only the item co-occurrence matrix, as JSON\n    affinity matrices survey.csv --which co-occurrence --json"
    )]
    Matrices(cmd::matrices::MatricesArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Install bash completions\n    affinity completions bash > ~/.local/share/bash-completion/completions/affinity"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("AFFINITY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "affinity=debug,info"
        } else {
            "affinity=info,warn"
        })
    });

    let format = env::var("AFFINITY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);
    timing::clear_timings();

    let project_root = env::current_dir()?;
    let output = cli.output_mode();
    let config = cli.config.as_deref();
    debug!(?output, root = %project_root.display(), "starting");

    let command_result = match cli.command {
        Commands::Analyze(ref args) => timing::timed("cmd.analyze", || {
            cmd::analyze::run_analyze(args, config, output, cli.quiet, &project_root)
        }),
        Commands::Matrices(ref args) => timing::timed("cmd.matrices", || {
            cmd::matrices::run_matrices(args, config, output, &project_root)
        }),
        Commands::Completions(ref args) => timing::timed("cmd.completions", || {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }),
    };

    if timing_enabled {
        let report = timing::collect_report();
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
            eprintln!("timing report (json):");
            eprintln!("{}", serde_json::to_string_pretty(&report.to_json())?);
        }
    }

    match command_result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if is_reported(&e) => {
            debug!(error = %format!("{e:#}"), "command failed");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e),
    }
}
