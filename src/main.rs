use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod baseline;
mod charts;
mod config;
mod dataset;
mod evaluation;
mod extraction;
mod inference;
mod models;
mod output;
mod runner;

use crate::config::Config;
use crate::output::OutputFormat;
use crate::runner::Runner;

/// Story point estimation benchmark - query a model repeatedly per user story
/// and summarize how consistent its estimates are
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output - log every model request
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query the model for every story and write the trial table and summary
    Run(RunArgs),
    /// Recompute the summary from a stored trial table
    Evaluate(EvaluateArgs),
    /// Render SVG charts from a summary and its trial table
    Charts(ChartsArgs),
    /// Compare the keyword baseline against the model means
    Baseline(BaselineArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the TOML run file
    run_file: PathBuf,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Render charts after the run
    #[arg(long)]
    charts: bool,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Per-trial CSV written by a previous run
    outputs_csv: PathBuf,

    #[arg(long, default_value = "results/benchmark_summary.json")]
    summary: PathBuf,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,
}

#[derive(Args, Debug)]
struct ChartsArgs {
    #[arg(long, default_value = "results/benchmark_summary.json")]
    summary: PathBuf,

    #[arg(long, default_value = "results/model_outputs.csv")]
    outputs: PathBuf,

    #[arg(long, default_value = "charts")]
    charts_dir: PathBuf,
}

#[derive(Args, Debug)]
struct BaselineArgs {
    /// Path to the TOML run file
    run_file: PathBuf,

    /// Summary to compare against; defaults to the run file's summary path
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl Cli {
    fn log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    if let Err(err) = run(cli).await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => {
            let config = Config::from_file(&args.run_file)?;
            let charts_dir = config.run.charts_dir.clone();
            let output_csv = config.run.output_csv.clone();

            let runner = Runner::new(config)?;
            let summary = runner.run().await?;
            output::print_summary(&summary, args.output);

            if args.charts {
                let records = dataset::read_trial_records(&output_csv)?;
                charts::render_all(&summary, &records, &charts_dir)?;
            }
        }
        Commands::Evaluate(args) => {
            let summary = evaluation::evaluate_file(&args.outputs_csv, &args.summary)?;
            output::print_summary(&summary, args.output);
        }
        Commands::Charts(args) => {
            let summary = evaluation::read_summary(&args.summary)?;
            let records = dataset::read_trial_records(&args.outputs)?;
            info!(
                stories = summary.stories.len(),
                records = records.len(),
                "generating charts"
            );
            let written = charts::render_all(&summary, &records, &args.charts_dir)?;
            println!(
                "All charts generated in '{}':",
                args.charts_dir.display()
            );
            for path in written {
                println!("- {}", path.display());
            }
        }
        Commands::Baseline(args) => {
            let config = Config::from_file(&args.run_file)?;
            let stories = config.load_stories()?;
            let summary_path = args.summary.unwrap_or(config.run.summary_path);

            let model_stats = if summary_path.exists() {
                evaluation::read_summary(&summary_path)?.stories
            } else {
                info!(path = %summary_path.display(), "no summary found, showing baseline only");
                Default::default()
            };
            output::print_baseline(&stories, &model_stats);
        }
    }

    Ok(())
}
