//! decibench - run the mesh decimation benchmark from the command line
//!
//! Subcommands map onto the pipeline stages:
//! - `preprocess`: clean raw downloads into the dataset directories
//! - `run`: time both algorithms and write the results CSV
//! - `analyze`: write the statistical report
//! - `diagnostics`: residual normality tests and Q-Q plots
//! - `figures`: report charts
//! - `presentation`: slide charts
//! - `all`: every stage after preprocessing, in order
//! - `init-config`: print the default configuration as JSON

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use decibench_experiment::{
    run_analysis, run_diagnostics, run_experiment, run_figures, run_preprocess, run_presentation,
    Config, FigureConfig,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "decibench")]
#[command(about = "Benchmark QEM edge collapse against vertex clustering", long_about = None)]
struct Cli {
    /// JSON configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clean and normalize raw meshes into the dataset directories
    Preprocess,
    /// Decimate every model and record time and Hausdorff distance
    Run(RunArgs),
    /// Write the descriptive and inferential statistics report
    Analyze(StageArgs),
    /// Test ANOVA residuals for normality and draw Q-Q plots
    Diagnostics(StageArgs),
    /// Render the report figures
    Figures(StageArgs),
    /// Render the presentation slides
    Presentation(StageArgs),
    /// Run, analyze, diagnose and plot in one go
    All(RunArgs),
    /// Print the default configuration
    #[command(name = "init-config")]
    InitConfig,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Results CSV to write
    #[arg(short, long)]
    results: Option<PathBuf>,

    /// Timed repetitions per measurement
    #[arg(long)]
    repeats: Option<usize>,

    /// Skip the untimed warm-up call
    #[arg(long)]
    no_warm_up: bool,
}

#[derive(Parser, Debug)]
struct StageArgs {
    /// Results CSV to read
    #[arg(short, long)]
    results: Option<PathBuf>,

    /// Output file or directory for this stage (diagnostics writes its
    /// plots and summary there)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(Config::default()),
    }
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(results) = &self.results {
            config.experiment.results_file = results.clone();
        }
        if let Some(repeats) = self.repeats {
            config.experiment.repeats = repeats.max(1);
        }
        if self.no_warm_up {
            config.experiment.warm_up = false;
        }
    }
}

impl StageArgs {
    fn results<'a>(&'a self, config: &'a Config) -> &'a Path {
        self.results
            .as_deref()
            .unwrap_or(config.experiment.results_file.as_path())
    }
}

/// Move both the Q-Q plots and the statistical summary under `output`
fn redirect_diagnostics(figures: &mut FigureConfig, output: &Path) {
    let summary_name = figures
        .statistical_summary
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("statistical_summary.txt"));
    figures.statistical_summary = output.join(summary_name);
    figures.report_dir = output.to_path_buf();
}

fn run_all(config: &Config) -> Result<()> {
    let summary = run_experiment(&config.experiment)?;
    println!(
        "Experiment complete: {} rows from {} models ({} failures)",
        summary.rows, summary.models, summary.failures
    );
    let results = &config.experiment.results_file;
    run_analysis(results, &config.analysis)?;
    println!("Analysis written to {}", config.analysis.summary_file.display());
    run_diagnostics(results, &config.figures)?;
    println!("Diagnostics written to {}", config.figures.statistical_summary.display());
    let figures = run_figures(results, &config.figures)?;
    println!("{} figures written to {}", figures.len(), config.figures.report_dir.display());
    let slides = run_presentation(results, &config.figures)?;
    println!("{} slides written to {}", slides.len(), config.figures.presentation_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut config = load_config(cli.config.as_deref())?;
    info!(command = ?cli.command, "Starting");

    match &cli.command {
        Commands::Preprocess => {
            let summary = run_preprocess(&config.preprocess)?;
            println!(
                "Preprocessing complete: {} processed, {} skipped, {} failed",
                summary.processed, summary.skipped, summary.failed
            );
        }
        Commands::Run(args) => {
            args.apply(&mut config);
            let summary = run_experiment(&config.experiment)?;
            println!(
                "Experiment complete: {} rows from {} models ({} failures), results in {}",
                summary.rows,
                summary.models,
                summary.failures,
                config.experiment.results_file.display()
            );
        }
        Commands::Analyze(args) => {
            let mut analysis = config.analysis.clone();
            if let Some(output) = &args.output {
                analysis.summary_file = output.clone();
            }
            run_analysis(args.results(&config), &analysis)?;
            println!("Analysis written to {}", analysis.summary_file.display());
        }
        Commands::Diagnostics(args) => {
            let mut figures = config.figures.clone();
            if let Some(output) = &args.output {
                redirect_diagnostics(&mut figures, output);
            }
            let diagnostics = run_diagnostics(args.results(&config), &figures)?;
            print!("{}", diagnostics.summary());
            println!("Diagnostics written to {}", figures.statistical_summary.display());
        }
        Commands::Figures(args) => {
            let mut figures = config.figures.clone();
            if let Some(output) = &args.output {
                figures.report_dir = output.clone();
            }
            let written = run_figures(args.results(&config), &figures)?;
            println!("{} figures written to {}", written.len(), figures.report_dir.display());
        }
        Commands::Presentation(args) => {
            let mut figures = config.figures.clone();
            if let Some(output) = &args.output {
                figures.presentation_dir = output.clone();
            }
            let written = run_presentation(args.results(&config), &figures)?;
            println!("{} slides written to {}", written.len(), figures.presentation_dir.display());
        }
        Commands::All(args) => {
            args.apply(&mut config);
            run_all(&config)?;
        }
        Commands::InitConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::parse_from(["decibench", "-vv", "run", "--results", "out.csv", "--repeats", "3", "--no-warm-up"]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.experiment.results_file, PathBuf::from("out.csv"));
        assert_eq!(config.experiment.repeats, 3);
        assert!(!config.experiment.warm_up);
    }

    #[test]
    fn test_stage_results_default_to_config() {
        let cli = Cli::parse_from(["decibench", "figures"]);
        let Commands::Figures(args) = cli.command else {
            panic!("expected figures");
        };
        let config = Config::default();
        assert_eq!(args.results(&config), config.experiment.results_file.as_path());
    }

    #[test]
    fn test_diagnostics_output_moves_summary_too() {
        let mut figures = Config::default().figures;
        redirect_diagnostics(&mut figures, Path::new("out/diag"));
        assert_eq!(figures.report_dir, PathBuf::from("out/diag"));
        assert_eq!(
            figures.statistical_summary,
            PathBuf::from("out/diag/statistical_summary.txt")
        );
    }
}
