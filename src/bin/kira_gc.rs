use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_geo_combiner::combiner::{CombinerOptions, DatasetCombiner, MatchMode};
use kira_geo_combiner::config::ConfigLoader;
use kira_geo_combiner::error::CombinerError;
use kira_geo_combiner::input::load_input;
use kira_geo_combiner::output::{JsonOutput, TextOutput};

#[derive(Parser)]
#[command(name = "kira-gc")]
#[command(about = "Match samples across GEO datasets run on different platforms")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve sample correspondence for a JSON sample listing")]
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct ResolveArgs {
    input: Utf8PathBuf,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    mode: Option<MatchMode>,

    #[arg(long)]
    strict: bool,

    #[arg(long)]
    threshold: Option<f64>,

    #[arg(long)]
    no_matching: bool,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<CombinerError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CombinerError) -> u8 {
    match error {
        CombinerError::MissingConfig
        | CombinerError::ConfigRead(_)
        | CombinerError::ConfigParse(_)
        | CombinerError::InputRead { .. }
        | CombinerError::InputParse(_)
        | CombinerError::InvalidThreshold(_)
        | CombinerError::InvalidBoilerplateFraction(_)
        | CombinerError::InvalidDescriptionWeight(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve(args) => run_resolve(args),
    }
}

fn run_resolve(args: ResolveArgs) -> miette::Result<()> {
    let mut options = resolve_options(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        options.mode = mode;
    }
    if args.strict {
        options.mode = MatchMode::Strict;
    }
    if args.threshold.is_some() {
        options.threshold = args.threshold;
    }
    if args.no_matching {
        options.sample_matching = false;
    }

    let combiner = DatasetCombiner::new(options)?;
    let datasets = load_input(&args.input)?.into_datasets();
    let correspondence = combiner.find_correspondence(&datasets)?;

    if args.json {
        JsonOutput::print_correspondence(&correspondence).into_diagnostic()?;
    } else {
        TextOutput::print_correspondence(&correspondence).into_diagnostic()?;
    }
    Ok(())
}

fn resolve_options(path: Option<&str>) -> Result<CombinerOptions, CombinerError> {
    match ConfigLoader::resolve(path) {
        Ok(resolved) => Ok(resolved.options),
        Err(CombinerError::MissingConfig) => Ok(CombinerOptions::default()),
        Err(err) => Err(err),
    }
}
