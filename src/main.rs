use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use supershot_sim::export::{read_shot_records, write_rows};
use supershot_sim::{
    competitive_histograms, standard_bin_occupancy, summarize_competitive, summarize_standard,
    CompetitiveSimulation, SimulationConfig, StandardSimulation, StrategySet, VolumeMode,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "supershot-sim",
    about = "Monte Carlo simulation of netball Super Shot scoring strategies"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate each team scoring alone at every tendency
    Standard(BatchArgs),
    /// Simulate head-to-head scoring periods for every team pair
    Competitive(CompetitiveArgs),
}

#[derive(Args)]
struct BatchArgs {
    /// Historical shot records (CSV)
    #[arg(long)]
    data: PathBuf,

    /// Output directory for trial and summary CSVs
    #[arg(long)]
    out: PathBuf,

    /// Trials per simulation cell
    #[arg(long, default_value_t = 1000)]
    trials: usize,

    /// Base seed for the deterministic seeding policy
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Tendency sweep: "five", "deciles", or a comma-separated list
    #[arg(long, default_value = "five", value_parser = parse_strategies)]
    strategies: StrategySet,

    /// Fit statistics to all periods instead of Power 5 periods only
    #[arg(long)]
    all_periods: bool,
}

#[derive(Args)]
struct CompetitiveArgs {
    #[command(flatten)]
    batch: BatchArgs,

    /// Fix the period total at the league mean, split evenly
    #[arg(long)]
    matched: bool,
}

fn parse_strategies(raw: &str) -> Result<StrategySet, String> {
    let set = match raw {
        "five" => StrategySet::five_point(),
        "deciles" => StrategySet::deciles(),
        list => {
            let values = list
                .split(',')
                .map(|v| v.trim().parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| format!("bad tendency value: {e}"))?;
            StrategySet::from_values(values)
        }
    };
    set.validate().map_err(|e| e.to_string())?;
    Ok(set)
}

fn build_config(args: &BatchArgs, volume_mode: VolumeMode) -> SimulationConfig {
    SimulationConfig {
        trials: args.trials,
        base_seed: args.seed,
        strategies: args.strategies.clone(),
        volume_mode,
        power_five_only: !args.all_periods,
    }
}

/// Record the exact configuration next to the result tables
fn write_manifest(out: &Path, config: &SimulationConfig) -> anyhow::Result<()> {
    let file = std::fs::File::create(out.join("run_config.json"))?;
    serde_json::to_writer_pretty(file, config).context("writing run manifest")?;
    Ok(())
}

fn run_standard(args: &BatchArgs) -> anyhow::Result<()> {
    let records = read_shot_records(&args.data)
        .with_context(|| format!("reading shot records from {}", args.data.display()))?;
    let config = build_config(args, VolumeMode::Linked);
    let sim = StandardSimulation::from_records(&records, config.clone())
        .context("fitting standard simulation")?;

    let trials = sim.run().context("running standard batch")?;
    let summaries = summarize_standard(&trials)?;
    let occupancy = standard_bin_occupancy(&trials)?;

    std::fs::create_dir_all(&args.out)?;
    write_manifest(&args.out, &config)?;
    write_rows(&args.out.join("standard_trials.csv"), &trials)?;
    write_rows(&args.out.join("standard_summary.csv"), &summaries)?;
    write_rows(&args.out.join("standard_bins.csv"), &occupancy)?;
    Ok(())
}

fn run_competitive(args: &CompetitiveArgs) -> anyhow::Result<()> {
    let records = read_shot_records(&args.batch.data)
        .with_context(|| format!("reading shot records from {}", args.batch.data.display()))?;
    let mode = if args.matched {
        VolumeMode::Matched
    } else {
        VolumeMode::Linked
    };
    let config = build_config(&args.batch, mode);
    let sim = CompetitiveSimulation::from_records(&records, config.clone())
        .context("fitting competitive simulation")?;

    let trials = sim.run().context("running competitive batch")?;
    let summaries = summarize_competitive(&trials)?;
    let histograms = competitive_histograms(&trials)?;

    std::fs::create_dir_all(&args.batch.out)?;
    write_manifest(&args.batch.out, &config)?;
    write_rows(&args.batch.out.join("competitive_trials.csv"), &trials)?;
    write_rows(&args.batch.out.join("competitive_summary.csv"), &summaries)?;
    write_rows(&args.batch.out.join("competitive_margins.csv"), &histograms)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Standard(args) => run_standard(args),
        Command::Competitive(args) => run_competitive(args),
    }
}
