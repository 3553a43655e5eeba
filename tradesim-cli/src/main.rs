//! Tradesim CLI — replay, cross-validation and data inspection commands.
//!
//! Commands:
//! - `replay` — step a policy through a price series and save the trade ledger
//! - `cv` — blocked cross-validation with one independent broker per fold segment
//! - `inspect` — report rows, columns and date range of a price series

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tradesim_core::{Broker, PriceSeries};
use tradesim_runner::{
    load_csv, run_cross_validation, run_episode, save_replay_artifacts, synthetic_series,
    CrossValidationResult, EpisodeResult, SimConfig,
};

#[derive(Parser)]
#[command(
    name = "tradesim",
    about = "Tradesim CLI — single-position trading simulation and policy replay"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct DataArgs {
    /// CSV file: timestamp column first, then numeric columns including Close.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Generate this many synthetic rows instead of reading a file.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for synthetic data.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args, Clone)]
struct ConfigArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override broker.fee.
    #[arg(long)]
    fee: Option<f64>,

    /// Override broker.initial_assets.
    #[arg(long)]
    initial_assets: Option<f64>,

    /// Override episode.window_size.
    #[arg(long)]
    window_size: Option<usize>,

    /// Override episode.trade_size.
    #[arg(long)]
    trade_size: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a policy over a price series.
    Replay {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Blocked cross-validation of a policy.
    Cv {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        config: ConfigArgs,

        /// Override cross_validation.n_splits.
        #[arg(long)]
        n_splits: Option<usize>,

        /// Write the full result as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show a summary of a price series.
    Inspect {
        #[command(flatten)]
        data: DataArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Replay {
            data,
            config,
            output_dir,
        } => run_replay_cmd(&data, &config, output_dir),
        Commands::Cv {
            data,
            config,
            n_splits,
            output,
        } => run_cv_cmd(&data, &config, n_splits, output),
        Commands::Inspect { data } => run_inspect_cmd(&data),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Returns the series and whether it is synthetic.
fn load_series(args: &DataArgs) -> Result<(PriceSeries, bool)> {
    match (&args.data, args.synthetic) {
        (Some(_), Some(_)) => bail!("--data and --synthetic are mutually exclusive"),
        (None, None) => bail!("one of --data or --synthetic is required"),
        (Some(path), None) => Ok((load_csv(path)?, false)),
        (None, Some(rows)) => {
            let series = synthetic_series(rows, 100.0, args.seed)
                .context("failed to generate synthetic data")?;
            info!(rows, seed = args.seed, "using synthetic data");
            Ok((series, true))
        }
    }
}

fn build_config(args: &ConfigArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(fee) = args.fee {
        config.broker.fee = fee;
    }
    if let Some(assets) = args.initial_assets {
        config.broker.initial_assets = assets;
    }
    if let Some(window) = args.window_size {
        config.episode.window_size = window;
    }
    if let Some(size) = args.trade_size {
        config.episode.trade_size = size;
    }
    config.validate()?;
    Ok(config)
}

fn run_replay_cmd(data: &DataArgs, config: &ConfigArgs, output_dir: PathBuf) -> Result<()> {
    let (series, synthetic) = load_series(data)?;
    let config = build_config(config)?;

    let mut broker = Broker::new(series, config.broker.initial_assets, config.broker.fee)?;
    let mut policy = config.policy.build()?;
    let result = run_episode(&mut broker, policy.as_mut(), &config.episode)?;

    print_episode_summary(&result);

    let run_dir = save_replay_artifacts(
        &output_dir,
        &config,
        broker.data().index(),
        &result,
        synthetic,
    )?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_cv_cmd(
    data: &DataArgs,
    config: &ConfigArgs,
    n_splits: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let (series, _) = load_series(data)?;
    let mut config = build_config(config)?;
    if let Some(n) = n_splits {
        config.cross_validation.n_splits = n;
    }

    let result = run_cross_validation(
        &series,
        &config.broker,
        &config.episode,
        &config.policy,
        &config.cross_validation,
    )?;

    print_cv_summary(&result);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)
            .context("failed to serialize cross-validation result")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Result saved to: {}", path.display());
    }
    Ok(())
}

fn run_inspect_cmd(data: &DataArgs) -> Result<()> {
    let (series, synthetic) = load_series(data)?;
    let closes = series.closes();
    let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let index = series.index();

    println!("Rows:      {}", series.len());
    println!("Columns:   {}", series.columns().join(", "));
    if let (Some(first), Some(last)) = (index.first(), index.last()) {
        println!("Range:     {first} .. {last}");
    }
    println!("Close:     {min:.4} .. {max:.4}");
    if synthetic {
        println!("(synthetic data)");
    }
    Ok(())
}

fn print_episode_summary(result: &EpisodeResult) {
    let m = &result.metrics;
    println!();
    println!("Policy:        {}", result.policy);
    println!("Rows:          {}", result.equity_curve.len());
    println!(
        "Actions:       hold {} / buy {} / sell {}",
        result.actions.hold, result.actions.buy, result.actions.sell
    );
    println!("Initial:       {:.2}", result.initial_assets);
    println!("Final:         {:.2}", result.final_assets);
    println!("Total return:  {:.2}%", m.total_return * 100.0);
    println!("Sharpe:        {:.3}", m.sharpe);
    println!("Max drawdown:  {:.2}%", m.max_drawdown * 100.0);
    println!("Trades:        {}", m.trade_count);
    println!("Win rate:      {:.1}%", m.win_rate * 100.0);
    println!("Profit factor: {:.2}", m.profit_factor);
}

fn print_cv_summary(result: &CrossValidationResult) {
    println!();
    println!(
        "{:>4}  {:>13}  {:>13}  {:>10}  {:>10}",
        "fold", "train rows", "eval rows", "train ret", "eval ret"
    );
    for fold in &result.folds {
        let s = &fold.spec;
        println!(
            "{:>4}  {:>13}  {:>13}  {:>9.2}%  {:>9.2}%",
            s.fold_index,
            format!("{}..{}", s.train_start, s.train_end),
            format!("{}..{}", s.eval_start, s.eval_end),
            fold.train.metrics.total_return * 100.0,
            fold.eval.metrics.total_return * 100.0,
        );
    }
    println!();
    println!(
        "Mean train return: {:.2}%   Mean eval return: {:.2}%   Mean eval sharpe: {:.3}",
        result.mean_train.total_return * 100.0,
        result.mean_eval.total_return * 100.0,
        result.mean_eval.sharpe,
    );
}
