use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kfactor_sweep::data_loader::load_games;
use kfactor_sweep::fit::rescore_lines;
use kfactor_sweep::report::{output_report, write_rated_games, write_score_lines};
use kfactor_sweep::ranking_context::{K_FACTOR_STEP, MAX_K_FACTOR, MIN_K_FACTOR, START_ELO};
use kfactor_sweep::{run_sweep_to_completion, CancelToken, LeagueTable, SweepContext};

/*
    Sweeps K-factors over a season of games and prints "<k> <mean error>" for each one.
    Pick the K-factor with the lowest mean error. Logs go to stderr; set RUST_LOG=debug for
    per-game output.
*/

#[derive(Parser, Debug)]
#[command(name = "kfactor_sweep", about = "Find the Elo K-factor that best predicts game results")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rate every game once per K-factor and score each K-factor
    Sweep(SweepArgs),
    /// Score previously rated game lines
    Rescore {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 400.0)]
        elo_delta: f64,
    },
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Games JSON file
    #[arg(long)]
    games: PathBuf,
    /// League season stats JSON file
    #[arg(long)]
    league: PathBuf,
    #[arg(long = "min-k", env = "MIN_K", default_value_t = MIN_K_FACTOR)]
    min_k: u32,
    #[arg(long = "max-k", env = "MAX_K", default_value_t = MAX_K_FACTOR)]
    max_k: u32,
    #[arg(long = "k-step", env = "K_STEP", default_value_t = K_FACTOR_STEP)]
    k_step: u32,
    #[arg(long = "initial-elo", env = "INITIAL_ELO", default_value_t = START_ELO)]
    initial_elo: f64,
    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,
    /// Write every rated game here, one line per game and K-factor
    #[arg(long)]
    rated_out: Option<PathBuf>,
    /// Print a summary table instead of plain score lines
    #[arg(long)]
    table: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Sweep(args) => sweep(args),
        Command::Rescore { input, elo_delta } => rescore(input, elo_delta),
    }
}

fn sweep(args: SweepArgs) -> Result<()> {
    let ranking_context = SweepContext {
        min_k: args.min_k,
        max_k: args.max_k,
        k_step: args.k_step,
        initial_elo: args.initial_elo,
        ..SweepContext::default()
    };
    ranking_context.validate().context("Invalid sweep configuration")?;

    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let games = load_games(&args.games)
        .with_context(|| format!("Failed to load games from {}", args.games.display()))?;
    let league = LeagueTable::load(&args.league)
        .with_context(|| format!("Failed to load league stats from {}", args.league.display()))?;

    let outcome =
        run_sweep_to_completion(&games, &league, &ranking_context, &CancelToken::new())?;

    if let Some(path) = &args.rated_out {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        write_rated_games(&mut out, &outcome.rated)?;
        out.flush()?;
        info!(path = %path.display(), lines = outcome.rated.len(), "Wrote rated games");
    }

    if args.table {
        output_report(&outcome.scores);
    } else {
        let stdout = io::stdout();
        write_score_lines(&mut stdout.lock(), &outcome.scores)?;
    }

    Ok(())
}

fn rescore(input: PathBuf, elo_delta: f64) -> Result<()> {
    let data = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let scores = rescore_lines(data.lines(), elo_delta);

    let stdout = io::stdout();
    write_score_lines(&mut stdout.lock(), &scores)?;
    Ok(())
}
