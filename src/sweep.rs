use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::data_loader::GameRecord;
use crate::error::{EloError, Result};
use crate::fit::{AccuracyAggregator, KFactorScore};
use crate::league::LeagueStatsProvider;
use crate::partition::{key_games, partition_and_order, Partition};
use crate::ranking::{EloEngine, RatedGame};
use crate::ranking_context::SweepContext;

/// Shared stop flag. Workers check it before every game.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub enum PartitionOutcome {
    Finished { score: KFactorScore, rated: Vec<RatedGame> },
    Cancelled(u32),
}

#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub scores: Vec<KFactorScore>,     // One per finished K-factor, ascending
    pub rated: Vec<RatedGame>,         // Grouped by K-factor, chronological within each
    pub cancelled: Vec<u32>,
    pub unrouted: usize,
}

// Rates one partition start to finish. The engine and its rating state live and die inside this
// call.
pub fn run_partition<L: LeagueStatsProvider + ?Sized>(
    partition: Partition,
    league: &L,
    ctx: &SweepContext,
    cancel: &CancelToken,
) -> PartitionOutcome {
    let k_factor = partition.k_factor();
    if cancel.is_cancelled() {
        return PartitionOutcome::Cancelled(k_factor);
    }

    let mut engine = EloEngine::new(k_factor, ctx.initial_elo, ctx.elo_delta, league);
    let mut aggregator = AccuracyAggregator::new(k_factor);
    let mut rated = Vec::with_capacity(partition.len());

    for record in partition.records {
        if cancel.is_cancelled() {
            debug!(k_factor, "Partition cancelled, discarding partial results");
            return PartitionOutcome::Cancelled(k_factor);
        }

        let game_id = record.game.game_id.clone();
        match engine.process(record) {
            Ok(game) => {
                aggregator.push(game.score);
                rated.push(game);
            }
            Err(e) => {
                warn!(k_factor, game_id = %game_id, error = %e, "Skipping game");
                aggregator.record_skipped();
            }
        }
    }

    let score = aggregator.finish();
    info!(
        k_factor,
        mean_error = ?score.mean_error,
        scored = score.scored,
        skipped = score.skipped,
        players = engine.state().len(),
        "Partition finished"
    );
    PartitionOutcome::Finished { score, rated }
}

// Rates every game once per K-factor in the sweep and scores each K-factor. Partitions run in
// parallel, each sequential inside. A bad config fails before any work is done.
pub fn run_sweep<L: LeagueStatsProvider + ?Sized>(
    games: &[GameRecord],
    league: &L,
    ctx: &SweepContext,
    cancel: &CancelToken,
) -> Result<SweepOutcome> {
    ctx.validate()?;
    info!(
        games = games.len(),
        min_k = ctx.min_k,
        max_k = ctx.max_k,
        k_step = ctx.k_step,
        "Starting K-factor sweep"
    );

    let set = partition_and_order(key_games(games, ctx), ctx);

    let outcomes: Vec<PartitionOutcome> = set
        .partitions
        .into_par_iter()
        .map(|p| run_partition(p, league, ctx, cancel))
        .collect();

    let mut sweep = SweepOutcome { unrouted: set.unrouted.len(), ..SweepOutcome::default() };
    for outcome in outcomes {
        match outcome {
            PartitionOutcome::Finished { score, rated } => {
                sweep.scores.push(score);
                sweep.rated.extend(rated);
            }
            PartitionOutcome::Cancelled(k) => sweep.cancelled.push(k),
        }
    }

    if !sweep.cancelled.is_empty() {
        warn!(
            cancelled = sweep.cancelled.len(),
            "Sweep cancelled before every K-factor finished"
        );
    }
    info!(k_factors = sweep.scores.len(), "Sweep finished");
    Ok(sweep)
}

// Same as run_sweep, but a cancelled run is an error instead of a partial result.
pub fn run_sweep_to_completion<L: LeagueStatsProvider + ?Sized>(
    games: &[GameRecord],
    league: &L,
    ctx: &SweepContext,
    cancel: &CancelToken,
) -> Result<SweepOutcome> {
    let sweep = run_sweep(games, league, ctx, cancel)?;
    match sweep.cancelled.first() {
        Some(k) => Err(EloError::Cancelled(*k)),
        None => Ok(sweep),
    }
}
