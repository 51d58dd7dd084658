//! Elo K-factor sweep.
//!
//! Rates every team and player over a season of games once per candidate K-factor, then scores each
//! K-factor by how well its ratings called the results. Lower mean error is better.
//!
//! The pipeline is a secondary sort: games are fanned out per K-factor, grouped by K-factor alone
//! and ordered by date within the group ([`sort_key`], [`partition`]). Each group is rated by its
//! own [`ranking::EloEngine`] on its own worker, and the per-game scores are reduced by [`fit`].

pub mod codec;
pub mod data_loader;
pub mod error;
pub mod fit;
pub mod league;
pub mod partition;
pub mod ranking;
pub mod ranking_context;
pub mod report;
pub mod sort_key;
pub mod sweep;

pub use error::{EloError, Result};
pub use fit::{best_k_factor, AccuracyAggregator, GameScore, KFactorScore};
pub use league::{FixedLeagueStats, LeagueSeasonStats, LeagueStatsProvider, LeagueTable};
pub use ranking_context::SweepContext;
pub use sweep::{run_sweep, run_sweep_to_completion, CancelToken, SweepOutcome};
