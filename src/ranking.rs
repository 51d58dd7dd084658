use std::collections::HashMap;

use tracing::{debug, warn};

use crate::data_loader::*;
use crate::error::{EloError, Result};
use crate::fit::{accuracy_score, GameScore};
use crate::league::{LeagueSeasonStats, LeagueStatsProvider};
use crate::partition::KeyedGame;
use crate::sort_key::SortKey;

// Logistic expected scores for home and away. Written with the rating gap so large ratings can't
// overflow 10^(R/400).
pub fn expected_scores(home_elo: f64, away_elo: f64, elo_delta: f64) -> (f64, f64) {
    let home = 1.0 / (1.0 + f64::powf(10.0, (away_elo - home_elo) / elo_delta));
    let away = 1.0 / (1.0 + f64::powf(10.0, (home_elo - away_elo) / elo_delta));
    (home, away)
}

pub fn elo_change(k_factor: f64, actual: f64, expected: f64) -> f64 {
    k_factor * (actual - expected)
}

// A player's contribution to a win, weighted by how valuable each stat was league-wide that season.
pub fn performance_score(player: &PlayerGameStat, league: &LeagueSeasonStats) -> f64 {
    let efg = league.effective_fg_pct;
    let keep = 1.0 - league.turnover_pct;

    player.points
        + player.rebounds * 2.0 * efg * keep
        + player.assists * 2.0
        + player.steals * 2.0 * efg * keep
        + player.blocks * 2.0 * efg
        - player.turnovers * 2.0 * efg * keep
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Home,
    Away,
    Tied,
}

impl Prediction {
    pub fn from_ratings(home_elo: f64, away_elo: f64) -> Self {
        if home_elo > away_elo {
            Prediction::Home
        } else if away_elo > home_elo {
            Prediction::Away
        } else {
            Prediction::Tied
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Tied,
}

impl Outcome {
    pub fn from_points(home_points: f64, away_points: f64) -> Self {
        if home_points > away_points {
            Outcome::HomeWin
        } else if away_points > home_points {
            Outcome::AwayWin
        } else {
            Outcome::Tied
        }
    }

    // (home, away) actual scores. None for a tie, which has no winner to reward.
    pub fn actual_scores(&self) -> Option<(f64, f64)> {
        match self {
            Outcome::HomeWin => Some((1.0, 0.0)),
            Outcome::AwayWin => Some((0.0, 1.0)),
            Outcome::Tied => None,
        }
    }
}

/// Current rating of every player one partition has seen. Owned by exactly one worker.
#[derive(Debug)]
pub struct RatingState {
    ratings: HashMap<String, f64>,
    initial_elo: f64,
}

impl RatingState {
    pub fn new(initial_elo: f64) -> Self {
        Self { ratings: HashMap::new(), initial_elo }
    }

    // Players we haven't seen start at the seed rating.
    pub fn rating(&self, player_id: &str) -> f64 {
        self.ratings.get(player_id).copied().unwrap_or(self.initial_elo)
    }

    pub fn set_rating(&mut self, player_id: &str, elo: f64) {
        match self.ratings.get_mut(player_id) {
            Some(r) => *r = elo,
            None => { self.ratings.insert(player_id.to_string(), elo); }
        }
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

// Spreads a team-level change over the roster. The team rating is a mean, so the players absorb
// change * count between them. Losers give up rating in proportion to what they had, winners gain
// in proportion to how they played. Every player's end_elo is set, to the start rating when nothing
// is redistributed.
pub fn redistribute(
    team: &mut TeamGameStat,
    change: f64,
    league: &LeagueSeasonStats,
) -> Result<()> {
    for p in team.players_mut() {
        p.end_elo = p.start_elo;
    }

    if change == 0.0 {
        return Ok(());
    }

    let count = team.player_count();
    if count == 0 {
        return Err(EloError::DegenerateRedistribution {
            team_id: team.team_id.clone(),
            reason: "empty roster".to_string(),
        });
    }

    let weights: Vec<f64> = if change < 0.0 {
        team.players().map(|p| p.start_elo).collect()
    } else {
        team.players().map(|p| performance_score(p, league)).collect()
    };

    let denominator: f64 = weights.iter().sum();
    if !denominator.is_finite() || denominator <= 0.0 {
        return Err(EloError::DegenerateRedistribution {
            team_id: team.team_id.clone(),
            reason: format!("share denominator is {denominator}"),
        });
    }

    let total = change * count as f64;
    for (p, w) in team.players_mut().zip(weights) {
        p.end_elo = p.start_elo + total * w / denominator;
    }

    Ok(())
}

/// One game after the engine has been through it.
#[derive(Debug, Clone)]
pub struct RatedGame {
    pub key: SortKey,
    pub game: GameRecord,
    pub home_start: f64,
    pub away_start: f64,
    pub expected_home: f64,
    pub expected_away: f64,
    pub score: GameScore,
    pub degenerate_teams: Vec<String>,
}

impl RatedGame {
    pub fn home_end(&self) -> f64 {
        self.game.home.end_rating()
    }

    pub fn away_end(&self) -> f64 {
        self.game.away.end_rating()
    }
}

/// Per-partition Elo state machine. Feed it games of one K-factor in chronological order.
pub struct EloEngine<'a, L: LeagueStatsProvider + ?Sized> {
    k_factor: u32,
    elo_delta: f64,
    state: RatingState,
    league: &'a L,
}

impl<'a, L: LeagueStatsProvider + ?Sized> EloEngine<'a, L> {
    pub fn new(k_factor: u32, initial_elo: f64, elo_delta: f64, league: &'a L) -> Self {
        Self {
            k_factor,
            elo_delta,
            state: RatingState::new(initial_elo),
            league,
        }
    }

    pub fn k_factor(&self) -> u32 {
        self.k_factor
    }

    pub fn state(&self) -> &RatingState {
        &self.state
    }

    // Rates one game. Everything fallible happens before the rating state is touched, so a failed
    // game leaves the partition exactly as it was.
    pub fn process(&mut self, keyed: KeyedGame) -> Result<RatedGame> {
        let KeyedGame { key, mut game } = keyed;
        debug_assert_eq!(key.k_factor, self.k_factor);

        let league = self
            .league
            .season_stats(game.season_year)
            .ok_or(EloError::MissingSeasonStats(game.season_year))?;

        for p in game.home.players_mut().chain(game.away.players_mut()) {
            p.start_elo = self.state.rating(&p.player_id);
        }

        let home_start = game.home.start_rating();
        let away_start = game.away.start_rating();
        let (expected_home, expected_away) =
            expected_scores(home_start, away_start, self.elo_delta);

        let prediction = Prediction::from_ratings(home_start, away_start);
        let outcome = Outcome::from_points(game.home.points, game.away.points);
        let score = accuracy_score(prediction, outcome, expected_home, expected_away);

        let (home_change, away_change) = match outcome.actual_scores() {
            Some((home_actual, away_actual)) => (
                elo_change(self.k_factor as f64, home_actual, expected_home),
                elo_change(self.k_factor as f64, away_actual, expected_away),
            ),
            None => (0.0, 0.0),
        };

        let mut degenerate_teams = Vec::new();
        for (team, change) in [(&mut game.home, home_change), (&mut game.away, away_change)] {
            if let Err(e) = redistribute(team, change, &league) {
                warn!(
                    k_factor = self.k_factor,
                    game_id = %game.game_id,
                    error = %e,
                    "Ratings left unchanged"
                );
                degenerate_teams.push(team.team_id.clone());
            }
        }

        for p in game.home.players().chain(game.away.players()) {
            self.state.set_rating(&p.player_id, p.end_elo);
        }

        debug!(
            k_factor = self.k_factor,
            game_id = %game.game_id,
            home_start,
            away_start,
            home_change,
            away_change,
            ?score,
            "Rated game"
        );

        Ok(RatedGame {
            key,
            game,
            home_start,
            away_start,
            expected_home,
            expected_away,
            score,
            degenerate_teams,
        })
    }
}
