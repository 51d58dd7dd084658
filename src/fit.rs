use std::collections::BTreeMap;

use tracing::warn;

use crate::codec::{parse_rated_line, RatedLine};
use crate::error::Result;
use crate::ranking::{expected_scores, Outcome, Prediction};

/// What one game contributes to its K-factor's accuracy.
///
/// Excluded games are kept apart from `Scored(0.0)` so they never reach the mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameScore {
    Scored(f64),
    TiedPrediction,
    TiedOutcome,
}

impl GameScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            GameScore::Scored(v) => Some(*v),
            _ => None,
        }
    }
}

// Scores the favourite's win probability against what happened. A correct call scores 1 - E, a
// wrong one scores E, so lower is better. Games with no favourite (in practice the opening games at
// seed rating) or no winner are thrown out.
pub fn accuracy_score(
    prediction: Prediction,
    outcome: Outcome,
    expected_home: f64,
    expected_away: f64,
) -> GameScore {
    match (prediction, outcome) {
        (Prediction::Tied, _) => GameScore::TiedPrediction,
        (_, Outcome::Tied) => GameScore::TiedOutcome,
        (Prediction::Home, Outcome::HomeWin) => GameScore::Scored(1.0 - expected_home),
        (Prediction::Home, Outcome::AwayWin) => GameScore::Scored(expected_home),
        (Prediction::Away, Outcome::AwayWin) => GameScore::Scored(1.0 - expected_away),
        (Prediction::Away, Outcome::HomeWin) => GameScore::Scored(expected_away),
    }
}

/// Final accuracy of one K-factor.
#[derive(Debug, Clone, PartialEq)]
pub struct KFactorScore {
    pub k_factor: u32,
    pub mean_error: Option<f64>,   // None when no game could be scored
    pub scored: usize,
    pub tied_predictions: usize,
    pub tied_outcomes: usize,
    pub skipped: usize,
}

/// Running mean over one partition's game scores.
#[derive(Debug, Clone)]
pub struct AccuracyAggregator {
    k_factor: u32,
    sum: f64,
    scored: usize,
    tied_predictions: usize,
    tied_outcomes: usize,
    skipped: usize,
}

impl AccuracyAggregator {
    pub fn new(k_factor: u32) -> Self {
        Self {
            k_factor,
            sum: 0.0,
            scored: 0,
            tied_predictions: 0,
            tied_outcomes: 0,
            skipped: 0,
        }
    }

    pub fn push(&mut self, score: GameScore) {
        match score {
            GameScore::Scored(v) => {
                self.sum += v;
                self.scored += 1;
            }
            GameScore::TiedPrediction => self.tied_predictions += 1,
            GameScore::TiedOutcome => self.tied_outcomes += 1,
        }
    }

    // A game that failed before it could be rated.
    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn finish(self) -> KFactorScore {
        KFactorScore {
            k_factor: self.k_factor,
            mean_error: if self.scored == 0 { None } else { Some(self.sum / self.scored as f64) },
            scored: self.scored,
            tied_predictions: self.tied_predictions,
            tied_outcomes: self.tied_outcomes,
            skipped: self.skipped,
        }
    }
}

// Lowest mean error wins. Ties go to the smaller K-factor; K-factors without a mean can't win.
pub fn best_k_factor(scores: &[KFactorScore]) -> Option<&KFactorScore> {
    scores
        .iter()
        .filter_map(|s| s.mean_error.map(|m| (m, s)))
        .min_by(|(a, sa), (b, sb)| a.total_cmp(b).then(sa.k_factor.cmp(&sb.k_factor)))
        .map(|(_, s)| s)
}

// Scores a rated line on its own, from the team start ratings and the final points.
pub fn score_rated_line(line: &str, elo_delta: f64) -> Result<(u32, GameScore)> {
    let rated = parse_rated_line(line)?;
    Ok((rated.k_factor, score_line(&rated, elo_delta)))
}

pub fn score_line(rated: &RatedLine, elo_delta: f64) -> GameScore {
    let (expected_home, expected_away) =
        expected_scores(rated.home.start_elo, rated.away.start_elo, elo_delta);
    accuracy_score(
        Prediction::from_ratings(rated.home.start_elo, rated.away.start_elo),
        Outcome::from_points(rated.home.points, rated.away.points),
        expected_home,
        expected_away,
    )
}

// Aggregates rated lines per K-factor, in line order. Malformed lines are logged and skipped; they
// can't be attributed to a K-factor so they are not counted anywhere.
pub fn rescore_lines<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    elo_delta: f64,
) -> Vec<KFactorScore> {
    let mut aggregators: BTreeMap<u32, AccuracyAggregator> = BTreeMap::new();

    for (line_no, line) in lines.into_iter().enumerate() {
        if line.trim().is_empty() { continue; }

        match score_rated_line(line, elo_delta) {
            Ok((k_factor, score)) => aggregators
                .entry(k_factor)
                .or_insert_with(|| AccuracyAggregator::new(k_factor))
                .push(score),
            Err(e) => warn!(line = line_no + 1, error = %e, "Skipping rated line"),
        }
    }

    aggregators.into_values().map(AccuracyAggregator::finish).collect()
}
