use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::*;
use serde_aux::field_attributes::deserialize_number_from_string;
use tracing::info;

use crate::error::Result;

/// League-wide averages for one season, used to weight individual box-score lines.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LeagueSeasonStats {
    #[serde(rename = "seasonYear", deserialize_with = "deserialize_number_from_string")]
    pub season_year: i32,
    #[serde(rename = "effectiveFgPct", deserialize_with = "deserialize_number_from_string")]
    pub effective_fg_pct: f64,
    #[serde(rename = "turnoverPct", deserialize_with = "deserialize_number_from_string")]
    pub turnover_pct: f64,
}

/// Read-only season lookup. Populated before the sweep starts and shared by every worker without
/// locking.
pub trait LeagueStatsProvider: Sync {
    fn season_stats(&self, season_year: i32) -> Option<LeagueSeasonStats>;
}

/// Season table loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct LeagueTable {
    seasons: BTreeMap<i32, LeagueSeasonStats>,
}

impl LeagueTable {
    pub fn from_seasons(seasons: impl IntoIterator<Item = LeagueSeasonStats>) -> Self {
        Self {
            seasons: seasons.into_iter().map(|s| (s.season_year, s)).collect(),
        }
    }

    pub fn load(file_path: &Path) -> Result<Self> {
        let data = fs::read_to_string(file_path)?;
        let seasons: Vec<LeagueSeasonStats> = serde_json::from_str(&data)?;
        let table = Self::from_seasons(seasons);
        info!(path = %file_path.display(), seasons = table.len(), "Loaded league season stats");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }
}

impl LeagueStatsProvider for LeagueTable {
    fn season_stats(&self, season_year: i32) -> Option<LeagueSeasonStats> {
        self.seasons.get(&season_year).copied()
    }
}

/// Same averages for every season.
#[derive(Debug, Clone, Copy)]
pub struct FixedLeagueStats {
    pub effective_fg_pct: f64,
    pub turnover_pct: f64,
}

impl LeagueStatsProvider for FixedLeagueStats {
    fn season_stats(&self, season_year: i32) -> Option<LeagueSeasonStats> {
        Some(LeagueSeasonStats {
            season_year,
            effective_fg_pct: self.effective_fg_pct,
            turnover_pct: self.turnover_pct,
        })
    }
}
