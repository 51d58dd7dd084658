use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;

use serde::*;
use serde_aux::field_attributes::deserialize_number_from_string;
use tracing::{info, warn};

use crate::error::{EloError, Result};

// Loads games from the JSON file at file_path. Numeric fields may be plain JSON numbers or decimal
// strings. Games are returned in file order; the partition stage puts them in chronological order.
// A game that doesn't parse is logged and skipped, the rest of the file still loads.
pub fn load_games(file_path: &Path) -> Result<Vec<GameRecord>> {
    let data = fs::read_to_string(file_path)?;
    let game_data: GameData = serde_json::from_str(&data)?;

    let mut games = Vec::with_capacity(game_data.games.len());
    for (idx, raw) in game_data.games.into_iter().enumerate() {
        let g = match parse_game(raw) {
            Ok(g) => g,
            Err(e) => {
                warn!(index = idx, error = %e, "Skipping game");
                continue;
            }
        };

        // Same team on both sides can't be rated
        if g.home.team_id == g.away.team_id {
            warn!(
                game_id = %g.game_id,
                team_id = %g.home.team_id,
                "Skipping game with identical home and away team"
            );
            continue;
        }
        games.push(g);
    }

    info!(path = %file_path.display(), games = games.len(), "Loaded games");
    Ok(games)
}

fn parse_game(raw: serde_json::Value) -> Result<GameRecord> {
    let game_id = raw.get("gameId").and_then(|v| v.as_str()).unwrap_or("?").to_string();
    serde_json::from_value(raw).map_err(|e| EloError::malformed(&game_id, e.to_string()))
}

// Games are kept as raw JSON until each one is parsed on its own.
#[derive(Deserialize, Debug)]
struct GameData {
    games: Vec<serde_json::Value>,
}

// Every number is written as its decimal string so any reader gets the same text back.
pub fn as_decimal_string<T: Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GameRecord {
    #[serde(rename = "gameId")]
    pub game_id: String,
    #[serde(rename = "seasonYear")]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub season_year: i32,
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub year: i32,
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub month: u32,
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub day: u32,
    pub home: TeamGameStat,
    pub away: TeamGameStat,
}

impl GameRecord {
    pub fn new(
        game_id: &str,
        season_year: i32,
        (year, month, day): (i32, u32, u32),
        home: TeamGameStat,
        away: TeamGameStat,
    ) -> Self {
        Self {
            game_id: game_id.to_string(),
            season_year,
            year,
            month,
            day,
            home,
            away,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamGameStat {
    #[serde(rename = "teamId")]
    pub team_id: String,
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub points: f64,
    #[serde(rename = "minPlayed", default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub min_played: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub rebounds: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub assists: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub steals: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub blocks: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub turnovers: f64,
    // Stored as a list on disk, keyed by player id in memory.
    // BTreeMap keeps iteration (and float sums) deterministic.
    #[serde(serialize_with = "roster_as_list", deserialize_with = "roster_from_list", default)]
    players: BTreeMap<String, PlayerGameStat>,
}

impl TeamGameStat {
    pub fn new(team_id: &str, points: f64) -> Self {
        Self {
            team_id: team_id.to_string(),
            points,
            min_played: 0.0,
            rebounds: 0.0,
            assists: 0.0,
            steals: 0.0,
            blocks: 0.0,
            turnovers: 0.0,
            players: BTreeMap::new(),
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerGameStat> {
        self.players.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut PlayerGameStat> {
        self.players.values_mut()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, player_id: &str) -> Result<&PlayerGameStat> {
        self.players.get(player_id).ok_or_else(|| self.player_not_found(player_id))
    }

    pub fn player_mut(&mut self, player_id: &str) -> Result<&mut PlayerGameStat> {
        let team_id = &self.team_id;
        self.players.get_mut(player_id).ok_or_else(|| EloError::PlayerNotFound {
            team_id: team_id.clone(),
            player_id: player_id.to_string(),
        })
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    // Replaces any player already on the roster with the same id.
    pub fn add_player(&mut self, player: PlayerGameStat) {
        self.players.insert(player.player_id.clone(), player);
    }

    // Mean of the players' start ratings. An empty roster has no rating to average, so it rates 0.
    pub fn start_rating(&self) -> f64 {
        mean_of(self.players.values().map(|p| p.start_elo))
    }

    pub fn end_rating(&self) -> f64 {
        mean_of(self.players.values().map(|p| p.end_elo))
    }

    fn player_not_found(&self, player_id: &str) -> EloError {
        EloError::PlayerNotFound {
            team_id: self.team_id.clone(),
            player_id: player_id.to_string(),
        }
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn roster_as_list<S: Serializer>(
    players: &BTreeMap<String, PlayerGameStat>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(players.values())
}

fn roster_from_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, PlayerGameStat>, D::Error> {
    let list: Vec<PlayerGameStat> = Vec::deserialize(deserializer)?;
    let mut players = BTreeMap::new();
    for p in list {
        players.insert(p.player_id.clone(), p);
    }
    Ok(players)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlayerGameStat {
    #[serde(rename = "playerId")]
    pub player_id: String,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub points: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub rebounds: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub assists: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub steals: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub blocks: f64,
    #[serde(default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub turnovers: f64,
    #[serde(rename = "startElo", default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub start_elo: f64,
    #[serde(rename = "endElo", default)]
    #[serde(serialize_with = "as_decimal_string")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub end_elo: f64,
}

impl PlayerGameStat {
    pub fn new(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            points: 0.0,
            rebounds: 0.0,
            assists: 0.0,
            steals: 0.0,
            blocks: 0.0,
            turnovers: 0.0,
            start_elo: 0.0,
            end_elo: 0.0,
        }
    }

    pub fn with_line(
        mut self,
        points: f64,
        rebounds: f64,
        assists: f64,
        steals: f64,
        blocks: f64,
        turnovers: f64,
    ) -> Self {
        self.points = points;
        self.rebounds = rebounds;
        self.assists = assists;
        self.steals = steals;
        self.blocks = blocks;
        self.turnovers = turnovers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn team(id: &str, points: f64, players: &[&str]) -> TeamGameStat {
        let mut t = TeamGameStat::new(id, points);
        for p in players {
            t.add_player(PlayerGameStat::new(p));
        }
        t
    }

    #[test]
    fn player_lookup_reports_missing_player() {
        let t = team("BOS", 100.0, &["tatumja01"]);
        assert!(t.player("tatumja01").is_ok());
        match t.player("jamesle01") {
            Err(EloError::PlayerNotFound { team_id, player_id }) => {
                assert_eq!(team_id, "BOS");
                assert_eq!(player_id, "jamesle01");
            }
            other => panic!("expected PlayerNotFound, got {other:?}"),
        }
        let mut t = t;
        assert!(matches!(t.player_mut("nobody"), Err(EloError::PlayerNotFound { .. })));
    }

    #[test]
    fn add_player_replaces_same_id() {
        let mut t = team("BOS", 100.0, &["a"]);
        t.add_player(PlayerGameStat::new("a").with_line(30.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(t.player_count(), 1);
        assert_eq!(t.player("a").unwrap().points, 30.0);
        assert!(t.has_player("a"));
        assert!(!t.has_player("b"));
    }

    #[test]
    fn empty_roster_rates_zero() {
        let t = team("BOS", 100.0, &[]);
        assert_eq!(t.start_rating(), 0.0);
        assert_eq!(t.end_rating(), 0.0);
    }

    #[test]
    fn numbers_round_trip_as_decimal_strings() {
        let mut home = team("BOS", 110.0, &[]);
        let mut p = PlayerGameStat::new("a").with_line(21.0, 7.0, 3.0, 1.0, 0.0, 2.0);
        p.start_elo = 1203.123456789;
        p.end_elo = 0.1 + 0.2;
        home.add_player(p);
        let game = GameRecord::new("g1", 2016, (2016, 1, 3), home, team("LAL", 100.0, &["b"]));

        let json = serde_json::to_string(&game).unwrap();
        assert!(json.contains("\"seasonYear\":\"2016\""));
        assert!(json.contains("\"endElo\":\"0.30000000000000004\""));

        let back: GameRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, game);
        assert_eq!(back.home.player("a").unwrap().end_elo.to_bits(), (0.1f64 + 0.2).to_bits());
    }

    #[test]
    fn loads_plain_numbers_and_skips_self_games() {
        let json = r#"{"games": [
            {"gameId": "g1", "seasonYear": 2016, "year": 2015, "month": 11, "day": "2",
             "home": {"teamId": "BOS", "points": 101, "players": [{"playerId": "a", "points": "12"}]},
             "away": {"teamId": "LAL", "points": "99", "players": []}},
            {"gameId": "g2", "seasonYear": 2016, "year": 2015, "month": 11, "day": 3,
             "home": {"teamId": "BOS", "points": 90}, "away": {"teamId": "BOS", "points": 80}}
        ]}"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let games = load_games(file.path()).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].day, 2);
        assert_eq!(games[0].home.player("a").unwrap().points, 12.0);
        assert_eq!(games[0].away.points, 99.0);
    }

    #[test]
    fn bad_game_is_skipped_and_the_rest_load() {
        let json = r#"{"games": [
            {"gameId": "g1", "seasonYear": 2016, "year": 2015, "month": 11, "day": 2,
             "home": {"teamId": "BOS", "points": 101}, "away": {"teamId": "LAL", "points": 99}},
            {"gameId": "g2", "seasonYear": 2016, "year": 2015, "month": 11, "day": 3,
             "home": {"teamId": "BOS", "points": "abc"}, "away": {"teamId": "LAL", "points": 80}},
            {"gameId": "g3", "seasonYear": 2016, "year": 2015, "month": 11, "day": 4,
             "home": {"teamId": "LAL", "points": 95}}
        ]}"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let games = load_games(file.path()).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, "g1");
    }

    #[test]
    fn bad_game_reports_malformed_record() {
        let raw = serde_json::json!({"gameId": "g2", "seasonYear": 2016, "year": 2015, "month": 11, "day": 3,
            "home": {"teamId": "BOS", "points": "abc"}, "away": {"teamId": "LAL", "points": 80}});
        match parse_game(raw) {
            Err(EloError::MalformedRecord { line, .. }) => assert_eq!(line, "g2"),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }
}
