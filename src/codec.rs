use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::data_loader::TeamGameStat;
use crate::error::{EloError, Result};
use crate::ranking::RatedGame;

// Rated line layout: <k>\t then comma separated
//  0. gameId   1. year   2. month   3. day
//  4. homeTeamId   5. homeTeamPoints   6. homeTeamStartElo   7. homeTeamEndElo
//  8. awayTeamId   9. awayTeamPoints  10. awayTeamStartElo  11. awayTeamEndElo
// 12. homeTeamId, then (playerId, startElo, endElo) per home player
//  n. awayTeamId, then (playerId, startElo, endElo) per away player
const HEADER_FIELDS: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct RatedLine {
    pub k_factor: u32,
    pub game_id: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub home: TeamLine,
    pub away: TeamLine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamLine {
    pub team_id: String,
    pub points: f64,
    pub start_elo: f64,
    pub end_elo: f64,
    pub players: Vec<PlayerLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerLine {
    pub player_id: String,
    pub start_elo: f64,
    pub end_elo: f64,
}

impl TeamLine {
    fn from_team(team: &TeamGameStat, start_elo: f64) -> Self {
        Self {
            team_id: team.team_id.clone(),
            points: team.points,
            start_elo,
            end_elo: team.end_rating(),
            players: team
                .players()
                .map(|p| PlayerLine {
                    player_id: p.player_id.clone(),
                    start_elo: p.start_elo,
                    end_elo: p.end_elo,
                })
                .collect(),
        }
    }
}

impl From<&RatedGame> for RatedLine {
    fn from(rated: &RatedGame) -> Self {
        Self {
            k_factor: rated.key.k_factor,
            game_id: rated.game.game_id.clone(),
            year: rated.game.year,
            month: rated.game.month,
            day: rated.game.day,
            home: TeamLine::from_team(&rated.game.home, rated.home_start),
            away: TeamLine::from_team(&rated.game.away, rated.away_start),
        }
    }
}

pub fn format_rated_game(rated: &RatedGame) -> Result<String> {
    format_rated_line(&RatedLine::from(rated))
}

pub fn format_rated_line(rated: &RatedLine) -> Result<String> {
    let mut fields: Vec<String> = vec![
        rated.game_id.clone(),
        rated.year.to_string(),
        rated.month.to_string(),
        rated.day.to_string(),
    ];
    for team in [&rated.home, &rated.away] {
        fields.push(team.team_id.clone());
        fields.push(team.points.to_string());
        fields.push(team.start_elo.to_string());
        fields.push(team.end_elo.to_string());
    }
    for team in [&rated.home, &rated.away] {
        fields.push(team.team_id.clone());
        for p in &team.players {
            fields.push(p.player_id.clone());
            fields.push(p.start_elo.to_string());
            fields.push(p.end_elo.to_string());
        }
    }

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(&fields)?;
    let bytes = writer.into_inner().map_err(|e| EloError::Io(e.into_error()))?;
    let csv_line = String::from_utf8(bytes)
        .map_err(|e| EloError::malformed(&rated.game_id, e.to_string()))?;

    Ok(format!("{}\t{}", rated.k_factor, csv_line.trim_end()))
}

pub fn parse_rated_line(line: &str) -> Result<RatedLine> {
    let (k_part, csv_part) = line
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| EloError::malformed(line, "missing K-factor separator"))?;
    let k_factor = parse_field::<u32>(line, k_part, "kFactor")?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_part.trim().as_bytes());
    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Err(EloError::malformed(line, "empty record"));
    }

    // Header, plus one team marker per roster
    if record.len() < HEADER_FIELDS + 2 {
        let expected = HEADER_FIELDS + 2;
        let reason = format!("expected at least {} fields, found {}", expected, record.len());
        return Err(EloError::malformed(line, reason));
    }

    let field = |i: usize| record.get(i).unwrap_or_default();

    let mut home = team_header(line, &record, 4)?;
    let mut away = team_header(line, &record, 8)?;

    if field(HEADER_FIELDS) != home.team_id {
        let reason = format!("expected home roster marker {}", home.team_id);
        return Err(EloError::malformed(line, reason));
    }

    let mut pos = HEADER_FIELDS + 1;
    while pos < record.len() && field(pos) != away.team_id {
        home.players.push(player_triple(line, &record, pos)?);
        pos += 3;
    }
    if pos >= record.len() {
        let reason = format!("missing away roster marker {}", away.team_id);
        return Err(EloError::malformed(line, reason));
    }

    pos += 1;
    while pos < record.len() {
        away.players.push(player_triple(line, &record, pos)?);
        pos += 3;
    }

    Ok(RatedLine {
        k_factor,
        game_id: field(0).to_string(),
        year: parse_field(line, field(1), "year")?,
        month: parse_field(line, field(2), "month")?,
        day: parse_field(line, field(3), "day")?,
        home,
        away,
    })
}

fn team_header(line: &str, record: &StringRecord, at: usize) -> Result<TeamLine> {
    let field = |i: usize| record.get(i).unwrap_or_default();
    Ok(TeamLine {
        team_id: field(at).to_string(),
        points: parse_field(line, field(at + 1), "teamPoints")?,
        start_elo: parse_field(line, field(at + 2), "teamStartElo")?,
        end_elo: parse_field(line, field(at + 3), "teamEndElo")?,
        players: Vec::new(),
    })
}

fn player_triple(line: &str, record: &StringRecord, at: usize) -> Result<PlayerLine> {
    if at + 2 >= record.len() {
        return Err(EloError::malformed(line, format!("truncated player block at field {at}")));
    }
    Ok(PlayerLine {
        player_id: record.get(at).unwrap_or_default().to_string(),
        start_elo: parse_field(line, record.get(at + 1).unwrap_or_default(), "playerStartElo")?,
        end_elo: parse_field(line, record.get(at + 2).unwrap_or_default(), "playerEndElo")?,
    })
}

fn parse_field<T: FromStr>(line: &str, raw: &str, name: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| EloError::malformed(line, format!("{name} is not a number: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "12\tg7,2016,1,9,BOS,104,1210.5,1214.25,LAL,99,1190,1186.5,BOS,a,1200,1206,b,1221,1222.5,LAL,c,1190,1186.5";

    #[test]
    fn parses_source_layout() {
        let rated = parse_rated_line(LINE).unwrap();
        assert_eq!(rated.k_factor, 12);
        assert_eq!(rated.game_id, "g7");
        assert_eq!((rated.year, rated.month, rated.day), (2016, 1, 9));
        assert_eq!(rated.home.team_id, "BOS");
        assert_eq!(rated.home.start_elo, 1210.5);
        assert_eq!(rated.home.players.len(), 2);
        assert_eq!(rated.home.players[1], PlayerLine { player_id: "b".into(), start_elo: 1221.0, end_elo: 1222.5 });
        assert_eq!(rated.away.points, 99.0);
        assert_eq!(rated.away.players.len(), 1);
    }

    #[test]
    fn formats_back_to_the_same_text() {
        let rated = parse_rated_line(LINE).unwrap();
        assert_eq!(format_rated_line(&rated).unwrap(), LINE);
    }

    #[test]
    fn accepts_space_separator() {
        let spaced = LINE.replacen('\t', " ", 1);
        assert_eq!(parse_rated_line(&spaced).unwrap().k_factor, 12);
    }

    #[test]
    fn empty_rosters_still_parse() {
        let rated = parse_rated_line("3\tg1,2016,1,2,BOS,100,0,0,LAL,90,1200,1190,BOS,LAL").unwrap();
        assert!(rated.home.players.is_empty());
        assert!(rated.away.players.is_empty());
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let bad = [
            "no-separator",
            "x\tg1,2016,1,2,BOS,100,0,0,LAL,90,1200,1190,BOS,LAL",
            "3\tg1,2016,1,2,BOS,100,0,0",
            "3\tg1,2016,1,2,BOS,abc,0,0,LAL,90,1200,1190,BOS,LAL",
            "3\tg1,2016,1,2,BOS,100,0,0,LAL,90,1200,1190,LAL,BOS",
            "3\tg1,2016,1,2,BOS,100,0,0,LAL,90,1200,1190,BOS,a,1200",
            "3\tg1,2016,1,2,BOS,100,0,0,LAL,90,1200,1190,BOS,a,1200,1201,c,1,2",
        ];
        for line in bad {
            assert!(
                matches!(parse_rated_line(line), Err(EloError::MalformedRecord { .. })),
                "{line} should be malformed"
            );
        }
    }
}
