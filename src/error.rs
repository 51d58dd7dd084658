use thiserror::Error;

/// Everything that can go wrong while rating games for a K-factor sweep.
///
/// Per-game variants (`PlayerNotFound`, `MalformedRecord`, `DegenerateRedistribution`,
/// `MissingSeasonStats`) are isolated to the game that raised them. `InvalidConfig`
/// is fatal and is raised before any worker starts.
#[derive(Error, Debug)]
pub enum EloError {
    #[error("Player {player_id} not found on team {team_id}")]
    PlayerNotFound { team_id: String, player_id: String },

    #[error("Malformed record: {reason} (line: {line:?})")]
    MalformedRecord { line: String, reason: String },

    #[error("Degenerate redistribution for team {team_id}: {reason}")]
    DegenerateRedistribution { team_id: String, reason: String },

    #[error("No league stats for season {0}")]
    MissingSeasonStats(i32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Partition for K-factor {0} was cancelled")]
    Cancelled(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EloError {
    pub fn malformed(line: &str, reason: impl Into<String>) -> Self {
        EloError::MalformedRecord { line: line.to_string(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, EloError>;
