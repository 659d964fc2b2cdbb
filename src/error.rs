use thiserror::Error;

/// Errors raised by the library
#[derive(Debug, Error)]
pub enum Error {
    /// A team has no feature row before the requested date
    #[error("no history for team {team_id} before {date}")]
    NoHistory { team_id: i64, date: chrono::NaiveDate },

    /// A persisted model was trained on a different feature layout
    #[error("model feature schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("training failed: {0}")]
    Training(String),

    #[error("unknown team: {0}")]
    UnknownTeam(String),

    /// The stats API answered but the payload was not what we expected
    #[error("stats API error: {0}")]
    Api(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
