//! Runtime configuration, read from the environment (and `.env` via dotenv).

use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CUTOFF: &str = "2023-01-01";
const DEFAULT_STATS_BASE_URL: &str = "https://stats.nba.com/stats";

const GAMES_FILE: &str = "nba_games.csv";
const FEATURES_FILE: &str = "nba_games_ready.csv";
const MODEL_FILE: &str = "nba_predictor.json";
const BETS_FILE: &str = "bets_history.csv";

/// Settings for the rolling feature computation
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    /// Rows dated before this are discarded
    pub cutoff: NaiveDate,
    /// Number of prior games averaged into each rolling feature
    pub window: usize,
    /// Rest assigned to a team's first recorded game
    pub default_rest_days: i64,
    /// Upper clip for rest days
    pub max_rest_days: i64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            cutoff: NaiveDate::from_ymd_opt(2023, 1, 1).expect("2023-01-01 is a valid date"),
            window: 5,
            default_rest_days: 3,
            max_rest_days: 7,
        }
    }
}

/// Settings for the stats API client
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STATS_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub use_cache: bool,
    pub features: FeatureConfig,
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            use_cache: false,
            features: FeatureConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let data_dir = lookup("NBA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let cutoff_raw = lookup("NBA_SEASON_CUTOFF").unwrap_or_else(|| DEFAULT_CUTOFF.to_string());
        let cutoff = NaiveDate::parse_from_str(cutoff_raw.trim(), "%Y-%m-%d").map_err(|e| {
            Error::Config(format!("NBA_SEASON_CUTOFF '{}': {}", cutoff_raw, e))
        })?;

        let features = FeatureConfig {
            cutoff,
            window: parse_var(&lookup, "NBA_ROLLING_WINDOW", defaults.features.window)?,
            default_rest_days: parse_var(
                &lookup,
                "NBA_DEFAULT_REST_DAYS",
                defaults.features.default_rest_days,
            )?,
            max_rest_days: parse_var(&lookup, "NBA_MAX_REST_DAYS", defaults.features.max_rest_days)?,
        };

        if features.window == 0 {
            return Err(Error::Config("NBA_ROLLING_WINDOW must be at least 1".into()));
        }
        if features.max_rest_days < 0 {
            return Err(Error::Config("NBA_MAX_REST_DAYS must not be negative".into()));
        }

        let api = ApiConfig {
            base_url: lookup("NBA_STATS_BASE_URL").unwrap_or(defaults.api.base_url),
            timeout: Duration::from_secs(parse_var(&lookup, "NBA_API_TIMEOUT_SECS", 30u64)?),
            max_attempts: parse_var(&lookup, "NBA_API_MAX_ATTEMPTS", defaults.api.max_attempts)?
                .max(1),
            base_backoff: Duration::from_millis(parse_var(&lookup, "NBA_API_BACKOFF_MS", 1000u64)?),
        };

        Ok(Self {
            data_dir,
            use_cache: lookup("USE_CACHE").unwrap_or_default() == "1",
            features,
            api,
        })
    }

    pub fn games_file(&self) -> PathBuf {
        self.data_dir.join(GAMES_FILE)
    }

    pub fn features_file(&self) -> PathBuf {
        self.data_dir.join(FEATURES_FILE)
    }

    pub fn model_file(&self) -> PathBuf {
        self.data_dir.join(MODEL_FILE)
    }

    pub fn bets_file(&self) -> PathBuf {
        self.data_dir.join(BETS_FILE)
    }

    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| Error::Config(format!("{} '{}': {}", key, raw, e))),
        _ => Ok(default),
    }
}
