pub mod teams;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use teams::{NbaTeam, NBA_TEAMS};

/// One team's line in the stats API game log, as fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawGameRow {
    pub game_id: String,
    pub team_id: i64,
    #[serde(default)]
    pub team_abbreviation: String,
    pub game_date: String,
    #[serde(default)]
    pub matchup: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub wl: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pts: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub fgm: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub fga: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub fg3m: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub tov: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub oreb: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub ftm: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub fta: Option<f64>,
}

impl RawGameRow {
    /// Home/away from the matchup string ("LAL vs. BOS" is home, "LAL @ BOS" is away)
    pub fn is_home(&self) -> Option<bool> {
        if self.matchup.contains("vs.") {
            Some(true)
        } else if self.matchup.contains('@') {
            Some(false)
        } else {
            None
        }
    }

    /// Calendar date of the game; accepts a bare date or an ISO timestamp
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let raw = self.game_date.trim();
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    pub fn won(&self) -> Option<bool> {
        match self.wl.as_deref().map(str::trim) {
            Some("W") => Some(true),
            Some("L") => Some(false),
            _ => None,
        }
    }
}

/// One team's participation in one game, with derived and rolling features.
///
/// Rows of the persisted feature table always carry fully populated rolling
/// columns; rows without enough history never make it into the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GameTeamRecord {
    pub game_id: String,
    pub team_id: i64,
    pub team_abbreviation: String,
    pub game_date: NaiveDate,
    pub is_home: bool,
    pub won: Option<bool>,
    pub pts: Option<f64>,
    pub fgm: Option<f64>,
    pub fga: Option<f64>,
    pub fg3m: Option<f64>,
    pub ftm: Option<f64>,
    pub fta: Option<f64>,
    pub tov: Option<f64>,
    pub oreb: Option<f64>,
    // per-game Four Factors
    pub efg_pct: Option<f64>,
    pub tov_pct: Option<f64>,
    pub ft_rate: Option<f64>,
    pub orb_raw: Option<f64>,
    // form entering this game
    pub efg_pct_last_5: f64,
    pub tov_pct_last_5: f64,
    pub ft_rate_last_5: f64,
    pub orb_raw_last_5: f64,
    pub win_last_5: f64,
    pub days_rest: f64,
}

impl GameTeamRecord {
    /// The six per-side model inputs of this row
    pub fn rolling(&self) -> RollingFeatures {
        RollingFeatures {
            efg_pct_last_5: self.efg_pct_last_5,
            tov_pct_last_5: self.tov_pct_last_5,
            ft_rate_last_5: self.ft_rate_last_5,
            orb_raw_last_5: self.orb_raw_last_5,
            win_last_5: self.win_last_5,
            days_rest: self.days_rest,
        }
    }
}

/// Rolling form of one side of a matchup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingFeatures {
    pub efg_pct_last_5: f64,
    pub tov_pct_last_5: f64,
    pub ft_rate_last_5: f64,
    pub orb_raw_last_5: f64,
    pub win_last_5: f64,
    pub days_rest: f64,
}

impl RollingFeatures {
    /// Same form, with rest replaced (used at inference time)
    pub fn with_rest(self, days_rest: f64) -> Self {
        Self { days_rest, ..self }
    }
}

/// Signed home-minus-away differences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffFeatures {
    pub diff_efg: f64,
    pub diff_tov: f64,
    pub diff_orb: f64,
    pub diff_win: f64,
    pub diff_rest: f64,
}

impl DiffFeatures {
    pub fn between(home: &RollingFeatures, away: &RollingFeatures) -> Self {
        Self {
            diff_efg: home.efg_pct_last_5 - away.efg_pct_last_5,
            diff_tov: home.tov_pct_last_5 - away.tov_pct_last_5,
            diff_orb: home.orb_raw_last_5 - away.orb_raw_last_5,
            diff_win: home.win_last_5 - away.win_last_5,
            diff_rest: home.days_rest - away.days_rest,
        }
    }
}

/// One assembled matchup, ready for training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub game_id: String,
    pub game_date: NaiveDate,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home: RollingFeatures,
    pub away: RollingFeatures,
    pub diffs: DiffFeatures,
    pub home_team_won: bool,
}

impl TrainingExample {
    pub fn feature_vector(&self) -> FeatureVector {
        FeatureVector::from_sides(&self.home, &self.away)
    }

    pub fn label(&self) -> f64 {
        if self.home_team_won {
            1.0
        } else {
            0.0
        }
    }
}

pub const FEATURE_COUNT: usize = 17;

/// Column names of the model input, in the order of [`FeatureVector::to_array`]
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "EFG_PCT_LAST_5_HOME",
    "TOV_PCT_LAST_5_HOME",
    "FT_RATE_LAST_5_HOME",
    "ORB_RAW_LAST_5_HOME",
    "WIN_LAST_5_HOME",
    "DAYS_REST_HOME",
    "EFG_PCT_LAST_5_AWAY",
    "TOV_PCT_LAST_5_AWAY",
    "FT_RATE_LAST_5_AWAY",
    "ORB_RAW_LAST_5_AWAY",
    "WIN_LAST_5_AWAY",
    "DAYS_REST_AWAY",
    "DIFF_EFG",
    "DIFF_TOV",
    "DIFF_ORB",
    "DIFF_WIN",
    "DIFF_REST",
];

/// Fixed model input: home form, away form, then differences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub home: RollingFeatures,
    pub away: RollingFeatures,
    pub diffs: DiffFeatures,
}

impl FeatureVector {
    pub fn from_sides(home: &RollingFeatures, away: &RollingFeatures) -> Self {
        Self {
            home: *home,
            away: *away,
            diffs: DiffFeatures::between(home, away),
        }
    }

    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            // Home (6)
            self.home.efg_pct_last_5,
            self.home.tov_pct_last_5,
            self.home.ft_rate_last_5,
            self.home.orb_raw_last_5,
            self.home.win_last_5,
            self.home.days_rest,
            // Away (6)
            self.away.efg_pct_last_5,
            self.away.tov_pct_last_5,
            self.away.ft_rate_last_5,
            self.away.orb_raw_last_5,
            self.away.win_last_5,
            self.away.days_rest,
            // Differences (5)
            self.diffs.diff_efg,
            self.diffs.diff_tov,
            self.diffs.diff_orb,
            self.diffs.diff_win,
            self.diffs.diff_rest,
        ]
    }
}

/// A game on the day's scoreboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub game_id: String,
    pub game_date: NaiveDate,
    pub home_team_id: i64,
    pub visitor_team_id: i64,
}
