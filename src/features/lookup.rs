//! Inference-time lookup of each team's latest form before a target date.

use crate::error::{Error, Result};
use crate::models::{FeatureVector, GameTeamRecord, RollingFeatures};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// One side's form as of the target date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamForm {
    pub team_id: i64,
    pub last_game_date: NaiveDate,
    /// Rest relative to the target date, not the stored row's own rest
    pub days_rest: i64,
    pub features: RollingFeatures,
}

impl TeamForm {
    pub fn is_back_to_back(&self) -> bool {
        self.days_rest <= 1
    }
}

/// Inputs for a single prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupFeatures {
    pub target_date: NaiveDate,
    pub home: TeamForm,
    pub away: TeamForm,
    pub vector: FeatureVector,
}

/// Per-team index over the feature table, ordered by date
pub struct TeamHistory<'a> {
    by_team: HashMap<i64, Vec<&'a GameTeamRecord>>,
    max_rest_days: i64,
}

impl<'a> TeamHistory<'a> {
    pub fn new(table: &'a [GameTeamRecord], max_rest_days: i64) -> Self {
        let mut by_team: HashMap<i64, Vec<&'a GameTeamRecord>> = HashMap::new();
        for record in table {
            by_team.entry(record.team_id).or_default().push(record);
        }
        for games in by_team.values_mut() {
            games.sort_by(|a, b| (a.game_date, &a.game_id).cmp(&(b.game_date, &b.game_id)));
        }
        Self {
            by_team,
            max_rest_days,
        }
    }

    /// Most recent row strictly before `date`
    pub fn latest_before(&self, team_id: i64, date: NaiveDate) -> Option<&'a GameTeamRecord> {
        let games = self.by_team.get(&team_id)?;
        let idx = games.partition_point(|g| g.game_date < date);
        idx.checked_sub(1).map(|i| games[i])
    }

    pub fn team_form(&self, team_id: i64, target_date: NaiveDate) -> Result<TeamForm> {
        let last = self
            .latest_before(team_id, target_date)
            .ok_or(Error::NoHistory {
                team_id,
                date: target_date,
            })?;

        let days_rest = (target_date - last.game_date)
            .num_days()
            .clamp(0, self.max_rest_days);

        Ok(TeamForm {
            team_id,
            last_game_date: last.game_date,
            days_rest,
            features: last.rolling().with_rest(days_rest as f64),
        })
    }

    /// Build the model input for `home` hosting `away` on `target_date`
    pub fn matchup_features(
        &self,
        home_team_id: i64,
        away_team_id: i64,
        target_date: NaiveDate,
    ) -> Result<MatchupFeatures> {
        let home = self.team_form(home_team_id, target_date)?;
        let away = self.team_form(away_team_id, target_date)?;
        let vector = FeatureVector::from_sides(&home.features, &away.features);
        Ok(MatchupFeatures {
            target_date,
            home,
            away,
            vector,
        })
    }
}

/// One-shot convenience over [`TeamHistory`]
pub fn matchup_features(
    table: &[GameTeamRecord],
    home_team_id: i64,
    away_team_id: i64,
    target_date: NaiveDate,
    max_rest_days: i64,
) -> Result<MatchupFeatures> {
    TeamHistory::new(table, max_rest_days).matchup_features(home_team_id, away_team_id, target_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(team_id: i64, day: &str, efg: f64, stored_rest: f64) -> GameTeamRecord {
        GameTeamRecord {
            game_id: format!("{}-{}", team_id, day),
            team_id,
            team_abbreviation: String::new(),
            game_date: date(day),
            is_home: true,
            won: Some(true),
            pts: None,
            fgm: None,
            fga: None,
            fg3m: None,
            ftm: None,
            fta: None,
            tov: None,
            oreb: None,
            efg_pct: None,
            tov_pct: None,
            ft_rate: None,
            orb_raw: None,
            efg_pct_last_5: efg,
            tov_pct_last_5: 0.12,
            ft_rate_last_5: 0.2,
            orb_raw_last_5: 10.0,
            win_last_5: 0.6,
            days_rest: stored_rest,
        }
    }

    fn table() -> Vec<GameTeamRecord> {
        vec![
            record(1, "2024-01-10", 0.50, 2.0),
            record(1, "2024-01-12", 0.53, 2.0),
            record(1, "2024-01-15", 0.58, 3.0),
            record(2, "2024-01-01", 0.49, 3.0),
        ]
    }

    #[test]
    fn test_uses_latest_row_strictly_before_target() {
        let rows = table();
        let history = TeamHistory::new(&rows, 7);
        let form = history.team_form(1, date("2024-01-15")).unwrap();
        assert_eq!(form.last_game_date, date("2024-01-12"));
        assert_eq!(form.features.efg_pct_last_5, 0.53);
        assert_eq!(form.days_rest, 3);
    }

    #[test]
    fn test_rest_relative_to_target_and_clipped() {
        let rows = table();
        let features = matchup_features(&rows, 1, 2, date("2024-01-16"), 7).unwrap();
        assert_eq!(features.home.days_rest, 1);
        assert!(features.home.is_back_to_back());
        assert_eq!(features.home.features.days_rest, 1.0);
        // 15 days since team 2 last played
        assert_eq!(features.away.days_rest, 7);
        assert_eq!(features.vector.diffs.diff_rest, -6.0);
        assert_eq!(features.vector.to_array()[5], 1.0);
        assert_eq!(features.vector.to_array()[11], 7.0);
    }

    #[test]
    fn test_no_history_fails() {
        let rows = table();
        let err = matchup_features(&rows, 1, 99, date("2024-02-01"), 7).unwrap_err();
        assert!(matches!(err, Error::NoHistory { team_id: 99, .. }));

        // Team 2's only row is on the target date itself
        let err = matchup_features(&rows, 2, 1, date("2024-01-01"), 7).unwrap_err();
        assert!(matches!(err, Error::NoHistory { team_id: 2, .. }));
    }
}
