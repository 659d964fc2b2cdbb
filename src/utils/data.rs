use crate::error::Result;
use crate::models::{GameTeamRecord, RawGameRow};
use crate::utils::bets::BetRecord;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Save a value as pretty JSON
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), "wrote JSON");
    Ok(())
}

/// Load a value from JSON
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Rewrite a whole CSV table, header included
pub fn write_csv<T: Serialize>(rows: &[T], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "wrote CSV");
    Ok(())
}

pub fn read_csv<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Like [`read_csv`], but rows that fail to deserialize are logged and
/// skipped instead of failing the whole file
pub fn read_csv_lenient<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for row in reader.deserialize() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                debug!(path = %path.display(), "skipping malformed CSV row: {}", e);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(path = %path.display(), "Skipped {} malformed rows", skipped);
    }
    Ok(rows)
}

/// Raw game log as pulled from the stats API; malformed rows are skipped
pub fn load_game_log(path: impl AsRef<Path>) -> Result<Vec<RawGameRow>> {
    read_csv_lenient(path)
}

pub fn save_game_log(rows: &[RawGameRow], path: impl AsRef<Path>) -> Result<()> {
    write_csv(rows, path)
}

/// Feature table produced by the builder
pub fn load_feature_table(path: impl AsRef<Path>) -> Result<Vec<GameTeamRecord>> {
    read_csv(path)
}

pub fn save_feature_table(rows: &[GameTeamRecord], path: impl AsRef<Path>) -> Result<()> {
    write_csv(rows, path)
}

/// Bet ledger; a missing file is an empty ledger
pub fn load_bets(path: impl AsRef<Path>) -> Result<Vec<BetRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_csv(path)
}

pub fn save_bets(bets: &[BetRecord], path: impl AsRef<Path>) -> Result<()> {
    write_csv(bets, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::bets::{BetKind, BetOutcome};
    use chrono::NaiveDate;

    fn raw(team_id: i64, matchup: &str, wl: Option<&str>, fga: Option<f64>) -> RawGameRow {
        RawGameRow {
            game_id: "0022300061".to_string(),
            team_id,
            team_abbreviation: matchup[..3].to_string(),
            game_date: "2024-01-13".to_string(),
            matchup: matchup.to_string(),
            wl: wl.map(str::to_string),
            pts: Some(110.0),
            fgm: Some(40.0),
            fga,
            fg3m: Some(12.0),
            tov: Some(14.0),
            oreb: Some(9.0),
            ftm: Some(18.0),
            fta: Some(22.0),
        }
    }

    #[test]
    fn test_game_log_csv_keeps_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("nba_games.csv");

        let rows = vec![
            raw(1610612747, "LAL vs. UTA", Some("W"), Some(88.0)),
            raw(1610612762, "UTA @ LAL", None, None),
        ];
        save_game_log(&rows, &path).unwrap();
        let loaded = load_game_log(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].wl.as_deref(), Some("W"));
        assert_eq!(loaded[1].wl, None);
        assert_eq!(loaded[1].fga, None);
        assert_eq!(loaded[1].is_home(), Some(false));
    }

    #[test]
    fn test_game_log_reads_external_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nba_games.csv");
        fs::write(
            &path,
            "SEASON_ID,TEAM_ID,TEAM_ABBREVIATION,GAME_ID,GAME_DATE,MATCHUP,WL,PTS,FGM,FGA,FG3M,FTM,FTA,OREB,TOV\n\
             22023,1610612747,LAL,0022300061,2024-01-13,LAL vs. UTA,W,132,50,92,14,18,24,10,13\n\
             22023,1610612762,UTA,0022300061,2024-01-13,UTA @ LAL,,125,46,n/a,12,21,26,12,15\n",
        )
        .unwrap();

        let rows = load_game_log(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fga, Some(92.0));
        assert_eq!(rows[1].wl, None);
        assert_eq!(rows[1].fga, None);
    }

    #[test]
    fn test_game_log_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nba_games.csv");
        fs::write(
            &path,
            "TEAM_ID,TEAM_ABBREVIATION,GAME_ID,GAME_DATE,MATCHUP,WL,FGA\n\
             1610612747,LAL,0022300061,2024-01-13,LAL vs. UTA,W,92\n\
             not-an-id,UTA,0022300061,2024-01-13,UTA @ LAL,L,95\n\
             1610612738,BOS,0022300062,2024-01-13,BOS vs. MIA,W,88\n",
        )
        .unwrap();

        let rows = load_game_log(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team_id, 1610612747);
        assert_eq!(rows[1].team_id, 1610612738);
    }

    #[test]
    fn test_missing_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let bets = load_bets(dir.path().join("bets_history.csv")).unwrap();
        assert!(bets.is_empty());
    }

    #[test]
    fn test_ledger_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bets_history.csv");
        let bets = vec![BetRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            home: "LAL Lakers".to_string(),
            away: "BOS Celtics".to_string(),
            predicted_winner: "LAL Lakers".to_string(),
            confidence: 61.3,
            kind: BetKind::Auto,
            result: None,
            real_winner: None,
            odds: Some(1.85),
        }];
        save_bets(&bets, &path).unwrap();

        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("Date,Home,Away,Predicted_Winner,Confidence,Type,Result"));

        let mut loaded = load_bets(&path).unwrap();
        assert_eq!(loaded, bets);

        loaded[0].result = Some(BetOutcome::Won);
        save_bets(&loaded, &path).unwrap();
        assert_eq!(load_bets(&path).unwrap()[0].result, Some(BetOutcome::Won));
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        save_json(&vec![1.5, 2.0], &path).unwrap();
        let loaded: Vec<f64> = load_json(&path).unwrap();
        assert_eq!(loaded, vec![1.5, 2.0]);
    }
}
