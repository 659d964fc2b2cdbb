pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod predictor;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result as NbaResult};
pub use models::*;
pub use predictor::{LogisticModel, MatchupPrediction, Predictor, TrainConfig, TrainingReport};
pub use utils::*;

use anyhow::{Context, Result};
use api::{SeasonType, StatsApiClient};
use chrono::NaiveDate;
use features::{assemble_matchups, build_features, TeamHistory};
use tracing::{info, warn};
use utils::data::{
    load_bets, load_feature_table, load_game_log, save_bets, save_feature_table, save_game_log,
};

/// Raw team game log, from the cache file or the stats API
pub async fn refresh_game_log(config: &Config) -> Result<Vec<RawGameRow>> {
    let games_file = config.games_file();
    if config.use_cache && games_file.exists() {
        info!("Loading game log from cache file: {}", games_file.display());
        return load_game_log(&games_file).context("Failed to read cached game log");
    }

    let client = StatsApiClient::new(&config.api).context("Failed to build stats API client")?;
    let mut rows = client
        .fetch_game_log(SeasonType::Regular)
        .await
        .context("Failed to fetch regular season game log")?;
    let playoffs = client
        .fetch_game_log(SeasonType::Playoffs)
        .await
        .context("Failed to fetch playoff game log")?;
    rows.extend(playoffs);

    save_game_log(&rows, &games_file).context("Failed to save game log")?;
    info!("Saved {} rows to {}", rows.len(), games_file.display());
    Ok(rows)
}

/// Rebuild the feature table from the raw log and persist it
pub fn rebuild_feature_table(config: &Config, rows: &[RawGameRow]) -> Result<Vec<GameTeamRecord>> {
    let table = build_features(rows, &config.features);
    save_feature_table(&table, config.features_file()).context("Failed to save feature table")?;
    info!(
        "Feature table rebuilt: {} rows in {}",
        table.len(),
        config.features_file().display()
    );
    Ok(table)
}

pub fn load_features(config: &Config) -> Result<Vec<GameTeamRecord>> {
    let path = config.features_file();
    load_feature_table(&path)
        .with_context(|| format!("Failed to read feature table {}, run `features` first", path.display()))
}

pub fn load_model(config: &Config) -> Result<LogisticModel> {
    let path = config.model_file();
    LogisticModel::load(&path)
        .with_context(|| format!("Failed to load model {}, run `train` first", path.display()))
}

/// Assemble matchups from the feature table, fit, evaluate and save the model
pub fn train_model(config: &Config, train_config: &TrainConfig) -> Result<TrainingReport> {
    let table = load_features(config)?;
    let examples = assemble_matchups(&table);
    info!("Training on {} matchups", examples.len());

    let report =
        predictor::train_and_evaluate(&examples, train_config).context("Failed to train model")?;
    report
        .model
        .save(config.model_file())
        .context("Failed to save model")?;
    Ok(report)
}

/// Predict one matchup on `date` from the persisted table and model
pub fn predict_matchup_for(
    config: &Config,
    home_team_id: i64,
    away_team_id: i64,
    date: NaiveDate,
) -> Result<MatchupPrediction> {
    let table = load_features(config)?;
    let model = load_model(config)?;
    let features = features::matchup_features(
        &table,
        home_team_id,
        away_team_id,
        date,
        config.features.max_rest_days,
    )?;
    Ok(predictor::predict_matchup(&model, &features))
}

/// Add a prediction to the ledger unless that game is already there
pub fn record_bet(
    config: &Config,
    prediction: &MatchupPrediction,
    kind: BetKind,
    odds: Option<f64>,
) -> Result<bool> {
    let path = config.bets_file();
    let mut ledger = load_bets(&path).context("Failed to read bet history")?;
    let added = bets::record_prediction(
        &mut ledger,
        BetRecord::from_prediction(prediction, kind, odds),
    );
    if added {
        save_bets(&ledger, &path).context("Failed to save bet history")?;
    }
    Ok(added)
}

/// Predict every game on the scoreboard for `date` and log them as automatic bets.
/// Games involving a team without history are skipped.
pub async fn predict_scheduled_games(
    config: &Config,
    date: NaiveDate,
) -> Result<Vec<MatchupPrediction>> {
    let table = load_features(config)?;
    let model = load_model(config)?;
    let client = StatsApiClient::new(&config.api).context("Failed to build stats API client")?;
    let games = client
        .fetch_scoreboard(date)
        .await
        .context("Failed to fetch scoreboard")?;

    let history = TeamHistory::new(&table, config.features.max_rest_days);
    let mut predictions = Vec::new();
    for game in &games {
        match history.matchup_features(game.home_team_id, game.visitor_team_id, date) {
            Ok(features) => predictions.push(predictor::predict_matchup(&model, &features)),
            Err(e) => warn!("Skipping game {}: {}", game.game_id, e),
        }
    }

    let path = config.bets_file();
    let mut ledger = load_bets(&path).context("Failed to read bet history")?;
    let mut added = 0;
    for prediction in &predictions {
        let bet = BetRecord::from_prediction(prediction, BetKind::Auto, None);
        if bets::record_prediction(&mut ledger, bet) {
            added += 1;
        }
    }
    if added > 0 {
        save_bets(&ledger, &path).context("Failed to save bet history")?;
    }
    info!(
        "{} of {} scheduled games predicted, {} new bets logged",
        predictions.len(),
        games.len(),
        added
    );
    Ok(predictions)
}

/// Settle pending bets against the raw log
pub fn verify_bet_history(config: &Config, rows: &[RawGameRow]) -> Result<(usize, BetSummary)> {
    let path = config.bets_file();
    let mut ledger = load_bets(&path).context("Failed to read bet history")?;
    let updated = bets::verify_bets(&mut ledger, rows);
    if updated > 0 {
        save_bets(&ledger, &path).context("Failed to save bet history")?;
    }
    Ok((updated, bets::summarize(&ledger)))
}

/// Remove repeated ledger rows, keeping the most recent entry for each game
pub fn dedupe_bet_history(config: &Config) -> Result<usize> {
    let path = config.bets_file();
    let mut ledger = load_bets(&path).context("Failed to read bet history")?;
    let removed = bets::dedupe(&mut ledger);
    if removed > 0 {
        save_bets(&ledger, &path).context("Failed to save bet history")?;
    }
    Ok(removed)
}

#[derive(Debug, Clone)]
pub struct DailyReport {
    pub raw_rows: usize,
    pub feature_rows: usize,
    pub settled: usize,
    pub summary: BetSummary,
    pub predictions: Vec<MatchupPrediction>,
}

/// Refresh data, settle yesterday's bets and predict `date`'s games
pub async fn run_daily_routine(config: &Config, date: NaiveDate) -> Result<DailyReport> {
    let rows = refresh_game_log(config).await?;
    let table = rebuild_feature_table(config, &rows)?;
    let (settled, summary) = verify_bet_history(config, &rows)?;
    let predictions = predict_scheduled_games(config, date).await?;

    Ok(DailyReport {
        raw_rows: rows.len(),
        feature_rows: table.len(),
        settled,
        summary,
        predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> Config {
        Config::default().with_data_dir(dir)
    }

    /// Two teams playing each other every other day, home side alternating
    fn season(games: usize) -> Vec<RawGameRow> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rows = Vec::new();
        for g in 0..games {
            let day = (start + chrono::Duration::days(2 * g as i64))
                .format("%Y-%m-%d")
                .to_string();
            let lakers_home = g % 2 == 0;
            let lakers_win = g % 3 != 0;
            for (team_id, abbr, opp, home, win) in [
                (1610612747, "LAL", "BOS", lakers_home, lakers_win),
                (1610612738, "BOS", "LAL", !lakers_home, !lakers_win),
            ] {
                rows.push(RawGameRow {
                    game_id: format!("00223{:05}", g),
                    team_id,
                    team_abbreviation: abbr.to_string(),
                    game_date: day.clone(),
                    matchup: if home {
                        format!("{} vs. {}", abbr, opp)
                    } else {
                        format!("{} @ {}", abbr, opp)
                    },
                    wl: Some(if win { "W" } else { "L" }.to_string()),
                    pts: Some(110.0),
                    fgm: Some(40.0 + (g % 4) as f64),
                    fga: Some(88.0),
                    fg3m: Some(12.0),
                    tov: Some(13.0 + (g % 3) as f64),
                    oreb: Some(10.0),
                    ftm: Some(17.0),
                    fta: Some(22.0),
                });
            }
        }
        rows
    }

    #[test]
    fn test_pipeline_from_raw_log_to_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let rows = season(40);

        let table = rebuild_feature_table(&config, &rows).unwrap();
        // five games of history per team before the first row qualifies
        assert_eq!(table.len(), 2 * (40 - 5));

        let report = train_model(&config, &TrainConfig::default()).unwrap();
        assert!(report.test.is_some());
        assert!(config.model_file().exists());

        // last game was 2024-03-19, so rest is clipped
        let date = NaiveDate::from_ymd_opt(2024, 3, 30).unwrap();
        let prediction = predict_matchup_for(&config, 1610612747, 1610612738, date).unwrap();
        assert!(prediction.confidence >= 0.5 && prediction.confidence <= 1.0);
        assert_eq!(prediction.home_rest_days, config.features.max_rest_days);

        assert!(record_bet(&config, &prediction, BetKind::Manual, Some(1.9)).unwrap());
        assert!(!record_bet(&config, &prediction, BetKind::Manual, Some(1.9)).unwrap());
    }

    #[test]
    fn test_prediction_without_history_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        rebuild_feature_table(&config, &season(40)).unwrap();
        train_model(&config, &TrainConfig::default()).unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let err = predict_matchup_for(&config, 1610612744, 1610612738, date).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NoHistory { team_id: 1610612744, .. })
        ));
    }

    #[test]
    fn test_verify_and_dedupe_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let rows = season(2);

        // game 0 is played in LA on 2024-01-01 and the Lakers lose it
        let bet = BetRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            home: "LAL Lakers".to_string(),
            away: "BOS Celtics".to_string(),
            predicted_winner: "LAL Lakers".to_string(),
            confidence: 58.0,
            kind: BetKind::Auto,
            result: None,
            real_winner: None,
            odds: None,
        };
        save_bets(&[bet.clone(), bet], config.bets_file()).unwrap();

        assert_eq!(dedupe_bet_history(&config).unwrap(), 1);
        let (settled, summary) = verify_bet_history(&config, &rows).unwrap();
        assert_eq!(settled, 1);
        assert_eq!(summary.losses, 1);
        assert_eq!(
            load_bets(config.bets_file()).unwrap()[0].real_winner.as_deref(),
            Some("BOS Celtics")
        );
    }
}
