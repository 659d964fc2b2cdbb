//! Win-probability models consuming the matchup feature vector.

pub mod logistic;

pub use logistic::{LogisticModel, ModelMetadata};

use crate::error::{Error, Result};
use crate::features::MatchupFeatures;
use crate::models::{teams, FeatureVector, TrainingExample};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Anything that turns a matchup feature vector into a home win probability
pub trait Predictor {
    fn predict_home_win_prob(&self, features: &FeatureVector) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2: f64,
    /// Share of the most recent examples held out for evaluation
    pub test_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 1000,
            l2: 1e-3,
            test_fraction: 0.2,
        }
    }
}

/// Classification quality on a set of examples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub n: usize,
    pub accuracy: f64,
    pub log_loss: f64,
    pub brier: f64,
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} | accuracy {:.2}% | log loss {:.4} | brier {:.4}",
            self.n,
            self.accuracy * 100.0,
            self.log_loss,
            self.brier
        )
    }
}

pub fn evaluate<P: Predictor + ?Sized>(predictor: &P, examples: &[TrainingExample]) -> Evaluation {
    if examples.is_empty() {
        return Evaluation {
            n: 0,
            accuracy: 0.0,
            log_loss: 0.0,
            brier: 0.0,
        };
    }

    let mut correct = 0usize;
    let mut log_loss = 0.0;
    let mut brier = 0.0;
    for example in examples {
        let p = predictor.predict_home_win_prob(&example.feature_vector());
        let y = example.label();
        if (p > 0.5) == example.home_team_won {
            correct += 1;
        }
        let clipped = p.clamp(1e-15, 1.0 - 1e-15);
        log_loss -= y * clipped.ln() + (1.0 - y) * (1.0 - clipped).ln();
        brier += (p - y).powi(2);
    }

    let n = examples.len() as f64;
    Evaluation {
        n: examples.len(),
        accuracy: correct as f64 / n,
        log_loss: log_loss / n,
        brier: brier / n,
    }
}

/// Split chronologically: the newest `test_fraction` of games form the test set
pub fn chronological_split(
    examples: &[TrainingExample],
    test_fraction: f64,
) -> (Vec<TrainingExample>, Vec<TrainingExample>) {
    let mut sorted = examples.to_vec();
    sorted.sort_by(|a, b| (a.game_date, &a.game_id).cmp(&(b.game_date, &b.game_id)));
    let test_len = ((sorted.len() as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
    let test = sorted.split_off(sorted.len() - test_len.min(sorted.len()));
    (sorted, test)
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model: LogisticModel,
    pub train: Evaluation,
    pub test: Option<Evaluation>,
}

/// Fit on the older games and score the held-out newer ones
pub fn train_and_evaluate(
    examples: &[TrainingExample],
    config: &TrainConfig,
) -> Result<TrainingReport> {
    let (train, test) = chronological_split(examples, config.test_fraction);
    if train.is_empty() {
        return Err(Error::Training(
            "no examples left for training after the split".into(),
        ));
    }

    let mut model = LogisticModel::fit(&train, config)?;
    let train_eval = evaluate(&model, &train);
    let test_eval = (!test.is_empty()).then(|| evaluate(&model, &test));
    model.metadata.test_accuracy = test_eval.map(|e| e.accuracy);

    info!(train = %train_eval, "Training evaluation");
    if let Some(test_eval) = &test_eval {
        info!(test = %test_eval, "Held-out evaluation");
    }

    Ok(TrainingReport {
        model,
        train: train_eval,
        test: test_eval,
    })
}

/// Predicted outcome of one matchup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupPrediction {
    pub date: NaiveDate,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_win_prob: f64,
    pub winner_team_id: i64,
    /// Probability of the predicted winner, in [0.5, 1]
    pub confidence: f64,
    pub home_rest_days: i64,
    pub away_rest_days: i64,
    pub home_back_to_back: bool,
    pub away_back_to_back: bool,
}

impl MatchupPrediction {
    pub fn home_label(&self) -> String {
        teams::label_for(self.home_team_id)
    }

    pub fn away_label(&self) -> String {
        teams::label_for(self.away_team_id)
    }

    pub fn winner_label(&self) -> String {
        teams::label_for(self.winner_team_id)
    }

    /// Format the prediction as a readable line
    pub fn format(&self) -> String {
        let mut line = format!(
            "{} (home) vs {} (away) | Winner: {} ({:.1}%) | Rest: {}d / {}d",
            self.home_label(),
            self.away_label(),
            self.winner_label(),
            self.confidence * 100.0,
            self.home_rest_days,
            self.away_rest_days
        );
        if self.home_back_to_back {
            line.push_str(&format!(" | FATIGUE: {} on a back-to-back", self.home_label()));
        }
        if self.away_back_to_back {
            line.push_str(&format!(" | FATIGUE: {} on a back-to-back", self.away_label()));
        }
        line
    }
}

pub fn predict_matchup<P: Predictor + ?Sized>(
    predictor: &P,
    features: &MatchupFeatures,
) -> MatchupPrediction {
    let home_win_prob = predictor.predict_home_win_prob(&features.vector);
    let (winner_team_id, confidence) = if home_win_prob > 0.5 {
        (features.home.team_id, home_win_prob)
    } else {
        (features.away.team_id, 1.0 - home_win_prob)
    };

    MatchupPrediction {
        date: features.target_date,
        home_team_id: features.home.team_id,
        away_team_id: features.away.team_id,
        home_win_prob,
        winner_team_id,
        confidence,
        home_rest_days: features.home.days_rest,
        away_rest_days: features.away.days_rest,
        home_back_to_back: features.home.is_back_to_back(),
        away_back_to_back: features.away.is_back_to_back(),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{side, synthetic_examples};
    use super::*;
    use crate::features::TeamForm;

    /// Always answers the same probability
    struct Fixed(f64);

    impl Predictor for Fixed {
        fn predict_home_win_prob(&self, _features: &FeatureVector) -> f64 {
            self.0
        }
    }

    fn form(team_id: i64, days_rest: i64) -> TeamForm {
        TeamForm {
            team_id,
            last_game_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            days_rest,
            features: side(0.5).with_rest(days_rest as f64),
        }
    }

    fn features(home_rest: i64, away_rest: i64) -> MatchupFeatures {
        let home = form(1610612747, home_rest);
        let away = form(1610612738, away_rest);
        MatchupFeatures {
            target_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            vector: FeatureVector::from_sides(&home.features, &away.features),
            home,
            away,
        }
    }

    #[test]
    fn test_chronological_split_holds_out_newest() {
        let examples = synthetic_examples(50);
        let (train, test) = chronological_split(&examples, 0.2);
        assert_eq!(train.len(), 40);
        assert_eq!(test.len(), 10);
        let newest_train = train.iter().map(|e| e.game_date).max().unwrap();
        let oldest_test = test.iter().map(|e| e.game_date).min().unwrap();
        assert!(newest_train <= oldest_test);
    }

    #[test]
    fn test_evaluate_metrics() {
        let examples = synthetic_examples(12);
        let eval = evaluate(&Fixed(0.5), &examples);
        assert_eq!(eval.n, 12);
        assert!((eval.brier - 0.25).abs() < 1e-12);
        assert!((eval.log_loss - std::f64::consts::LN_2).abs() < 1e-12);
        // p = 0.5 never counts as a home pick
        let away_wins = examples.iter().filter(|e| !e.home_team_won).count();
        assert!((eval.accuracy - away_wins as f64 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_train_and_evaluate() {
        let report = train_and_evaluate(&synthetic_examples(300), &TrainConfig::default()).unwrap();
        let test = report.test.unwrap();
        assert_eq!(test.n, 60);
        assert!(test.accuracy > 0.9);
        assert_eq!(report.model.metadata.test_accuracy, Some(test.accuracy));
    }

    #[test]
    fn test_predict_matchup_picks_winner() {
        let home_pick = predict_matchup(&Fixed(0.7), &features(2, 1));
        assert_eq!(home_pick.winner_team_id, 1610612747);
        assert!((home_pick.confidence - 0.7).abs() < 1e-12);
        assert!(!home_pick.home_back_to_back);
        assert!(home_pick.away_back_to_back);

        let away_pick = predict_matchup(&Fixed(0.3), &features(3, 3));
        assert_eq!(away_pick.winner_team_id, 1610612738);
        assert!((away_pick.confidence - 0.7).abs() < 1e-12);
        assert!(away_pick.format().contains("BOS Celtics"));
    }
}
