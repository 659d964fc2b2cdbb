//! Logistic regression over the fixed matchup feature vector.

use super::{Predictor, TrainConfig};
use crate::error::{Error, Result};
use crate::models::{FeatureVector, TrainingExample, FEATURE_COUNT, FEATURE_NAMES};
use crate::utils::data::{load_json, save_json};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Where the model came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Date range of the training rows, e.g. "2023-01-02..2024-03-01"
    pub trained_on: String,
    pub n_samples: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
    /// Held-out accuracy, if a test split was evaluated
    pub test_accuracy: Option<f64>,
}

/// Persisted model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Column names the weights were fitted against
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub metadata: ModelMetadata,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticModel {
    /// Fit by full-batch gradient descent on standardized inputs
    pub fn fit(examples: &[TrainingExample], config: &TrainConfig) -> Result<Self> {
        if examples.is_empty() {
            return Err(Error::Training("no training examples".into()));
        }
        let positives = examples.iter().filter(|e| e.home_team_won).count();
        if positives == 0 || positives == examples.len() {
            return Err(Error::Training(
                "training examples contain a single class".into(),
            ));
        }

        let rows: Vec<[f64; FEATURE_COUNT]> =
            examples.iter().map(|e| e.feature_vector().to_array()).collect();
        let labels: Vec<f64> = examples.iter().map(TrainingExample::label).collect();
        let n = rows.len() as f64;

        let mut means = vec![0.0; FEATURE_COUNT];
        for row in &rows {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        let mut scales = vec![0.0; FEATURE_COUNT];
        for row in &rows {
            for j in 0..FEATURE_COUNT {
                scales[j] += (row[j] - means[j]).powi(2) / n;
            }
        }
        for s in scales.iter_mut() {
            *s = s.sqrt();
            // constant columns contribute nothing after centering
            if *s < 1e-12 {
                *s = 1.0;
            }
        }

        let standardized: Vec<[f64; FEATURE_COUNT]> = rows
            .iter()
            .map(|row| {
                let mut z = [0.0; FEATURE_COUNT];
                for j in 0..FEATURE_COUNT {
                    z[j] = (row[j] - means[j]) / scales[j];
                }
                z
            })
            .collect();

        let mut weights = vec![0.0; FEATURE_COUNT];
        let mut intercept = 0.0;

        for epoch in 0..config.epochs {
            let mut grad_w = vec![0.0; FEATURE_COUNT];
            let mut grad_b = 0.0;
            for (z, y) in standardized.iter().zip(&labels) {
                let logit = intercept + z.iter().zip(&weights).map(|(x, w)| x * w).sum::<f64>();
                let err = sigmoid(logit) - y;
                for j in 0..FEATURE_COUNT {
                    grad_w[j] += err * z[j] / n;
                }
                grad_b += err / n;
            }
            for j in 0..FEATURE_COUNT {
                weights[j] -= config.learning_rate * (grad_w[j] + config.l2 * weights[j]);
            }
            intercept -= config.learning_rate * grad_b;

            if epoch % 100 == 0 {
                debug!(epoch, intercept, "gradient step");
            }
        }

        let first = examples.iter().map(|e| e.game_date).min();
        let last = examples.iter().map(|e| e.game_date).max();
        let trained_on = match (first, last) {
            (Some(first), Some(last)) => format!("{}..{}", first, last),
            _ => String::new(),
        };

        info!(samples = examples.len(), "Logistic model fitted");

        Ok(Self {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            means,
            scales,
            weights,
            intercept,
            metadata: ModelMetadata {
                trained_on,
                n_samples: examples.len(),
                epochs: config.epochs,
                learning_rate: config.learning_rate,
                l2: config.l2,
                test_accuracy: None,
            },
        })
    }

    /// Absolute weight per feature on the standardized scale, largest first
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let mut importances: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.weights.iter().map(|w| w.abs()))
            .collect();
        importances.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        importances
    }

    /// Reject artifacts fitted against a different column layout
    pub fn check_schema(&self) -> Result<()> {
        let expected: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        if self.feature_names != expected
            || self.weights.len() != FEATURE_COUNT
            || self.means.len() != FEATURE_COUNT
            || self.scales.len() != FEATURE_COUNT
        {
            return Err(Error::SchemaMismatch {
                expected,
                found: self.feature_names.clone(),
            });
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let model: Self = load_json(path)?;
        model.check_schema()?;
        Ok(model)
    }
}

impl Predictor for LogisticModel {
    fn predict_home_win_prob(&self, features: &FeatureVector) -> f64 {
        let x = features.to_array();
        let logit = self.intercept
            + x.iter()
                .zip(&self.means)
                .zip(&self.scales)
                .zip(&self.weights)
                .map(|(((x, m), s), w)| (x - m) / s * w)
                .sum::<f64>();
        sigmoid(logit)
    }
}
