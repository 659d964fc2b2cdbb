use serde::{Deserialize, Serialize};
use std::fmt;

/// Edge above which a bet counts as value
pub const VALUE_EDGE: f64 = 0.05;

/// Convert decimal odds (1.85, 2.40, ...) to implied probability
pub fn decimal_odds_to_probability(decimal_odds: f64) -> f64 {
    if decimal_odds <= 0.0 {
        return 0.0;
    }
    1.0 / decimal_odds
}

/// Convert American odds to implied probability
/// Positive odds (+150) mean you win $150 on a $100 bet
/// Negative odds (-150) mean you need to bet $150 to win $100
pub fn american_odds_to_probability(odds: i32) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else {
        let abs_odds = odds.abs() as f64;
        abs_odds / (abs_odds + 100.0)
    }
}

/// Convert American odds to decimal odds (+150 -> 2.50, -150 -> 1.667)
pub fn american_to_decimal(odds: i32) -> f64 {
    if odds > 0 {
        1.0 + odds as f64 / 100.0
    } else {
        1.0 + 100.0 / odds.abs() as f64
    }
}

/// Expected profit per unit staked at the given decimal odds
/// EV = (prob_win * net_win) - (prob_lose * stake)
pub fn calculate_expected_value(model_prob: f64, decimal_odds: f64) -> f64 {
    model_prob * (decimal_odds - 1.0) - (1.0 - model_prob)
}

/// How much the model beats the bookmaker's implied probability
pub fn edge(model_prob: f64, decimal_odds: f64) -> f64 {
    model_prob - decimal_odds_to_probability(decimal_odds)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetQuality {
    Value,
    Fair,
    Avoid,
}

impl BetQuality {
    pub fn from_edge(edge: f64) -> Self {
        if edge > VALUE_EDGE {
            BetQuality::Value
        } else if edge > 0.0 {
            BetQuality::Fair
        } else {
            BetQuality::Avoid
        }
    }
}

impl fmt::Display for BetQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BetQuality::Value => "VALUE BET",
            BetQuality::Fair => "fair price",
            BetQuality::Avoid => "avoid, odds too short",
        };
        f.write_str(text)
    }
}

/// Everything worth printing about a price offered on the model's pick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OddsAssessment {
    pub decimal_odds: f64,
    pub model_prob: f64,
    pub implied_prob: f64,
    pub edge: f64,
    pub expected_value: f64,
    pub quality: BetQuality,
}

pub fn assess_odds(model_prob: f64, decimal_odds: f64) -> OddsAssessment {
    let edge = edge(model_prob, decimal_odds);
    OddsAssessment {
        decimal_odds,
        model_prob,
        implied_prob: decimal_odds_to_probability(decimal_odds),
        edge,
        expected_value: calculate_expected_value(model_prob, decimal_odds),
        quality: BetQuality::from_edge(edge),
    }
}
