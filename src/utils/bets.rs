//! Ledger of predictions and their settled outcomes.

use crate::models::{teams, RawGameRow};
use crate::predictor::MatchupPrediction;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetKind {
    /// Written by the daily scoreboard run
    Auto,
    /// Entered by hand from the CLI
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetOutcome {
    #[serde(alias = "GAGNE")]
    Won,
    #[serde(alias = "PERDU")]
    Lost,
}

/// One row of `bets_history.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Home")]
    pub home: String,
    #[serde(rename = "Away")]
    pub away: String,
    #[serde(rename = "Predicted_Winner")]
    pub predicted_winner: String,
    /// Percent, e.g. 61.3
    #[serde(rename = "Confidence")]
    pub confidence: f64,
    #[serde(rename = "Type")]
    pub kind: BetKind,
    #[serde(rename = "Result", default)]
    pub result: Option<BetOutcome>,
    #[serde(rename = "Real_Winner", default)]
    pub real_winner: Option<String>,
    #[serde(rename = "Odds", default)]
    pub odds: Option<f64>,
}

impl BetRecord {
    pub fn from_prediction(prediction: &MatchupPrediction, kind: BetKind, odds: Option<f64>) -> Self {
        Self {
            date: prediction.date,
            home: prediction.home_label(),
            away: prediction.away_label(),
            predicted_winner: prediction.winner_label(),
            confidence: (prediction.confidence * 1000.0).round() / 10.0,
            kind,
            result: None,
            real_winner: None,
            odds,
        }
    }

    fn key(&self) -> (NaiveDate, &str, &str) {
        (self.date, self.home.as_str(), self.away.as_str())
    }

    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}

/// Append `bet` unless the same game is already in the ledger.
/// Returns whether the row was added.
pub fn record_prediction(ledger: &mut Vec<BetRecord>, bet: BetRecord) -> bool {
    if ledger.iter().any(|existing| existing.key() == bet.key()) {
        debug!(home = %bet.home, away = %bet.away, date = %bet.date, "bet already recorded");
        return false;
    }
    ledger.push(bet);
    true
}

/// Keep only the last row per (date, home, away), preserving ledger order.
/// Returns the number of rows removed.
pub fn dedupe(ledger: &mut Vec<BetRecord>) -> usize {
    let mut last_index: HashMap<(NaiveDate, String, String), usize> = HashMap::new();
    for (i, bet) in ledger.iter().enumerate() {
        last_index.insert((bet.date, bet.home.clone(), bet.away.clone()), i);
    }

    let before = ledger.len();
    let mut i = 0;
    ledger.retain(|bet| {
        let keep = last_index.get(&(bet.date, bet.home.clone(), bet.away.clone())) == Some(&i);
        i += 1;
        keep
    });
    before - ledger.len()
}

/// Abbreviation behind a ledger team name ("LAL Lakers", "LAL" or a team id)
fn abbreviation_for(name: &str) -> Option<&'static str> {
    let first = name.split_whitespace().next()?;
    teams::resolve(first).map(|team| team.abbreviation)
}

/// The home team's home row for a game on `date`
fn find_home_row<'a>(
    rows: &'a [RawGameRow],
    home_abbreviation: &str,
    date: NaiveDate,
) -> Option<&'a RawGameRow> {
    rows.iter().find(|row| {
        row.is_home() == Some(true)
            && row.won().is_some()
            && row.team_abbreviation.eq_ignore_ascii_case(home_abbreviation)
            && row.parsed_date() == Some(date)
    })
}

/// Settle pending bets against the raw game log. Late games are sometimes
/// filed under the next calendar day, so that date is tried as well.
/// Returns the number of bets settled.
pub fn verify_bets(ledger: &mut [BetRecord], rows: &[RawGameRow]) -> usize {
    let mut updated = 0;
    for bet in ledger.iter_mut().filter(|bet| bet.is_pending()) {
        let Some(abbreviation) = abbreviation_for(&bet.home) else {
            debug!(home = %bet.home, "cannot resolve home team of bet");
            continue;
        };
        let row = find_home_row(rows, abbreviation, bet.date)
            .or_else(|| find_home_row(rows, abbreviation, bet.date + Duration::days(1)));
        let Some(home_won) = row.and_then(RawGameRow::won) else {
            continue;
        };

        let real_winner = if home_won { &bet.home } else { &bet.away };
        let outcome = if bet.predicted_winner == *real_winner {
            BetOutcome::Won
        } else {
            BetOutcome::Lost
        };
        info!(
            "Settled {} vs {} on {}: {:?}",
            bet.home, bet.away, bet.date, outcome
        );
        bet.real_winner = Some(real_winner.clone());
        bet.result = Some(outcome);
        updated += 1;
    }
    updated
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Profitable,
    BreakEven,
    Losing,
    NoData,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Verdict::Profitable => "profitable, the model beats the bookmaker margin",
            Verdict::BreakEven => "break-even zone, barely above a coin flip",
            Verdict::Losing => "losing, worse than a coin flip",
            Verdict::NoData => "no settled bets yet",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetSummary {
    pub settled: usize,
    pub pending: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percent of settled bets won
    pub accuracy: f64,
    pub verdict: Verdict,
}

pub fn summarize(ledger: &[BetRecord]) -> BetSummary {
    let wins = ledger
        .iter()
        .filter(|b| b.result == Some(BetOutcome::Won))
        .count();
    let losses = ledger
        .iter()
        .filter(|b| b.result == Some(BetOutcome::Lost))
        .count();
    let settled = wins + losses;
    let accuracy = if settled > 0 {
        wins as f64 / settled as f64 * 100.0
    } else {
        0.0
    };
    let verdict = if settled == 0 {
        Verdict::NoData
    } else if accuracy > 55.0 {
        Verdict::Profitable
    } else if accuracy > 50.0 {
        Verdict::BreakEven
    } else {
        Verdict::Losing
    };

    BetSummary {
        settled,
        pending: ledger.len() - settled,
        wins,
        losses,
        accuracy,
        verdict,
    }
}
