pub mod bets;
pub mod data;
pub mod ev_calculator;

pub use bets::{BetKind, BetOutcome, BetRecord, BetSummary, Verdict};
pub use ev_calculator::{assess_odds, BetQuality, OddsAssessment};
