//! Feature builder
//!
//! Turns the flat per-team-per-game log into the rolling Four Factors table.
//! Every rolling value describes a team's form *entering* a game: the window
//! always ends at the previous game, never the current one.

use crate::config::FeatureConfig;
use crate::models::{GameTeamRecord, RawGameRow};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::ops::Range;
use tracing::{debug, info};

/// Per-game Four Factors of a single row; `None` where a denominator is zero
/// or an input count is missing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerGameMetrics {
    pub efg_pct: Option<f64>,
    pub tov_pct: Option<f64>,
    pub ft_rate: Option<f64>,
    pub orb_raw: Option<f64>,
}

/// A parsed, deduplicated row awaiting its rolling columns
#[derive(Debug, Clone, PartialEq)]
pub struct GameLine {
    pub raw: RawGameRow,
    pub game_date: NaiveDate,
    pub is_home: bool,
    pub won: Option<bool>,
    pub metrics: PerGameMetrics,
}

/// Counts of rows set aside during ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub bad_date: usize,
    pub bad_matchup: usize,
    pub before_cutoff: usize,
    pub duplicates: usize,
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 || !n.is_finite() || !d.is_finite() {
        return None;
    }
    Some(n / d)
}

/// Compute the four per-game factors from raw box-score counts
pub fn derive_metrics(row: &RawGameRow) -> PerGameMetrics {
    // eFG% = (FGM + 0.5 * FG3M) / FGA
    let efg_numerator = match (row.fgm, row.fg3m) {
        (Some(fgm), Some(fg3m)) => Some(fgm + 0.5 * fg3m),
        _ => None,
    };

    // TOV% = TOV / (FGA + 0.44 * FTA + TOV)
    let possessions = match (row.fga, row.fta, row.tov) {
        (Some(fga), Some(fta), Some(tov)) => Some(fga + 0.44 * fta + tov),
        _ => None,
    };

    PerGameMetrics {
        efg_pct: ratio(efg_numerator, row.fga),
        tov_pct: ratio(row.tov, possessions),
        ft_rate: ratio(row.ftm, row.fga),
        orb_raw: row.oreb.filter(|v| v.is_finite()),
    }
}

/// Collapse repeated pulls, parse dates and venues, apply the cutoff and
/// derive per-game metrics. The last pull of a `(game_id, team_id)` replaces
/// earlier ones before any filtering, so a malformed re-pull is discarded
/// rather than falling back to the stale row. Output is sorted by
/// `(team_id, game_date)`.
pub fn ingest(rows: &[RawGameRow], config: &FeatureConfig) -> (Vec<GameLine>, IngestReport) {
    let mut report = IngestReport::default();

    let mut latest: HashMap<(&str, i64), usize> = HashMap::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        if latest.insert((row.game_id.as_str(), row.team_id), idx).is_some() {
            report.duplicates += 1;
        }
    }

    let mut lines: Vec<GameLine> = Vec::with_capacity(latest.len());
    for (idx, row) in rows.iter().enumerate() {
        if latest.get(&(row.game_id.as_str(), row.team_id)) != Some(&idx) {
            continue;
        }
        let Some(game_date) = row.parsed_date() else {
            debug!(game_id = %row.game_id, date = %row.game_date, "unparseable game date");
            report.bad_date += 1;
            continue;
        };
        if game_date < config.cutoff {
            report.before_cutoff += 1;
            continue;
        }
        let Some(is_home) = row.is_home() else {
            debug!(game_id = %row.game_id, matchup = %row.matchup, "matchup has no venue marker");
            report.bad_matchup += 1;
            continue;
        };

        lines.push(GameLine {
            raw: row.clone(),
            game_date,
            is_home,
            won: row.won(),
            metrics: derive_metrics(row),
        });
    }

    lines.sort_by(|a, b| {
        (a.raw.team_id, a.game_date, &a.raw.game_id).cmp(&(b.raw.team_id, b.game_date, &b.raw.game_id))
    });

    (lines, report)
}

/// Contiguous index ranges sharing a team, for a slice sorted by team
fn team_ranges(lines: &[GameLine]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 1..=lines.len() {
        if i == lines.len() || lines[i].raw.team_id != lines[start].raw.team_id {
            if start < i {
                ranges.push(start..i);
            }
            start = i;
        }
    }
    ranges
}

/// Mean of the `window` values preceding each position (the current value is
/// never included). Undefined when fewer than `window` values precede it or
/// any of them is undefined.
pub fn trailing_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i < window {
                return None;
            }
            let mut sum = 0.0;
            for value in &values[i - window..i] {
                sum += (*value)?;
            }
            Some(sum / window as f64)
        })
        .collect()
}

/// Days since the previous game for each date of one team's ascending schedule
pub fn rest_days(dates: &[NaiveDate], default_rest: i64, max_rest: i64) -> Vec<i64> {
    dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let rest = if i == 0 {
                default_rest
            } else {
                (*date - dates[i - 1]).num_days()
            };
            rest.clamp(0, max_rest)
        })
        .collect()
}

/// Build the rolling feature table from a raw game log
pub fn build_features(rows: &[RawGameRow], config: &FeatureConfig) -> Vec<GameTeamRecord> {
    let (lines, report) = ingest(rows, config);
    if report != IngestReport::default() {
        info!(
            bad_date = report.bad_date,
            bad_matchup = report.bad_matchup,
            before_cutoff = report.before_cutoff,
            duplicates = report.duplicates,
            "Rows set aside during ingestion"
        );
    }

    let mut records = Vec::with_capacity(lines.len());
    let mut insufficient = 0usize;

    for range in team_ranges(&lines) {
        let team = &lines[range];

        let column = |f: fn(&GameLine) -> Option<f64>| -> Vec<Option<f64>> {
            trailing_mean(&team.iter().map(f).collect::<Vec<_>>(), config.window)
        };
        let efg = column(|l| l.metrics.efg_pct);
        let tov = column(|l| l.metrics.tov_pct);
        let ft = column(|l| l.metrics.ft_rate);
        let orb = column(|l| l.metrics.orb_raw);
        let win = column(|l| l.won.map(|w| if w { 1.0 } else { 0.0 }));

        let dates: Vec<NaiveDate> = team.iter().map(|l| l.game_date).collect();
        let rest = rest_days(&dates, config.default_rest_days, config.max_rest_days);

        for (i, line) in team.iter().enumerate() {
            let (Some(efg), Some(tov), Some(ft), Some(orb), Some(win)) =
                (efg[i], tov[i], ft[i], orb[i], win[i])
            else {
                insufficient += 1;
                continue;
            };

            records.push(GameTeamRecord {
                game_id: line.raw.game_id.clone(),
                team_id: line.raw.team_id,
                team_abbreviation: line.raw.team_abbreviation.clone(),
                game_date: line.game_date,
                is_home: line.is_home,
                won: line.won,
                pts: line.raw.pts,
                fgm: line.raw.fgm,
                fga: line.raw.fga,
                fg3m: line.raw.fg3m,
                ftm: line.raw.ftm,
                fta: line.raw.fta,
                tov: line.raw.tov,
                oreb: line.raw.oreb,
                efg_pct: line.metrics.efg_pct,
                tov_pct: line.metrics.tov_pct,
                ft_rate: line.metrics.ft_rate,
                orb_raw: line.metrics.orb_raw,
                efg_pct_last_5: efg,
                tov_pct_last_5: tov,
                ft_rate_last_5: ft,
                orb_raw_last_5: orb,
                win_last_5: win,
                days_rest: rest[i] as f64,
            });
        }
    }

    records.sort_by(|a, b| {
        (a.game_date, &a.game_id, a.team_id).cmp(&(b.game_date, &b.game_id, b.team_id))
    });

    info!(
        rows = records.len(),
        dropped_for_history = insufficient,
        "Feature table built"
    );
    records
}
