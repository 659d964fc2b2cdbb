//! Matchup assembler: pairs the home and away rows of each game into one
//! training example.

use crate::models::{DiffFeatures, GameTeamRecord, TrainingExample};
use std::collections::HashMap;
use tracing::debug;

/// Join home and away rows on `game_id`. Games missing a side, or whose home
/// row has no result, produce nothing. A game yields at most one example: when
/// a side appears more than once, its last row is used.
pub fn assemble_matchups(records: &[GameTeamRecord]) -> Vec<TrainingExample> {
    let mut home_by_game: HashMap<&str, &GameTeamRecord> = HashMap::new();
    let mut away_by_game: HashMap<&str, &GameTeamRecord> = HashMap::new();
    let mut repeated = 0usize;
    for record in records {
        let side = if record.is_home {
            &mut home_by_game
        } else {
            &mut away_by_game
        };
        if side.insert(record.game_id.as_str(), record).is_some() {
            repeated += 1;
        }
    }

    let mut unmatched = 0usize;
    let mut examples: Vec<TrainingExample> = home_by_game
        .values()
        .filter_map(|home| {
            let Some(away) = away_by_game.get(home.game_id.as_str()) else {
                unmatched += 1;
                return None;
            };
            let home_team_won = home.won?;

            let home_form = home.rolling();
            let away_form = away.rolling();
            Some(TrainingExample {
                game_id: home.game_id.clone(),
                game_date: home.game_date,
                home_team_id: home.team_id,
                away_team_id: away.team_id,
                home: home_form,
                away: away_form,
                diffs: DiffFeatures::between(&home_form, &away_form),
                home_team_won,
            })
        })
        .collect();

    examples.sort_by(|a, b| (a.game_date, &a.game_id).cmp(&(b.game_date, &b.game_id)));

    if unmatched > 0 {
        debug!(unmatched, "Home rows without an away counterpart");
    }
    if repeated > 0 {
        debug!(repeated, "Repeated home or away rows for the same game");
    }
    examples
}
