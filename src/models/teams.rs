//! Static directory of NBA franchises, keyed by their stats API id.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NbaTeam {
    pub id: i64,
    pub abbreviation: &'static str,
    pub city: &'static str,
    pub nickname: &'static str,
}

impl NbaTeam {
    /// "LAL Lakers", the label used in the bet ledger
    pub fn label(&self) -> String {
        format!("{} {}", self.abbreviation, self.nickname)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.city, self.nickname)
    }
}

const fn team(
    id: i64,
    abbreviation: &'static str,
    city: &'static str,
    nickname: &'static str,
) -> NbaTeam {
    NbaTeam {
        id,
        abbreviation,
        city,
        nickname,
    }
}

pub const NBA_TEAMS: [NbaTeam; 30] = [
    team(1610612737, "ATL", "Atlanta", "Hawks"),
    team(1610612738, "BOS", "Boston", "Celtics"),
    team(1610612739, "CLE", "Cleveland", "Cavaliers"),
    team(1610612740, "NOP", "New Orleans", "Pelicans"),
    team(1610612741, "CHI", "Chicago", "Bulls"),
    team(1610612742, "DAL", "Dallas", "Mavericks"),
    team(1610612743, "DEN", "Denver", "Nuggets"),
    team(1610612744, "GSW", "Golden State", "Warriors"),
    team(1610612745, "HOU", "Houston", "Rockets"),
    team(1610612746, "LAC", "Los Angeles", "Clippers"),
    team(1610612747, "LAL", "Los Angeles", "Lakers"),
    team(1610612748, "MIA", "Miami", "Heat"),
    team(1610612749, "MIL", "Milwaukee", "Bucks"),
    team(1610612750, "MIN", "Minnesota", "Timberwolves"),
    team(1610612751, "BKN", "Brooklyn", "Nets"),
    team(1610612752, "NYK", "New York", "Knicks"),
    team(1610612753, "ORL", "Orlando", "Magic"),
    team(1610612754, "IND", "Indiana", "Pacers"),
    team(1610612755, "PHI", "Philadelphia", "76ers"),
    team(1610612756, "PHX", "Phoenix", "Suns"),
    team(1610612757, "POR", "Portland", "Trail Blazers"),
    team(1610612758, "SAC", "Sacramento", "Kings"),
    team(1610612759, "SAS", "San Antonio", "Spurs"),
    team(1610612760, "OKC", "Oklahoma City", "Thunder"),
    team(1610612761, "TOR", "Toronto", "Raptors"),
    team(1610612762, "UTA", "Utah", "Jazz"),
    team(1610612763, "MEM", "Memphis", "Grizzlies"),
    team(1610612764, "WAS", "Washington", "Wizards"),
    team(1610612765, "DET", "Detroit", "Pistons"),
    team(1610612766, "CHA", "Charlotte", "Hornets"),
];

pub fn find_by_id(id: i64) -> Option<&'static NbaTeam> {
    NBA_TEAMS.iter().find(|t| t.id == id)
}

pub fn find_by_abbreviation(abbreviation: &str) -> Option<&'static NbaTeam> {
    let wanted = abbreviation.trim();
    NBA_TEAMS
        .iter()
        .find(|t| t.abbreviation.eq_ignore_ascii_case(wanted))
}

/// Resolve either a numeric id ("1610612747") or an abbreviation ("lal")
pub fn resolve(id_or_abbreviation: &str) -> Option<&'static NbaTeam> {
    match id_or_abbreviation.trim().parse::<i64>() {
        Ok(id) => find_by_id(id),
        Err(_) => find_by_abbreviation(id_or_abbreviation),
    }
}

/// Display label for an id, falling back to the bare number for unknown ids
pub fn label_for(id: i64) -> String {
    find_by_id(id)
        .map(NbaTeam::label)
        .unwrap_or_else(|| id.to_string())
}
