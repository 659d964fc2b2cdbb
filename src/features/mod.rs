pub mod builder;
pub mod lookup;
pub mod matchup;

pub use builder::build_features;
pub use lookup::{matchup_features, MatchupFeatures, TeamForm, TeamHistory};
pub use matchup::assemble_matchups;
