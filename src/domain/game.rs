use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One player's box-score line for one game.
///
/// Counts are unsigned so the non-negativity invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub player_name: String,
    pub game_date: NaiveDate,
    pub pts: u32,
    pub reb: u32,
    pub ast: u32,
    pub stl: u32,
    pub blk: u32,
    pub tov: u32,
    pub fg3m: u32,
    pub fga: u32,
    pub fgm: u32,
    pub fta: u32,
    pub ftm: u32,
}

impl GameRecord {
    /// Blank line for `player_name` on `game_date`, handy for tests and fixtures
    pub fn empty(player_name: impl Into<String>, game_date: NaiveDate) -> Self {
        Self {
            player_name: player_name.into(),
            game_date,
            pts: 0,
            reb: 0,
            ast: 0,
            stl: 0,
            blk: 0,
            tov: 0,
            fg3m: 0,
            fga: 0,
            fgm: 0,
            fta: 0,
            ftm: 0,
        }
    }
}
