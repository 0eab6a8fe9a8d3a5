use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Game state as published by the league schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Scheduled,
    Live,
    Final,
}

impl GameStatus {
    /// Map the schedule feed's numeric code (1 = scheduled, 2 = live, 3 = final)
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Scheduled),
            2 => Some(Self::Live),
            3 => Some(Self::Final),
            _ => None,
        }
    }

    /// Whether the game still counts toward a team's remaining games
    pub fn is_unplayed(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Live)
    }
}

/// One scheduled game between two teams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamGameInfo {
    pub date: NaiveDate,
    pub status: GameStatus,
    /// Home team code (e.g. "LAL")
    pub home: String,
    /// Away team code
    pub away: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GameStatus::from_code(1), Some(GameStatus::Scheduled));
        assert_eq!(GameStatus::from_code(2), Some(GameStatus::Live));
        assert_eq!(GameStatus::from_code(3), Some(GameStatus::Final));
        assert_eq!(GameStatus::from_code(0), None);
        assert!(!GameStatus::Final.is_unplayed());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&GameStatus::Live).unwrap();
        assert_eq!(json, "\"live\"");
    }
}
