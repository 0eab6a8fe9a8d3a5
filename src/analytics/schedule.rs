//! Team-indexed schedule lookup and remaining-game counting.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::TeamGameInfo;

/// Games per team code. Each game is listed under both of its teams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleIndex {
    teams: BTreeMap<String, Vec<TeamGameInfo>>,
}

impl ScheduleIndex {
    /// Index a flat list of games by home and away team
    pub fn build(games: &[TeamGameInfo]) -> Self {
        let mut teams: BTreeMap<String, Vec<TeamGameInfo>> = BTreeMap::new();
        for game in games {
            teams
                .entry(game.home.to_uppercase())
                .or_default()
                .push(game.clone());
            teams
                .entry(game.away.to_uppercase())
                .or_default()
                .push(game.clone());
        }
        Self { teams }
    }

    /// Games still to be played by `team` within `[start, end]`.
    ///
    /// Dates before `today` never count, even when the feed still marks them
    /// scheduled; finished games never count.
    pub fn get_remaining(
        &self,
        team: &str,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> usize {
        self.games_for(team)
            .iter()
            .filter(|g| g.date >= start && g.date <= end)
            .filter(|g| g.date >= today)
            .filter(|g| g.status.is_unplayed())
            .count()
    }

    pub fn games_for(&self, team: &str) -> &[TeamGameInfo] {
        self.teams
            .get(&team.to_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}
