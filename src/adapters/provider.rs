use async_trait::async_trait;

use crate::domain::{GameRecord, TeamGameInfo};
use crate::error::Result;

/// Upstream source of league-wide game logs and the season schedule.
///
/// Implementations perform exactly one upstream request per call; rate
/// limiting and retries belong to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Every player box-score line of the current season
    async fn fetch_league_gamelog(&self) -> Result<Vec<GameRecord>>;

    /// Every game of the current season, flat
    async fn fetch_schedule(&self) -> Result<Vec<TeamGameInfo>>;
}
