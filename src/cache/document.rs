//! Persisted cache document and its two independently aged partitions.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::analytics::ScheduleIndex;
use crate::domain::{GameRecord, TeamGameInfo};

/// League-wide game log keyed by player name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamelogPartition {
    #[serde(default)]
    pub games: BTreeMap<String, Vec<GameRecord>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GamelogPartition {
    /// Group a flat league game log by player
    pub fn from_records(records: Vec<GameRecord>, updated_at: DateTime<Utc>) -> Self {
        let mut games: BTreeMap<String, Vec<GameRecord>> = BTreeMap::new();
        for record in records {
            games
                .entry(record.player_name.clone())
                .or_default()
                .push(record);
        }
        Self {
            games,
            updated_at: Some(updated_at),
        }
    }

    pub fn player(&self, name: &str) -> Option<&[GameRecord]> {
        self.games.get(name).map(Vec::as_slice)
    }

    pub fn player_count(&self) -> usize {
        self.games.len()
    }
}

/// League schedule keyed by team code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulePartition {
    #[serde(default)]
    pub teams: ScheduleIndex,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SchedulePartition {
    pub fn from_games(games: &[TeamGameInfo], updated_at: DateTime<Utc>) -> Self {
        Self {
            teams: ScheduleIndex::build(games),
            updated_at: Some(updated_at),
        }
    }
}

/// Root of the on-disk cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheDocument {
    #[serde(default)]
    pub league_gamelog: GamelogPartition,
    #[serde(default)]
    pub schedule: SchedulePartition,
}

impl CacheDocument {
    /// Decode a raw JSON value, defaulting each partition independently.
    ///
    /// A partition that is missing or does not match the schema comes back
    /// empty; the other partition is kept.
    pub fn from_value(value: serde_json::Value) -> Self {
        let serde_json::Value::Object(root) = value else {
            warn!("Cache document is not a JSON object, starting fresh");
            return Self::default();
        };

        Self {
            league_gamelog: decode_partition(&root, "league_gamelog"),
            schedule: decode_partition(&root, "schedule"),
        }
    }
}

fn decode_partition<T>(root: &serde_json::Map<String, serde_json::Value>, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match root.get(key) {
        None => {
            debug!("Cache partition {} missing, using empty", key);
            T::default()
        }
        Some(raw) => serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
            warn!("Cache partition {} is corrupt ({}), using empty", key, e);
            T::default()
        }),
    }
}
