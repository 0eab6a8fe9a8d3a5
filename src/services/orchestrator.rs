//! Fetch orchestration
//!
//! Serves player stats and remaining-game counts from the cache document,
//! refreshing a partition from upstream first when it is stale:
//! - Game log: one league-wide request, rate limited, retried with
//!   exponential backoff, last-known-good data kept on failure
//! - Schedule: one request, no retry, previous partition kept on failure
//!
//! Concurrent callers that find the same partition stale share a single
//! upstream refresh.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::adapters::{RateLimiter, StatsProvider};
use crate::analytics::rolling_windows;
use crate::cache::{CacheDocument, CacheStore, GamelogPartition, SchedulePartition};
use crate::domain::PlayerStats;

/// Retry schedule for game-log refreshes
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (default: 2, so 3 attempts)
    pub max_retries: u32,
    /// Base delay, doubled on each retry (default: 1s)
    pub base_delay: Duration,
    /// Flat pause added before every retry (default: 2s)
    pub error_pause: Duration,
    /// Cap on the exponential part (default: 30s)
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            error_pause: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Retries without sleeping in between
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            error_pause: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before the `retry`-th retry (1-based)
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        delay + self.error_pause
    }
}

/// Source of the current instant
pub type Clock = fn() -> DateTime<Utc>;

/// Snapshot of both partitions for diagnostics
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub path: PathBuf,
    pub players: usize,
    pub teams: usize,
    pub gamelog_updated_at: Option<DateTime<Utc>>,
    pub schedule_updated_at: Option<DateTime<Utc>>,
    pub gamelog_stale: bool,
    pub schedule_stale: bool,
}

/// Single-flight guard for one partition.
///
/// `attempts` is bumped when a refresh finishes, after the document has been
/// updated. A caller that saw staleness and then finds the counter moved
/// while it waited for the lock reuses that refresh instead of issuing its
/// own.
#[derive(Debug, Default)]
struct RefreshGate {
    lock: Mutex<()>,
    attempts: AtomicU64,
}

impl RefreshGate {
    fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Coordinates upstream fetches, the cache store and query answering
pub struct FetchOrchestrator {
    provider: Arc<dyn StatsProvider>,
    store: CacheStore,
    limiter: RateLimiter,
    retry: RetryPolicy,
    document: RwLock<CacheDocument>,
    gamelog_gate: RefreshGate,
    schedule_gate: RefreshGate,
    clock: Clock,
}

impl FetchOrchestrator {
    /// Build the orchestrator and load the cache document from disk
    pub async fn new(
        provider: Arc<dyn StatsProvider>,
        store: CacheStore,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Self {
        let document = store.load().await;
        Self {
            provider,
            store,
            limiter,
            retry,
            document: RwLock::new(document),
            gamelog_gate: RefreshGate::default(),
            schedule_gate: RefreshGate::default(),
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used for staleness checks and timestamps
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Today's date in the reference zone
    pub fn today(&self) -> NaiveDate {
        self.store.policy().today((self.clock)())
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Copy of the in-memory document
    pub async fn document(&self) -> CacheDocument {
        self.document.read().await.clone()
    }

    /// Rolling-window stats for a player, keyed by exact name.
    ///
    /// `None` when the player is not in the cached game log. A known player
    /// with fewer than five games gets an empty `PlayerStats`.
    pub async fn get_player_stats(&self, name: &str) -> Option<PlayerStats> {
        self.ensure_gamelog_fresh().await;

        let doc = self.document.read().await;
        let Some(records) = doc.league_gamelog.player(name) else {
            debug!("No game log for {}", name);
            return None;
        };

        let stats = rolling_windows(records);
        debug!("Stats for {} from {} games", name, records.len());
        Some(stats)
    }

    /// Force a league-wide game-log refresh. Returns whether it succeeded;
    /// on failure the previous partition is left untouched.
    pub async fn refresh_gamelog(&self) -> bool {
        let _guard = self.gamelog_gate.lock.lock().await;
        self.refresh_gamelog_locked().await
    }

    /// Force a schedule refresh
    pub async fn refresh_schedule(&self) -> bool {
        let _guard = self.schedule_gate.lock.lock().await;
        self.refresh_schedule_locked().await
    }

    /// Unplayed games for `team` in `[start, end]`, counting from today
    pub async fn get_remaining_games(&self, team: &str, start: NaiveDate, end: NaiveDate) -> usize {
        self.ensure_schedule_fresh().await;

        let today = self.today();
        let doc = self.document.read().await;
        doc.schedule.teams.get_remaining(team, start, end, today)
    }

    /// Remaining games for several teams, keyed by upper-case team code.
    /// Duplicate codes are counted once.
    pub async fn get_remaining_games_bulk<I, S>(
        &self,
        teams: I,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HashMap<String, usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = teams
            .into_iter()
            .map(|t| t.as_ref().trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();

        if unique.is_empty() {
            return HashMap::new();
        }

        self.ensure_schedule_fresh().await;

        let today = self.today();
        let doc = self.document.read().await;
        unique
            .into_iter()
            .map(|team| {
                let count = doc.schedule.teams.get_remaining(&team, start, end, today);
                (team, count)
            })
            .collect()
    }

    pub async fn status(&self) -> CacheStatus {
        let now = (self.clock)();
        let doc = self.document.read().await;
        CacheStatus {
            path: self.store.path().to_path_buf(),
            players: doc.league_gamelog.player_count(),
            teams: doc.schedule.teams.team_count(),
            gamelog_updated_at: doc.league_gamelog.updated_at,
            schedule_updated_at: doc.schedule.updated_at,
            gamelog_stale: self.store.is_gamelog_stale(&doc, now),
            schedule_stale: self.store.is_schedule_stale(&doc, now),
        }
    }

    async fn ensure_gamelog_fresh(&self) {
        let seen = self.gamelog_gate.attempts();
        let stale = {
            let doc = self.document.read().await;
            self.store.is_gamelog_stale(&doc, (self.clock)())
        };
        if !stale {
            return;
        }

        let _guard = self.gamelog_gate.lock.lock().await;
        if self.gamelog_gate.attempts() != seen {
            debug!("Game log refreshed by a concurrent caller");
            return;
        }
        self.refresh_gamelog_locked().await;
    }

    async fn ensure_schedule_fresh(&self) {
        let seen = self.schedule_gate.attempts();
        let stale = {
            let doc = self.document.read().await;
            self.store.is_schedule_stale(&doc, (self.clock)())
        };
        if !stale {
            return;
        }

        let _guard = self.schedule_gate.lock.lock().await;
        if self.schedule_gate.attempts() != seen {
            debug!("Schedule refreshed by a concurrent caller");
            return;
        }
        self.refresh_schedule_locked().await;
    }

    /// Caller must hold the game-log gate lock
    async fn refresh_gamelog_locked(&self) -> bool {
        let refreshed = self.fetch_gamelog_with_retry().await;
        self.gamelog_gate.record_attempt();
        refreshed
    }

    async fn fetch_gamelog_with_retry(&self) -> bool {
        let attempts = self.retry.attempts();

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.retry.backoff_duration(attempt - 1);
                debug!("Backing off {:?} before game-log attempt {}", delay, attempt);
                tokio::time::sleep(delay).await;
            }

            self.limiter.wait().await;
            match self.provider.fetch_league_gamelog().await {
                Ok(records) => {
                    let partition = GamelogPartition::from_records(records, (self.clock)());
                    info!(
                        "Game log refreshed: {} players (attempt {}/{})",
                        partition.player_count(),
                        attempt,
                        attempts
                    );
                    self.document.write().await.league_gamelog = partition;
                    self.persist().await;
                    return true;
                }
                Err(e) => {
                    warn!("Game log attempt {}/{} failed: {}", attempt, attempts, e);
                }
            }
        }

        error!(
            "Game log refresh failed after {} attempts, serving cached data",
            attempts
        );
        false
    }

    /// Caller must hold the schedule gate lock
    async fn refresh_schedule_locked(&self) -> bool {
        let refreshed = self.fetch_schedule_once().await;
        self.schedule_gate.record_attempt();
        refreshed
    }

    async fn fetch_schedule_once(&self) -> bool {
        match self.provider.fetch_schedule().await {
            Ok(games) => {
                let partition = SchedulePartition::from_games(&games, (self.clock)());
                info!(
                    "Schedule refreshed: {} games across {} teams",
                    games.len(),
                    partition.teams.team_count()
                );
                self.document.write().await.schedule = partition;
                self.persist().await;
                true
            }
            Err(e) => {
                warn!("Schedule refresh failed, keeping cached schedule: {}", e);
                false
            }
        }
    }

    async fn persist(&self) {
        let doc = self.document.read().await;
        self.store.save(&doc).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockStatsProvider;
    use crate::cache::RefreshPolicy;
    use crate::domain::GameRecord;
    use crate::error::FrontOfficeError;
    use chrono::TimeZone;

    /// Noon PST, between both default boundaries
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 20, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        RefreshPolicy::default().today(fixed_now())
    }

    fn records(name: &str, games: i64) -> Vec<GameRecord> {
        let start = today();
        (0..games)
            .map(|i| {
                let mut r = GameRecord::empty(name, start - chrono::Duration::days(i));
                r.pts = 20;
                r
            })
            .collect()
    }

    async fn orchestrator(
        mock: MockStatsProvider,
        dir: &tempfile::TempDir,
        retry: RetryPolicy,
    ) -> FetchOrchestrator {
        let store = CacheStore::new(dir.path().join("cache.json"), RefreshPolicy::default());
        FetchOrchestrator::new(Arc::new(mock), store, RateLimiter::unlimited(), retry)
            .await
            .with_clock(fixed_now)
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            error_pause: Duration::from_secs(2),
            max_delay: Duration::from_secs(8),
        };

        assert_eq!(policy.attempts(), 6);
        assert_eq!(policy.backoff_duration(1), Duration::from_secs(3));
        assert_eq!(policy.backoff_duration(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_duration(3), Duration::from_secs(6));
        assert_eq!(policy.backoff_duration(4), Duration::from_secs(10));
        assert_eq!(policy.backoff_duration(5), Duration::from_secs(10)); // capped
    }

    #[tokio::test]
    async fn test_refresh_makes_three_attempts_then_gives_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockStatsProvider::new();
        mock.expect_fetch_league_gamelog()
            .times(3)
            .returning(|| Err(FrontOfficeError::Upstream("503".into())));

        let orch = orchestrator(mock, &dir, RetryPolicy::immediate(2)).await;
        assert!(!orch.refresh_gamelog().await);
        assert_eq!(orch.document().await, CacheDocument::default());
        // Nothing persisted on failure
        assert!(!dir.path().join("cache.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_back_off_between_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockStatsProvider::new();
        mock.expect_fetch_league_gamelog()
            .times(3)
            .returning(|| Err(FrontOfficeError::Upstream("503".into())));

        let orch = orchestrator(mock, &dir, RetryPolicy::default()).await;
        let start = tokio::time::Instant::now();
        assert!(!orch.refresh_gamelog().await);

        // (1s + 2s) before the first retry, (2s + 2s) before the second
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(7), "slept {elapsed:?}");
        assert!(elapsed < Duration::from_secs(8), "slept {elapsed:?}");
    }

    #[tokio::test]
    async fn test_refresh_recovers_after_transient_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockStatsProvider::new();
        let mut calls = 0;
        mock.expect_fetch_league_gamelog().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(FrontOfficeError::Upstream("timeout".into()))
            } else {
                Ok(records("Tyrese Maxey", 6))
            }
        });

        let orch = orchestrator(mock, &dir, RetryPolicy::immediate(2)).await;
        assert!(orch.refresh_gamelog().await);

        let stats = orch.get_player_stats("Tyrese Maxey").await.unwrap();
        assert_eq!(stats.last_5.unwrap().pts, 20.0);
        assert!(stats.last_10.is_none());
        assert!(dir.path().join("cache.json").exists());
    }

    #[tokio::test]
    async fn test_fresh_gamelog_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockStatsProvider::new();
        mock.expect_fetch_league_gamelog()
            .times(1)
            .returning(|| Ok(records("Jayson Tatum", 12)));

        let orch = orchestrator(mock, &dir, RetryPolicy::immediate(0)).await;
        let first = orch.get_player_stats("Jayson Tatum").await.unwrap();
        let second = orch.get_player_stats("Jayson Tatum").await.unwrap();

        assert_eq!(first, second);
        assert!(first.last_10.is_some());
        assert!(first.last_15.is_none());
        assert!(orch.get_player_stats("Nobody Atall").await.is_none());
    }

    #[tokio::test]
    async fn test_schedule_fetched_once_without_retry() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockStatsProvider::new();
        mock.expect_fetch_schedule()
            .times(1)
            .returning(|| Err(FrontOfficeError::Upstream("cdn down".into())));

        let orch = orchestrator(mock, &dir, RetryPolicy::immediate(2)).await;
        let today = today();
        assert_eq!(orch.get_remaining_games("LAL", today, today).await, 0);
    }

    #[tokio::test]
    async fn test_bulk_with_no_teams_skips_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockStatsProvider::new();

        let orch = orchestrator(mock, &dir, RetryPolicy::default()).await;
        let today = today();
        let counts = orch
            .get_remaining_games_bulk(Vec::<String>::new(), today, today)
            .await;
        assert!(counts.is_empty());
    }
}
