//! On-disk cache store and staleness policy.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::document::CacheDocument;
use crate::error::Result;

/// When each partition needs a refresh.
///
/// The game log is invalidated at fixed wall-clock boundaries in a reference
/// time zone (and at every date rollover); the schedule uses a plain TTL.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    boundaries: Vec<NaiveTime>,
    zone: Tz,
    schedule_ttl: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default();
        Self {
            boundaries: vec![at(1), at(15)],
            zone: chrono_tz::America::Los_Angeles,
            schedule_ttl: Duration::hours(24),
        }
    }
}

impl RefreshPolicy {
    pub fn new(boundaries: Vec<NaiveTime>, zone: Tz, schedule_ttl: Duration) -> Self {
        Self {
            boundaries,
            zone,
            schedule_ttl,
        }
    }

    pub fn boundaries(&self) -> &[NaiveTime] {
        &self.boundaries
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn schedule_ttl(&self) -> Duration {
        self.schedule_ttl
    }

    /// Calendar date of `now` in the reference zone
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.zone).date_naive()
    }

    /// Stale when never written, written on an earlier date, or a boundary
    /// falls in `(updated_at, now]`.
    ///
    /// A boundary in a DST fold uses its first occurrence; one in a
    /// spring-forward gap moves an hour later.
    pub fn gamelog_stale(&self, updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(updated_at) = updated_at else {
            return true;
        };

        let today = self.today(now);
        if self.today(updated_at) < today {
            return true;
        }

        self.boundaries.iter().any(|&time| {
            let local = today.and_time(time);
            let resolved = self
                .zone
                .from_local_datetime(&local)
                .earliest()
                .or_else(|| {
                    self.zone
                        .from_local_datetime(&(local + Duration::hours(1)))
                        .earliest()
                });
            match resolved {
                Some(boundary) => {
                    let boundary = boundary.with_timezone(&Utc);
                    updated_at < boundary && boundary <= now
                }
                None => false,
            }
        })
    }

    pub fn schedule_stale(&self, updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match updated_at {
            None => true,
            Some(updated_at) => now - updated_at >= self.schedule_ttl,
        }
    }
}

/// JSON file holding the cache document.
///
/// Loads and saves never fail the caller: problems are logged and the
/// in-memory document stays authoritative. Within one process, file access
/// is serialized.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    policy: RefreshPolicy,
    io_lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>, policy: RefreshPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Read the document, falling back to an empty one
    pub async fn load(&self) -> CacheDocument {
        let _guard = self.io_lock.lock().await;

        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache file at {}, starting fresh", self.path.display());
                return CacheDocument::default();
            }
            Err(e) => {
                warn!(
                    "Failed to read cache {}: {}. Starting fresh.",
                    self.path.display(),
                    e
                );
                return CacheDocument::default();
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    "Cache {} is not valid JSON: {}. Starting fresh.",
                    self.path.display(),
                    e
                );
                return CacheDocument::default();
            }
        };

        let doc = CacheDocument::from_value(value);
        debug!(
            "Loaded cache: {} players, {} teams",
            doc.league_gamelog.player_count(),
            doc.schedule.teams.team_count()
        );
        doc
    }

    /// Persist the document. Returns whether the write landed.
    pub async fn save(&self, doc: &CacheDocument) -> bool {
        let _guard = self.io_lock.lock().await;

        match self.write_atomic(doc).await {
            Ok(()) => {
                info!("Saved cache to {}", self.path.display());
                true
            }
            Err(e) => {
                warn!("Failed to save cache {}: {}", self.path.display(), e);
                false
            }
        }
    }

    async fn write_atomic(&self, doc: &CacheDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let body = serde_json::to_string_pretty(doc)?;
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));

        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub fn is_gamelog_stale(&self, doc: &CacheDocument, now: DateTime<Utc>) -> bool {
        self.policy.gamelog_stale(doc.league_gamelog.updated_at, now)
    }

    pub fn is_schedule_stale(&self, doc: &CacheDocument, now: DateTime<Utc>) -> bool {
        self.policy.schedule_stale(doc.schedule.updated_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{GamelogPartition, SchedulePartition};
    use crate::domain::{GameRecord, GameStatus, TeamGameInfo};

    fn policy() -> RefreshPolicy {
        RefreshPolicy::default()
    }

    /// Instant at `h:m` on 2026-03-10 (+ `day` days) in the reference zone
    fn at(day: i64, h: u32, m: u32) -> DateTime<Utc> {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap() + Duration::days(day);
        policy()
            .zone()
            .from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_unset_is_stale() {
        assert!(policy().gamelog_stale(None, at(0, 12, 0)));
        assert!(policy().schedule_stale(None, at(0, 12, 0)));
    }

    #[test]
    fn test_crossing_afternoon_boundary() {
        let p = policy();
        assert!(p.gamelog_stale(Some(at(0, 14, 59)), at(0, 15, 1)));
        assert!(!p.gamelog_stale(Some(at(0, 14, 59)), at(0, 14, 59)));
    }

    #[test]
    fn test_boundary_is_inclusive_at_now() {
        let p = policy();
        assert!(p.gamelog_stale(Some(at(0, 14, 0)), at(0, 15, 0)));
        // Written exactly at the boundary: already fresh for it
        assert!(!p.gamelog_stale(Some(at(0, 15, 0)), at(0, 18, 0)));
    }

    #[test]
    fn test_day_rollover_without_boundary() {
        assert!(policy().gamelog_stale(Some(at(-1, 23, 0)), at(0, 0, 30)));
    }

    #[test]
    fn test_between_boundaries_is_fresh() {
        let p = policy();
        assert!(!p.gamelog_stale(Some(at(0, 2, 0)), at(0, 14, 0)));
        assert!(p.gamelog_stale(Some(at(0, 0, 30)), at(0, 2, 0)));
    }

    #[test]
    fn test_boundaries_use_pacific_standard_time() {
        // 22:59 UTC and 23:01 UTC straddle 15:00 PST
        let p = policy();
        let before = Utc.with_ymd_and_hms(2026, 1, 20, 22, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 20, 23, 1, 0).unwrap();
        assert!(p.gamelog_stale(Some(before), after));
        assert_eq!(p.today(after), NaiveDate::from_ymd_opt(2026, 1, 20).unwrap());
    }

    #[test]
    fn test_boundaries_follow_daylight_time() {
        // 14:30 and 15:30 PDT
        let p = policy();
        let written = Utc.with_ymd_and_hms(2026, 4, 10, 21, 30, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 22, 30, 0).unwrap();
        assert!(p.gamelog_stale(Some(written), now));

        // Date rolls over at midnight PDT (07:00 UTC)
        let after_midnight = Utc.with_ymd_and_hms(2026, 4, 11, 7, 30, 0).unwrap();
        assert_eq!(p.today(after_midnight), NaiveDate::from_ymd_opt(2026, 4, 11).unwrap());
        let before_midnight = Utc.with_ymd_and_hms(2026, 4, 11, 6, 30, 0).unwrap();
        assert_eq!(p.today(before_midnight), NaiveDate::from_ymd_opt(2026, 4, 10).unwrap());
    }

    #[test]
    fn test_boundary_inside_spring_forward_gap() {
        // 02:30 does not exist on 2026-03-08 in Los Angeles
        let gap = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let p = RefreshPolicy::new(vec![gap], chrono_tz::America::Los_Angeles, Duration::hours(24));
        let written = Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap(); // 01:00 PST
        let now = Utc.with_ymd_and_hms(2026, 3, 8, 11, 0, 0).unwrap(); // 04:00 PDT
        assert!(p.gamelog_stale(Some(written), now));

        // Moved to 03:30 PDT, so 03:00 PDT has not reached it yet
        let before = Utc.with_ymd_and_hms(2026, 3, 8, 10, 0, 0).unwrap();
        assert!(!p.gamelog_stale(Some(written), before));
    }

    #[test]
    fn test_schedule_ttl() {
        let p = policy();
        let written = at(0, 9, 0);
        assert!(!p.schedule_stale(Some(written), written + Duration::hours(23)));
        assert!(p.schedule_stale(Some(written), written + Duration::hours(24)));
        // No boundary semantics for the schedule
        assert!(!p.schedule_stale(Some(at(0, 14, 0)), at(0, 16, 0)));
    }

    fn sample_doc() -> CacheDocument {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let mut record = GameRecord::empty("Jalen Brunson", date);
        record.pts = 31;
        record.fga = 22;
        record.fgm = 12;

        CacheDocument {
            league_gamelog: GamelogPartition::from_records(vec![record], at(0, 9, 0)),
            schedule: SchedulePartition::from_games(
                &[TeamGameInfo {
                    date,
                    status: GameStatus::Final,
                    home: "NYK".to_string(),
                    away: "BOS".to_string(),
                }],
                at(0, 9, 0),
            ),
        }
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested/cache.json"), policy());

        let doc = sample_doc();
        assert!(store.save(&doc).await);
        assert_eq!(store.load().await, doc);

        // No temp file left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("absent.json"), policy());
        assert_eq!(store.load().await, CacheDocument::default());
    }

    #[tokio::test]
    async fn test_garbage_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = CacheStore::new(&path, policy());
        assert_eq!(store.load().await, CacheDocument::default());
    }

    #[tokio::test]
    async fn test_save_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // Parent "directory" is a regular file
        let store = CacheStore::new(blocker.join("cache.json"), policy());
        assert!(!store.save(&sample_doc()).await);
    }
}
