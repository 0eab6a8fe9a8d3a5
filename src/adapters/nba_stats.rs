//! NBA stats client
//!
//! Pulls the league-wide player game log from the stats API and the season
//! schedule from the league's static CDN document. No API key required, but
//! the stats host rejects requests without browser-like headers.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::provider::StatsProvider;
use crate::config::UpstreamConfig;
use crate::domain::{GameRecord, GameStatus, TeamGameInfo};
use crate::error::{FrontOfficeError, Result};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

// ── Stats API deserialization structs ───────────────────────────

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<serde_json::Value>>,
}

/// Column positions of the fields we keep, resolved from the header row
#[derive(Debug)]
struct GamelogColumns {
    player_name: usize,
    game_date: usize,
    pts: usize,
    reb: usize,
    ast: usize,
    stl: usize,
    blk: usize,
    tov: usize,
    fg3m: usize,
    fga: usize,
    fgm: usize,
    fta: usize,
    ftm: usize,
}

impl GamelogColumns {
    fn resolve(headers: &[String]) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    FrontOfficeError::InvalidData(format!("game log missing column {name}"))
                })
        };

        Ok(Self {
            player_name: find("PLAYER_NAME")?,
            game_date: find("GAME_DATE")?,
            pts: find("PTS")?,
            reb: find("REB")?,
            ast: find("AST")?,
            stl: find("STL")?,
            blk: find("BLK")?,
            tov: find("TOV")?,
            fg3m: find("FG3M")?,
            fga: find("FGA")?,
            fgm: find("FGM")?,
            fta: find("FTA")?,
            ftm: find("FTM")?,
        })
    }
}

// ── Schedule deserialization structs ────────────────────────────

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    #[serde(rename = "leagueSchedule")]
    league_schedule: LeagueSchedule,
}

#[derive(Debug, Deserialize)]
struct LeagueSchedule {
    #[serde(rename = "gameDates", default)]
    game_dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDate {
    #[serde(default)]
    games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
struct ScheduleGame {
    #[serde(rename = "gameDateEst")]
    game_date_est: String,
    #[serde(rename = "gameStatus")]
    game_status: i64,
    #[serde(rename = "homeTeam")]
    home_team: ScheduleTeam,
    #[serde(rename = "awayTeam")]
    away_team: ScheduleTeam,
}

#[derive(Debug, Deserialize)]
struct ScheduleTeam {
    #[serde(rename = "teamTricode", default)]
    team_tricode: Option<String>,
}

// ── Client ──────────────────────────────────────────────────────

/// HTTP client for the league stats and schedule endpoints
#[derive(Debug, Clone)]
pub struct NbaStatsClient {
    http: reqwest::Client,
    stats_base_url: String,
    schedule_url: String,
    season: Option<String>,
}

impl NbaStatsClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            stats_base_url: config.stats_base_url.trim_end_matches('/').to_string(),
            schedule_url: config.schedule_url.clone(),
            season: config.season.clone(),
        })
    }

    /// Season label for a date, e.g. 2026-01-15 -> "2025-26".
    /// Seasons tip off in October.
    pub fn season_label(date: NaiveDate) -> String {
        let start_year = if date.month() >= 10 {
            date.year()
        } else {
            date.year() - 1
        };
        format!("{}-{:02}", start_year, (start_year + 1).rem_euclid(100))
    }

    fn current_season(&self) -> String {
        self.season
            .clone()
            .unwrap_or_else(|| Self::season_label(Utc::now().date_naive()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FrontOfficeError::Upstream(format!(
                "{} returned {}: {}",
                what,
                status.as_u16(),
                body.chars().take(500).collect::<String>()
            )));
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FrontOfficeError::InvalidData(format!("{what} JSON parse failed: {e}")))
    }

    fn parse_gamelog(resp: StatsResponse) -> Result<Vec<GameRecord>> {
        let set = resp
            .result_sets
            .into_iter()
            .next()
            .ok_or_else(|| FrontOfficeError::InvalidData("game log has no result sets".into()))?;

        let cols = GamelogColumns::resolve(&set.headers)?;

        let total = set.row_set.len();
        let records: Vec<GameRecord> = set
            .row_set
            .iter()
            .filter_map(|row| Self::parse_row(&cols, row))
            .collect();

        if records.len() < total {
            debug!(
                "Skipped {} malformed rows in {}",
                total - records.len(),
                set.name
            );
        }
        Ok(records)
    }

    fn parse_row(cols: &GamelogColumns, row: &[serde_json::Value]) -> Option<GameRecord> {
        let count = |idx: usize| -> Option<u32> {
            let value = row.get(idx)?;
            if let Some(n) = value.as_u64() {
                return u32::try_from(n).ok();
            }
            let f = value.as_f64()?;
            (f.is_finite() && f >= 0.0).then(|| f.round() as u32)
        };

        let player_name = row.get(cols.player_name)?.as_str()?.trim().to_string();
        if player_name.is_empty() {
            return None;
        }
        let game_date = Self::parse_game_date(row.get(cols.game_date)?.as_str()?)?;

        let record = GameRecord {
            player_name,
            game_date,
            pts: count(cols.pts)?,
            reb: count(cols.reb)?,
            ast: count(cols.ast)?,
            stl: count(cols.stl)?,
            blk: count(cols.blk)?,
            tov: count(cols.tov)?,
            fg3m: count(cols.fg3m)?,
            fga: count(cols.fga)?,
            fgm: count(cols.fgm)?,
            fta: count(cols.fta)?,
            ftm: count(cols.ftm)?,
        };
        if record.fgm > record.fga || record.ftm > record.fta {
            debug!("Dropping inconsistent row for {}", record.player_name);
            return None;
        }
        Some(record)
    }

    /// Accepts "2026-01-15", "2026-01-15T00:00:00" and "JAN 15, 2026"
    fn parse_game_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        let date_part = raw.split('T').next().unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%b %d, %Y"))
            .ok()
    }

    fn parse_schedule(resp: ScheduleResponse) -> Vec<TeamGameInfo> {
        let mut games = Vec::new();
        let mut skipped = 0usize;

        for game in resp
            .league_schedule
            .game_dates
            .iter()
            .flat_map(|d| d.games.iter())
        {
            match Self::parse_schedule_game(game) {
                Some(info) => games.push(info),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!("Schedule: skipped {} games without teams or status", skipped);
        }
        games
    }

    fn parse_schedule_game(game: &ScheduleGame) -> Option<TeamGameInfo> {
        let tricode = |team: &ScheduleTeam| {
            team.team_tricode
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_uppercase)
        };

        Some(TeamGameInfo {
            date: Self::parse_game_date(&game.game_date_est)?,
            status: GameStatus::from_code(game.game_status)?,
            home: tricode(&game.home_team)?,
            away: tricode(&game.away_team)?,
        })
    }
}

#[async_trait]
impl StatsProvider for NbaStatsClient {
    async fn fetch_league_gamelog(&self) -> Result<Vec<GameRecord>> {
        let season = self.current_season();
        let url = format!("{}/leaguegamelog", self.stats_base_url);
        debug!("Fetching league game log for {}: {}", season, url);

        let req = self.http.get(&url).query(&[
            ("Counter", "0"),
            ("Direction", "DESC"),
            ("LeagueID", "00"),
            ("PlayerOrTeam", "P"),
            ("Season", season.as_str()),
            ("SeasonType", "Regular Season"),
            ("Sorter", "DATE"),
        ]);
        let resp: StatsResponse = self.get_json(req, "league game log").await?;

        let records = Self::parse_gamelog(resp)?;
        debug!("Stats: fetched {} game-log rows", records.len());
        Ok(records)
    }

    async fn fetch_schedule(&self) -> Result<Vec<TeamGameInfo>> {
        debug!("Fetching league schedule: {}", self.schedule_url);

        let req = self.http.get(&self.schedule_url);
        let resp: ScheduleResponse = self.get_json(req, "league schedule").await?;

        let games = Self::parse_schedule(resp);
        debug!("Schedule: fetched {} games", games.len());
        Ok(games)
    }
}
