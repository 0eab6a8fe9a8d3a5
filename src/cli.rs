use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::domain::{NineCatStats, PlayerStats};
use crate::services::{CacheStatus, FetchOrchestrator};

/// Days covered by `remaining` when no end date is given, today included
const DEFAULT_REMAINING_DAYS: i64 = 7;

#[derive(Parser)]
#[command(name = "front-office")]
#[command(version)]
#[command(about = "NBA rolling 9-cat stats and remaining-schedule lookups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory (default.toml, <FRONT_OFFICE_ENV>.toml)
    #[arg(short, long, global = true, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Rolling-window 9-cat stats for one or more players
    Stats {
        /// Full player names, e.g. "Jalen Brunson"
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Unplayed games per team in a date range
    Remaining {
        /// Team codes, e.g. LAL BOS
        #[arg(required = true)]
        teams: Vec<String>,
        /// First day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD), defaults to six days after start
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Force a game-log refresh
    Refresh {
        /// Refresh the schedule instead
        #[arg(long)]
        schedule: bool,
    },
    /// Show cache location, sizes and freshness
    Status,
}

#[derive(Debug, Serialize, Tabled)]
pub struct WindowRow {
    pub window: String,
    pub pts: String,
    pub reb: String,
    pub ast: String,
    pub stl: String,
    pub blk: String,
    pub tov: String,
    pub fg3m: String,
    #[tabled(rename = "fg%")]
    pub fg_pct: String,
    #[tabled(rename = "ft%")]
    pub ft_pct: String,
}

impl WindowRow {
    fn new(games: usize, s: &NineCatStats) -> Self {
        Self {
            window: format!("L{games}"),
            pts: format!("{:.1}", s.pts),
            reb: format!("{:.1}", s.reb),
            ast: format!("{:.1}", s.ast),
            stl: format!("{:.1}", s.stl),
            blk: format!("{:.1}", s.blk),
            tov: format!("{:.1}", s.tov),
            fg3m: format!("{:.1}", s.fg3m),
            fg_pct: format!("{:.3}", s.fg_pct),
            ft_pct: format!("{:.3}", s.ft_pct),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct RemainingRow {
    pub team: String,
    pub remaining: usize,
}

pub fn window_rows(stats: &PlayerStats) -> Vec<WindowRow> {
    stats.windows().map(|(n, s)| WindowRow::new(n, s)).collect()
}

/// Resolve the `remaining` date range against today
pub fn remaining_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let start = start.unwrap_or(today);
    let end = end.unwrap_or(start + Duration::days(DEFAULT_REMAINING_DAYS - 1));
    (start, end)
}

/// Execute a command against the orchestrator
pub async fn run(command: Commands, orchestrator: &FetchOrchestrator) {
    match command {
        Commands::Stats { names } => show_stats(orchestrator, &names).await,
        Commands::Remaining { teams, start, end } => {
            let (start, end) = remaining_range(start, end, orchestrator.today());
            show_remaining(orchestrator, &teams, start, end).await;
        }
        Commands::Refresh { schedule } => {
            let (what, ok) = if schedule {
                ("Schedule", orchestrator.refresh_schedule().await)
            } else {
                ("Game log", orchestrator.refresh_gamelog().await)
            };
            if ok {
                println!("{what} refreshed");
            } else {
                println!("{what} refresh failed, cached data kept");
            }
        }
        Commands::Status => print_status(&orchestrator.status().await),
    }
}

async fn show_stats(orchestrator: &FetchOrchestrator, names: &[String]) {
    for name in names {
        println!("\n=== {} ===", name);
        match orchestrator.get_player_stats(name).await {
            None => println!("No game log found"),
            Some(stats) => {
                let rows = window_rows(&stats);
                if !rows.is_empty() {
                    println!("{}", Table::new(&rows));
                }
                println!("{}", stats.summary());
            }
        }
    }
}

async fn show_remaining(
    orchestrator: &FetchOrchestrator,
    teams: &[String],
    start: NaiveDate,
    end: NaiveDate,
) {
    let counts = orchestrator.get_remaining_games_bulk(teams, start, end).await;

    let mut rows: Vec<RemainingRow> = counts
        .into_iter()
        .map(|(team, remaining)| RemainingRow { team, remaining })
        .collect();
    rows.sort_by(|a, b| a.team.cmp(&b.team));

    println!("Remaining games {} .. {}", start, end);
    if rows.is_empty() {
        println!("(no results)");
    } else {
        println!("{}", Table::new(&rows));
    }
}

fn print_status(status: &CacheStatus) {
    let stamp = |t: Option<chrono::DateTime<Utc>>| {
        t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())
    };
    let freshness = |stale: bool| if stale { "stale" } else { "fresh" };

    println!("Cache:     {}", status.path.display());
    println!(
        "Game log:  {} players, updated {} ({})",
        status.players,
        stamp(status.gamelog_updated_at),
        freshness(status.gamelog_stale)
    );
    println!(
        "Schedule:  {} teams, updated {} ({})",
        status.teams,
        stamp(status.schedule_updated_at),
        freshness(status.schedule_stale)
    );
}
