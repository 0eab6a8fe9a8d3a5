//! Rolling-window 9-cat aggregation.

use crate::domain::{GameRecord, NineCatStats, PlayerStats, ROLLING_WINDOWS};

/// Aggregate a window of games into 9-cat stats.
///
/// FG% and FT% are pooled (total makes / total attempts), not the mean of
/// per-game percentages, so a 1-for-1 night does not outweigh a 0-for-9 one.
pub fn compute_9cat(records: &[GameRecord]) -> NineCatStats {
    if records.is_empty() {
        return NineCatStats::default();
    }

    let n = records.len() as f64;
    let mean = |field: fn(&GameRecord) -> u32| {
        let total: u64 = records.iter().map(|r| field(r) as u64).sum();
        round_to(total as f64 / n, 1)
    };

    let fgm: u64 = records.iter().map(|r| r.fgm as u64).sum();
    let fga: u64 = records.iter().map(|r| r.fga as u64).sum();
    let ftm: u64 = records.iter().map(|r| r.ftm as u64).sum();
    let fta: u64 = records.iter().map(|r| r.fta as u64).sum();

    NineCatStats {
        pts: mean(|r| r.pts),
        reb: mean(|r| r.reb),
        ast: mean(|r| r.ast),
        stl: mean(|r| r.stl),
        blk: mean(|r| r.blk),
        tov: mean(|r| r.tov),
        fg3m: mean(|r| r.fg3m),
        fg_pct: pooled_pct(fgm, fga),
        ft_pct: pooled_pct(ftm, fta),
    }
}

/// Build every rolling window the player has enough games for.
///
/// Records may arrive in any order; they are ranked newest first before
/// slicing. Windows without enough history are omitted.
pub fn rolling_windows(records: &[GameRecord]) -> PlayerStats {
    let mut ordered: Vec<&GameRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.game_date.cmp(&a.game_date));

    let mut stats = PlayerStats::default();
    for &window in ROLLING_WINDOWS.iter() {
        if ordered.len() < window {
            continue;
        }
        let recent: Vec<GameRecord> = ordered[..window].iter().map(|r| (*r).clone()).collect();
        stats.set_window(window, compute_9cat(&recent));
    }
    stats
}

fn pooled_pct(makes: u64, attempts: u64) -> f64 {
    if attempts == 0 {
        return 0.0;
    }
    round_to(makes as f64 / attempts as f64, 3).clamp(0.0, 1.0)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
