use serde::{Deserialize, Serialize};

/// Rolling window sizes, in games
pub const ROLLING_WINDOWS: [usize; 3] = [5, 10, 15];

/// Aggregate over a window of games for the nine head-to-head categories.
///
/// Counting categories are per-game means rounded to one decimal. The two
/// percentages are makes over attempts across the whole window, rounded to
/// three decimals and kept within `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NineCatStats {
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
    pub fg3m: f64,
    pub fg_pct: f64,
    pub ft_pct: f64,
}

impl std::fmt::Display for NineCatStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1}p {:.1}r {:.1}a {:.1}s {:.1}b {:.1}to {:.1}3pm FG{:.1}% FT{:.1}%",
            self.pts,
            self.reb,
            self.ast,
            self.stl,
            self.blk,
            self.tov,
            self.fg3m,
            self.fg_pct * 100.0,
            self.ft_pct * 100.0
        )
    }
}

/// Recent form for one player, one entry per rolling window.
///
/// A window is present only when the player has at least that many games;
/// missing windows are left out of the serialized form rather than zeroed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_5: Option<NineCatStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_10: Option<NineCatStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_15: Option<NineCatStats>,
}

impl PlayerStats {
    pub fn window(&self, games: usize) -> Option<&NineCatStats> {
        match games {
            5 => self.last_5.as_ref(),
            10 => self.last_10.as_ref(),
            15 => self.last_15.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn set_window(&mut self, games: usize, stats: NineCatStats) {
        match games {
            5 => self.last_5 = Some(stats),
            10 => self.last_10 = Some(stats),
            15 => self.last_15 = Some(stats),
            _ => {}
        }
    }

    /// Populated windows, smallest first
    pub fn windows(&self) -> impl Iterator<Item = (usize, &NineCatStats)> + '_ {
        ROLLING_WINDOWS
            .iter()
            .filter_map(move |&n| self.window(n).map(|s| (n, s)))
    }

    pub fn is_empty(&self) -> bool {
        self.windows().next().is_none()
    }

    /// One-line rendering, e.g. `L5: 25.0p ... | L10: ...`
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .windows()
            .map(|(n, s)| format!("L{n}: {s}"))
            .collect();

        if parts.is_empty() {
            "No recent stats".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NineCatStats {
        NineCatStats {
            pts: 25.0,
            reb: 7.2,
            ast: 5.4,
            stl: 1.2,
            blk: 0.8,
            tov: 3.0,
            fg3m: 2.4,
            fg_pct: 0.48,
            ft_pct: 0.813,
        }
    }

    #[test]
    fn test_summary_lists_present_windows() {
        let mut stats = PlayerStats::default();
        assert_eq!(stats.summary(), "No recent stats");

        stats.set_window(5, sample());
        assert_eq!(
            stats.summary(),
            "L5: 25.0p 7.2r 5.4a 1.2s 0.8b 3.0to 2.43pm FG48.0% FT81.3%"
        );
    }

    #[test]
    fn test_missing_windows_not_serialized() {
        let mut stats = PlayerStats::default();
        stats.set_window(5, sample());

        let value = serde_json::to_value(&stats).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("last_5"));
        assert!(!obj.contains_key("last_10"));
        assert!(!obj.contains_key("last_15"));
    }

    #[test]
    fn test_unknown_window_ignored() {
        let mut stats = PlayerStats::default();
        stats.set_window(7, sample());
        assert!(stats.is_empty());
        assert!(stats.window(7).is_none());
    }
}
