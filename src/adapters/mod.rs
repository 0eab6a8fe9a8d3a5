pub mod nba_stats;
pub mod provider;
pub mod rate_limit;

pub use nba_stats::NbaStatsClient;
pub use provider::StatsProvider;
pub use rate_limit::RateLimiter;

#[cfg(test)]
pub use provider::MockStatsProvider;
