//! Pure computations over cached raw records.
//!
//! Nothing here touches the network or the disk; the orchestrator feeds
//! these functions from the cache document on every query.

pub mod nine_cat;
pub mod schedule;

pub use nine_cat::{compute_9cat, rolling_windows};
pub use schedule::ScheduleIndex;
