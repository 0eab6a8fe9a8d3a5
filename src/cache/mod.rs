pub mod document;
pub mod store;

pub use document::{CacheDocument, GamelogPartition, SchedulePartition};
pub use store::{CacheStore, RefreshPolicy};
