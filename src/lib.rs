pub mod adapters;
pub mod analytics;
pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod services;

pub use adapters::{NbaStatsClient, RateLimiter, StatsProvider};
pub use cache::{CacheDocument, CacheStore, RefreshPolicy};
pub use config::AppConfig;
pub use error::{FrontOfficeError, Result};
pub use services::{FetchOrchestrator, RetryPolicy};
