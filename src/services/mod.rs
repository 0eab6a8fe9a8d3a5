pub mod orchestrator;

pub use orchestrator::{CacheStatus, Clock, FetchOrchestrator, RetryPolicy};
