// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod notify;
pub mod runner;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::config::Config;
pub use crate::error::{RunError, RunState};
pub use crate::ingest::types::{FeedItem, FeedSource};
pub use crate::matcher::MatchResult;
pub use crate::notify::{Dispatcher, NotificationPayload};
pub use crate::runner::{run_once, RunPlan, RunSummary};
pub use crate::store::SeenStore;
