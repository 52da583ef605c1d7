//! Feed abstractions for schedules, results and market lines.
//!
//! Defines the ScheduleFeed and MarketLineFeed traits that the backtest
//! runner reads through. Upstream fetchers live outside this crate; the
//! runner only depends on these contracts and wraps every call in a timeout.

use crate::models::{Game, MarketLine, Sport};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

pub mod memory;

pub use memory::{MemoryLineFeed, MemoryScheduleFeed};

/// Source of games and final scores
#[async_trait]
pub trait ScheduleFeed: Send + Sync {
    /// Games that went final at or after `since` (all of them when None)
    async fn completed_games(&self, sport: Sport, since: Option<DateTime<Utc>>) -> Result<Vec<Game>>;

    /// Games not yet played
    async fn scheduled_games(&self, sport: Sport) -> Result<Vec<Game>>;

    /// Feed name for logging and debugging
    fn feed_name(&self) -> &str;
}

/// Source of captured market lines
#[async_trait]
pub trait MarketLineFeed: Send + Sync {
    /// The line to grade a game against, if one was captured
    async fn line_for(&self, sport: Sport, game_id: &str) -> Result<Option<MarketLine>>;

    /// Feed name for logging and debugging
    fn feed_name(&self) -> &str;
}

/// Await a feed call with a deadline. A timeout becomes an ordinary error so
/// callers handle it like any other feed failure.
pub async fn with_timeout<T, F>(limit: Duration, what: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("{} timed out after {:?}", what, limit)),
    }
}
