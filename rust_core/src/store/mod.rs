//! Persisted per-sport state.
//!
//! Each sport lives in one document that is read whole at the start of a run
//! and replaced whole at the end. There are no partial-field writes.

use crate::backtest::{BacktestResult, BacktestSummary};
use crate::models::{Sport, Team};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryDocumentStore;

/// Whole-document snapshot of one sport's ratings and backtest history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportDocument {
    pub sport: Sport,
    pub model_version: String,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub processed_game_ids: Vec<String>,
    #[serde(default)]
    pub backtest_results: Vec<BacktestResult>,
    #[serde(default)]
    pub backtest_summary: BacktestSummary,
    /// Latest scheduled time among processed games
    #[serde(default)]
    pub watermark: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SportDocument {
    pub fn new(sport: Sport, model_version: &str, min_edge: f64) -> Self {
        Self {
            sport,
            model_version: model_version.to_string(),
            teams: Vec::new(),
            processed_game_ids: Vec::new(),
            backtest_results: Vec::new(),
            backtest_summary: BacktestSummary::new(min_edge),
            watermark: None,
            updated_at: Utc::now(),
        }
    }
}

/// Read/replace persistence for sport documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The stored document, or None if the sport has never been persisted
    async fn load(&self, sport: Sport) -> Result<Option<SportDocument>>;

    /// Atomically replace the stored document
    async fn replace(&self, sport: Sport, document: &SportDocument) -> Result<()>;

    /// Store name for logging and debugging
    fn store_name(&self) -> &str;
}
