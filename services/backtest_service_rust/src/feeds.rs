//! File-backed feeds.
//!
//! - Games: `<feed_dir>/<sport code>_games.json`, a JSON array of `Game`
//! - Lines: `<feed_dir>/<sport code>_lines.json`, a JSON array of `MarketLine`
//!
//! Schedules are re-read on every call so an external scraper can refresh
//! them between runs. Lines are loaded once at startup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edgecast_rust_core::models::{select_grading_line, Game, MarketLine, Sport};
use edgecast_rust_core::providers::{MarketLineFeed, ScheduleFeed};
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

async fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!("{} not found; treating as empty", path.display());
        return Ok(Vec::new());
    }
    let json = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

pub struct JsonScheduleFeed {
    feed_dir: PathBuf,
}

impl JsonScheduleFeed {
    pub fn new(feed_dir: impl Into<PathBuf>) -> Self {
        Self {
            feed_dir: feed_dir.into(),
        }
    }

    async fn games(&self, sport: Sport) -> Result<Vec<Game>> {
        let path = self.feed_dir.join(format!("{}_games.json", sport.code()));
        let games: Vec<Game> = read_json_array(&path).await?;
        Ok(games.into_iter().filter(|g| g.sport == sport).collect())
    }
}

#[async_trait]
impl ScheduleFeed for JsonScheduleFeed {
    async fn completed_games(&self, sport: Sport, since: Option<DateTime<Utc>>) -> Result<Vec<Game>> {
        let games = self.games(sport).await?;
        Ok(games
            .into_iter()
            .filter(|g| g.is_final())
            .filter(|g| since.map_or(true, |s| g.scheduled_at >= s))
            .collect())
    }

    async fn scheduled_games(&self, sport: Sport) -> Result<Vec<Game>> {
        let games = self.games(sport).await?;
        Ok(games.into_iter().filter(|g| !g.is_final()).collect())
    }

    fn feed_name(&self) -> &str {
        "json_schedule"
    }
}

/// Every captured line per sport and game, loaded at startup
#[derive(Default)]
pub struct JsonLineFeed {
    lines: FxHashMap<Sport, FxHashMap<String, Vec<MarketLine>>>,
}

impl JsonLineFeed {
    pub async fn load(feed_dir: &Path, sports: &[Sport]) -> Self {
        let mut feed = Self::default();
        for &sport in sports {
            let path = feed_dir.join(format!("{}_lines.json", sport.code()));
            match read_json_array::<MarketLine>(&path).await {
                Ok(lines) => {
                    info!("Loaded {} {} lines from {}", lines.len(), sport, path.display());
                    let by_game = feed.lines.entry(sport).or_default();
                    for line in lines {
                        by_game.entry(line.game_id.clone()).or_default().push(line);
                    }
                }
                Err(e) => warn!("No {} lines: {:#}", sport, e),
            }
        }
        feed
    }

    /// The grading line for every game with at least one capture, sorted by game id
    pub fn grading_lines(&self, sport: Sport) -> Vec<MarketLine> {
        let mut lines: Vec<MarketLine> = self
            .lines
            .get(&sport)
            .map(|by_game| {
                by_game
                    .values()
                    .filter_map(|captured| select_grading_line(captured).cloned())
                    .collect()
            })
            .unwrap_or_default();
        lines.sort_by(|a, b| a.game_id.cmp(&b.game_id));
        lines
    }
}

#[async_trait]
impl MarketLineFeed for JsonLineFeed {
    async fn line_for(&self, sport: Sport, game_id: &str) -> Result<Option<MarketLine>> {
        Ok(self
            .lines
            .get(&sport)
            .and_then(|by_game| by_game.get(game_id))
            .and_then(|captured| select_grading_line(captured))
            .cloned())
    }

    fn feed_name(&self) -> &str {
        "json_lines"
    }
}
