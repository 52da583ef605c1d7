//! In-process feeds backed by vectors, used by tests and dry runs.

use super::{MarketLineFeed, ScheduleFeed};
use crate::models::{select_grading_line, Game, MarketLine, Sport};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct MemoryScheduleFeed {
    games: RwLock<Vec<Game>>,
    failing: RwLock<bool>,
}

impl MemoryScheduleFeed {
    pub fn new(games: Vec<Game>) -> Self {
        Self {
            games: RwLock::new(games),
            failing: RwLock::new(false),
        }
    }

    pub fn push(&self, game: Game) {
        self.games.write().push(game);
    }

    /// Make every call fail, to exercise the no-data path
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }

    fn check(&self) -> Result<()> {
        if *self.failing.read() {
            Err(anyhow!("schedule feed unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ScheduleFeed for MemoryScheduleFeed {
    async fn completed_games(&self, sport: Sport, since: Option<DateTime<Utc>>) -> Result<Vec<Game>> {
        self.check()?;
        Ok(self
            .games
            .read()
            .iter()
            .filter(|g| g.sport == sport && g.is_final())
            .filter(|g| since.map_or(true, |s| g.scheduled_at >= s))
            .cloned()
            .collect())
    }

    async fn scheduled_games(&self, sport: Sport) -> Result<Vec<Game>> {
        self.check()?;
        Ok(self
            .games
            .read()
            .iter()
            .filter(|g| g.sport == sport && !g.is_final())
            .cloned()
            .collect())
    }

    fn feed_name(&self) -> &str {
        "memory_schedule"
    }
}

/// Lines keyed by game id; several captures per game are allowed
#[derive(Default)]
pub struct MemoryLineFeed {
    lines: RwLock<FxHashMap<String, Vec<MarketLine>>>,
    failing: RwLock<bool>,
}

impl MemoryLineFeed {
    pub fn new(lines: Vec<MarketLine>) -> Self {
        let feed = Self::default();
        for line in lines {
            feed.push(line);
        }
        feed
    }

    pub fn push(&self, line: MarketLine) {
        self.lines
            .write()
            .entry(line.game_id.clone())
            .or_default()
            .push(line);
    }

    /// Make every lookup fail, to exercise the ungraded-on-error path
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }
}

#[async_trait]
impl MarketLineFeed for MemoryLineFeed {
    async fn line_for(&self, _sport: Sport, game_id: &str) -> Result<Option<MarketLine>> {
        if *self.failing.read() {
            return Err(anyhow!("line feed unavailable"));
        }
        let lines = self.lines.read();
        Ok(lines
            .get(game_id)
            .and_then(|captured| select_grading_line(captured))
            .cloned())
    }

    fn feed_name(&self) -> &str {
        "memory_lines"
    }
}
