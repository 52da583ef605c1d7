//! Sequential, resumable backtest replay for one sport.
//!
//! Each run loads the sport's document, replays newly completed games in
//! (scheduled time, game id) order, and replaces the document once at the
//! end. Games already in the processed set are skipped, so a failed run can
//! simply be retried. A final game without a score ends the replay: it and
//! everything after it wait for the next run, which keeps rating updates in
//! chronological order and the watermark behind the unscored game.

use crate::adjusters::AdjusterChain;
use crate::conviction::{ConvictionAssessment, ConvictionScorer};
use crate::error::{ForecastError, Result};
use crate::forecast::{evaluate_line, Forecaster, PredictionRecord};
use crate::grading::GradeSheet;
use crate::league_config::{league_config, LeagueConfig};
use crate::models::{Game, MarketLine, Sport};
use crate::predictor::ModelParams;
use crate::providers::{with_timeout, MarketLineFeed, ScheduleFeed};
use crate::ratings::{RatingConfig, RatingStore, RatingUpdater};
use crate::store::{DocumentStore, SportDocument};
use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub mod result;
pub mod summary;

pub use result::{best_bets, BacktestResult};
pub use summary::{BacktestSummary, MarketTally};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    LoadingState,
    Replaying,
    Persisting,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Documents stamped with another version are discarded and replayed
    pub model_version: String,
    /// Deadline for each feed call
    pub feed_timeout: Duration,
    /// How far behind the watermark to re-ask the schedule feed
    pub lookback: chrono::Duration,
    /// Overrides the league's default hyperparameters
    pub params: Option<ModelParams>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            model_version: "v1".to_string(),
            feed_timeout: Duration::from_secs(10),
            lookback: chrono::Duration::days(3),
            params: None,
        }
    }
}

/// What one run did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Correlates the log lines of one run
    pub run_id: String,
    pub sport: Sport,
    pub model_version: String,
    /// Document was missing or stamped with another model version
    pub started_fresh: bool,
    pub games_fetched: usize,
    pub games_processed: usize,
    pub games_graded: usize,
    pub skipped_already_processed: usize,
    pub skipped_missing_score: usize,
    /// Games after an unscored one, left for the next run to keep replay in order
    pub deferred: usize,
    pub line_failures: usize,
    pub persisted: bool,
    pub watermark: Option<DateTime<Utc>>,
    pub summary: BacktestSummary,
}

/// Outcome of a line backfill
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackfillReport {
    pub regraded: usize,
    pub unchanged: usize,
    /// Lines for games with no stored result, or invalid lines
    pub skipped: usize,
}

/// A forecast for a game not yet played
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingPrediction {
    pub prediction: PredictionRecord,
    pub market_line: Option<MarketLine>,
    /// Picks only; verdicts stay empty until the game is final
    pub picks: Option<GradeSheet>,
    pub conviction: Option<ConvictionAssessment>,
}

pub struct BacktestRunner {
    sport: Sport,
    league: &'static LeagueConfig,
    config: RunnerConfig,
    forecaster: Forecaster,
    updater: RatingUpdater,
    scorer: ConvictionScorer,
    schedule: Arc<dyn ScheduleFeed>,
    lines: Arc<dyn MarketLineFeed>,
    store: Arc<dyn DocumentStore>,
    phase: RunPhase,
}

/// Working state for one run, built from the loaded document
struct RunState {
    document: SportDocument,
    ratings: RatingStore,
    processed: FxHashSet<String>,
    result_index: FxHashMap<String, usize>,
    started_fresh: bool,
}

impl RunState {
    fn from_document(document: SportDocument, started_fresh: bool) -> Self {
        let ratings = RatingStore::from_teams(document.teams.clone());
        let processed = document.processed_game_ids.iter().cloned().collect();
        let result_index = document
            .backtest_results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.game_id.clone(), i))
            .collect();
        Self {
            document,
            ratings,
            processed,
            result_index,
            started_fresh,
        }
    }

    /// Insert or replace by game id, keeping the summary in step
    fn upsert(&mut self, result: BacktestResult) {
        let existing = self.result_index.get(&result.game_id).copied();
        let doc = &mut self.document;
        match existing {
            Some(i) => {
                doc.backtest_summary.retract(&doc.backtest_results[i]);
                doc.backtest_summary.record(&result);
                doc.backtest_results[i] = result;
            }
            None => {
                doc.backtest_summary.record(&result);
                self.result_index
                    .insert(result.game_id.clone(), doc.backtest_results.len());
                doc.backtest_results.push(result);
            }
        }
    }

    fn into_document(mut self) -> SportDocument {
        let mut processed: Vec<String> = self.processed.into_iter().collect();
        processed.sort();
        self.document.processed_game_ids = processed;
        self.document.teams = self.ratings.to_teams();
        self.document.updated_at = Utc::now();
        self.document
    }
}

impl BacktestRunner {
    pub fn new(
        sport: Sport,
        config: RunnerConfig,
        adjusters: AdjusterChain,
        scorer: ConvictionScorer,
        schedule: Arc<dyn ScheduleFeed>,
        lines: Arc<dyn MarketLineFeed>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        let league = league_config(sport);
        let params = config.params.unwrap_or(league.default_params);
        let forecaster = Forecaster::new(league, params, adjusters)?;
        Ok(Self {
            sport,
            league,
            config,
            forecaster,
            updater: RatingUpdater::new(RatingConfig::from(league)),
            scorer,
            schedule,
            lines,
            store,
            phase: RunPhase::Idle,
        })
    }

    pub fn sport(&self) -> Sport {
        self.sport
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: RunPhase) {
        debug!("{} backtest: {:?} -> {:?}", self.sport, self.phase, phase);
        self.phase = phase;
    }

    /// Load the sport's document, or a fresh one if it is missing or stale.
    async fn load_state(&self) -> Result<RunState> {
        let loaded = self
            .store
            .load(self.sport)
            .await
            .map_err(|e| ForecastError::Store(format!("{:#}", e)))?;

        let min_edge = self.forecaster.params().min_edge;
        let fresh = || SportDocument::new(self.sport, &self.config.model_version, min_edge);
        match loaded {
            Some(doc) if doc.sport != self.sport => Err(ForecastError::SportMismatch {
                expected: self.sport,
                found: doc.sport,
            }),
            Some(doc) if doc.model_version != self.config.model_version => {
                warn!(
                    "{} document is model {}, running {}; replaying history from scratch",
                    self.sport, doc.model_version, self.config.model_version
                );
                Ok(RunState::from_document(fresh(), true))
            }
            Some(doc) => Ok(RunState::from_document(doc, false)),
            None => {
                info!("No stored {} document; starting fresh", self.sport);
                Ok(RunState::from_document(fresh(), true))
            }
        }
    }

    /// The game's grading line. Invalid lines read as missing; feed errors
    /// and timeouts are returned for the caller to count.
    async fn fetch_line(&self, game_id: &str) -> anyhow::Result<Option<MarketLine>> {
        let what = format!("{} line for {}", self.lines.feed_name(), game_id);
        let line = with_timeout(self.config.feed_timeout, &what, self.lines.line_for(self.sport, game_id)).await?;
        Ok(line.filter(|line| {
            if !line.is_valid() {
                warn!("Ignoring invalid line for {}: spread {} total {}", game_id, line.spread, line.total);
            }
            line.is_valid()
        }))
    }

    /// One replay pass. Only a non-finite rating or a store failure is fatal;
    /// on either the document is left as it was.
    pub async fn run(&mut self) -> Result<RunReport> {
        let outcome = self.run_inner().await;
        if let Err(e) = &outcome {
            error!("{} backtest aborted: {}", self.sport, e);
        }
        self.set_phase(RunPhase::Idle);
        outcome
    }

    async fn run_inner(&mut self) -> Result<RunReport> {
        self.set_phase(RunPhase::LoadingState);
        let run_id = Uuid::new_v4().to_string();
        debug!("{} backtest run {} starting", self.sport, run_id);
        let mut state = self.load_state().await?;

        let since = state.document.watermark.map(|w| w - self.config.lookback);
        let what = format!("{} completed games", self.schedule.feed_name());
        let fetched = match with_timeout(
            self.config.feed_timeout,
            &what,
            self.schedule.completed_games(self.sport, since),
        )
        .await
        {
            Ok(games) => games,
            Err(e) => {
                warn!("No {} data this run: {:#}", self.sport, e);
                Vec::new()
            }
        };

        self.set_phase(RunPhase::Replaying);
        let mut report = RunReport {
            run_id,
            sport: self.sport,
            model_version: self.config.model_version.clone(),
            started_fresh: state.started_fresh,
            games_fetched: fetched.len(),
            games_processed: 0,
            games_graded: 0,
            skipped_already_processed: 0,
            skipped_missing_score: 0,
            deferred: 0,
            line_failures: 0,
            persisted: false,
            watermark: state.document.watermark,
            summary: BacktestSummary::default(),
        };

        let mut pending: Vec<Game> = Vec::with_capacity(fetched.len());
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for game in fetched {
            if game.sport != self.sport || !game.is_final() {
                debug!("Ignoring {} ({:?}, {:?})", game.game_id, game.sport, game.status);
                continue;
            }
            if state.processed.contains(&game.game_id) {
                report.skipped_already_processed += 1;
                continue;
            }
            if seen.insert(game.game_id.clone()) {
                pending.push(game);
            }
        }
        pending.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.game_id.cmp(&b.game_id))
        });

        for (position, game) in pending.iter().enumerate() {
            // Replay stops here so the watermark never passes an unscored game
            let Some(score) = game.final_score else {
                report.skipped_missing_score += 1;
                report.deferred = pending.len() - position - 1;
                warn!(
                    "{} is final but has no score; holding it and {} later game(s) for the next run",
                    game.game_id, report.deferred
                );
                break;
            };

            state.ratings.ensure_game_teams(game, self.league);
            let prediction = self
                .forecaster
                .predict(&state.ratings, game, &self.config.model_version)?;

            let line = match self.fetch_line(&game.game_id).await {
                Ok(line) => line,
                Err(e) => {
                    warn!("Line unavailable for {}; leaving it ungraded: {:#}", game.game_id, e);
                    report.line_failures += 1;
                    None
                }
            };

            let result = BacktestResult::grade(prediction, score, line, &self.scorer);
            if result.is_graded() {
                report.games_graded += 1;
            }
            state.upsert(result);

            // Fatal: leaves the stored document untouched
            self.updater.apply_game(&mut state.ratings, game, score)?;

            state.processed.insert(game.game_id.clone());
            state.document.watermark = Some(
                state
                    .document
                    .watermark
                    .map_or(game.scheduled_at, |w| w.max(game.scheduled_at)),
            );
            report.games_processed += 1;
        }

        report.watermark = state.document.watermark;
        report.summary = state.document.backtest_summary.clone();

        if report.games_processed > 0 || state.started_fresh {
            self.set_phase(RunPhase::Persisting);
            let document = state.into_document();
            self.store
                .replace(self.sport, &document)
                .await
                .map_err(|e| ForecastError::Store(format!("{:#}", e)))?;
            report.persisted = true;
        }

        info!(
            "{} backtest {}: {} new, {} graded, {} already processed, {} missing score, {} deferred; spread {}-{}-{}",
            self.sport,
            report.run_id,
            report.games_processed,
            report.games_graded,
            report.skipped_already_processed,
            report.skipped_missing_score,
            report.deferred,
            report.summary.spread.wins,
            report.summary.spread.losses,
            report.summary.spread.pushes
        );
        Ok(report)
    }

    /// Replace lines for already-graded games and regrade them from their
    /// stored predictions. Ratings are never touched.
    pub async fn backfill(&mut self, lines: Vec<MarketLine>) -> Result<BackfillReport> {
        self.set_phase(RunPhase::LoadingState);
        let outcome = self.backfill_inner(lines).await;
        self.set_phase(RunPhase::Idle);
        outcome
    }

    async fn backfill_inner(&mut self, lines: Vec<MarketLine>) -> Result<BackfillReport> {
        let mut state = self.load_state().await?;
        let mut report = BackfillReport::default();
        if state.started_fresh {
            warn!("No current {} document to backfill", self.sport);
            report.skipped = lines.len();
            return Ok(report);
        }

        self.set_phase(RunPhase::Replaying);
        for line in lines {
            let Some(&i) = state.result_index.get(&line.game_id) else {
                debug!("Backfill line for unknown game {}", line.game_id);
                report.skipped += 1;
                continue;
            };
            if !line.is_valid() {
                report.skipped += 1;
                continue;
            }
            let existing = &state.document.backtest_results[i];
            if existing.market_line.as_ref() == Some(&line) {
                report.unchanged += 1;
                continue;
            }
            let regraded = existing.regrade(line, &self.scorer);
            state.upsert(regraded);
            report.regraded += 1;
        }

        if report.regraded > 0 {
            self.set_phase(RunPhase::Persisting);
            let document = state.into_document();
            self.store
                .replace(self.sport, &document)
                .await
                .map_err(|e| ForecastError::Store(format!("{:#}", e)))?;
        }
        info!(
            "{} backfill: {} regraded, {} unchanged, {} skipped",
            self.sport, report.regraded, report.unchanged, report.skipped
        );
        Ok(report)
    }

    /// Forecasts for scheduled games from current ratings. Nothing is persisted.
    pub async fn upcoming_predictions(&self) -> Result<Vec<UpcomingPrediction>> {
        let state = self.load_state().await?;
        let mut ratings = state.ratings;

        let what = format!("{} scheduled games", self.schedule.feed_name());
        let mut games = match with_timeout(self.config.feed_timeout, &what, self.schedule.scheduled_games(self.sport)).await {
            Ok(games) => games,
            Err(e) => {
                warn!("No {} schedule this run: {:#}", self.sport, e);
                Vec::new()
            }
        };
        games.retain(|g| g.sport == self.sport && !g.is_final());
        games.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.game_id.cmp(&b.game_id))
        });

        let mut upcoming = Vec::with_capacity(games.len());
        for game in &games {
            ratings.ensure_game_teams(game, self.league);
            let prediction = self
                .forecaster
                .predict(&ratings, game, &self.config.model_version)?;
            let market_line = self.fetch_line(&game.game_id).await.unwrap_or_else(|e| {
                warn!("Line unavailable for upcoming {}: {:#}", game.game_id, e);
                None
            });
            let (picks, conviction) = match &market_line {
                Some(line) => {
                    let eval = evaluate_line(&prediction, line, None, &self.scorer);
                    (Some(eval.grades), eval.conviction)
                }
                None => (None, None),
            };
            upcoming.push(UpcomingPrediction {
                prediction,
                market_line,
                picks,
                conviction,
            });
        }
        Ok(upcoming)
    }
}
