//! Grid-search calibration of forecasting hyperparameters.
//!
//! This module provides:
//! - `HistoricalGame`: a graded game frozen with ratings and form at game time
//! - `ParameterCalibrator`: bounded, parallel sweep over a `ParameterGrid`
//! - `CalibrationReport`: ranked candidates plus rejections
//!
//! Calibration is a read-only simulation. Ratings are taken from each stored
//! prediction's snapshots and the RatingStore is never consulted or mutated.

use crate::adjusters::Adjustment;
use crate::backtest::summary::{counts_as_bet, settlement_price, MarketTally};
use crate::backtest::BacktestResult;
use crate::error::{ForecastError, Result};
use crate::forecast::project_matchup;
use crate::grading::grade_line;
use crate::league_config::{league_config, LeagueConfig};
use crate::models::{FinalScore, MarketKind, MarketLine, Sport, TeamSnapshot};
use crate::predictor::ModelParams;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

pub mod grid;

pub use grid::ParameterGrid;

/// Default bound on candidates per sweep
pub const DEFAULT_MAX_GRID_SIZE: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    WinPct,
    Roi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankBy {
    pub metric: RankMetric,
    pub market: MarketKind,
}

impl Default for RankBy {
    fn default() -> Self {
        Self {
            metric: RankMetric::WinPct,
            market: MarketKind::Spread,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    pub max_grid_size: usize,
    /// Candidates with fewer graded bets on the ranked market are dropped
    pub min_sample: u32,
    /// Worker threads; None uses rayon's default
    pub workers: Option<usize>,
    pub rank_by: RankBy,
    /// How many ranked candidates the report keeps
    pub top_n: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_grid_size: DEFAULT_MAX_GRID_SIZE,
            min_sample: 50,
            workers: None,
            rank_by: RankBy::default(),
            top_n: 20,
        }
    }
}

/// A graded game with everything needed to re-predict it
#[derive(Debug, Clone)]
pub struct HistoricalGame {
    pub game_id: String,
    pub home: TeamSnapshot,
    pub away: TeamSnapshot,
    pub adjustments: Vec<Adjustment>,
    pub line: MarketLine,
    pub score: FinalScore,
}

impl HistoricalGame {
    /// None for ungraded results (no line)
    pub fn from_result(result: &BacktestResult) -> Option<Self> {
        let line = result.market_line.clone()?;
        Some(Self {
            game_id: result.game_id.clone(),
            home: result.prediction.home.clone(),
            away: result.prediction.away.clone(),
            adjustments: result.prediction.adjustments.clone(),
            line,
            score: result.final_score,
        })
    }
}

/// Aggregate grading statistics for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub index: usize,
    pub params: ModelParams,
    pub spread: MarketTally,
    pub moneyline: MarketTally,
    pub total: MarketTally,
}

impl CandidateResult {
    pub fn tally(&self, market: MarketKind) -> &MarketTally {
        match market {
            MarketKind::Spread => &self.spread,
            MarketKind::Moneyline => &self.moneyline,
            MarketKind::Total => &self.total,
        }
    }

    pub fn score(&self, rank_by: RankBy) -> f64 {
        let tally = self.tally(rank_by.market);
        match rank_by.metric {
            RankMetric::WinPct => tally.win_pct(),
            RankMetric::Roi => tally.roi(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub index: usize,
    pub params: ModelParams,
    pub reason: String,
}

enum CandidateOutcome {
    Evaluated(CandidateResult),
    Rejected(RejectedCandidate),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub sport: Sport,
    pub rank_by: RankBy,
    pub min_sample: u32,
    pub grid_size: usize,
    pub historical_games: usize,
    pub evaluated: usize,
    pub below_min_sample: usize,
    pub rejected: Vec<RejectedCandidate>,
    /// Best first
    pub ranked: Vec<CandidateResult>,
    pub generated_at: DateTime<Utc>,
}

impl CalibrationReport {
    pub fn best(&self) -> Option<&CandidateResult> {
        self.ranked.first()
    }
}

pub struct ParameterCalibrator {
    sport: Sport,
    league: &'static LeagueConfig,
    config: CalibrationConfig,
}

impl ParameterCalibrator {
    pub fn new(sport: Sport, config: CalibrationConfig) -> Self {
        Self {
            sport,
            league: league_config(sport),
            config,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Run every candidate in `grid` over the graded games in `results`.
    ///
    /// Fails up front if the grid is empty or too large; individual invalid
    /// candidates are rejected and the sweep continues.
    pub fn calibrate(&self, grid: &ParameterGrid, results: &[BacktestResult]) -> Result<CalibrationReport> {
        let grid_size = grid.size(self.config.max_grid_size)?;

        let history: Vec<HistoricalGame> = results.iter().filter_map(HistoricalGame::from_result).collect();
        info!(
            "{} calibration: {} candidates over {} graded games",
            self.sport,
            grid_size,
            history.len()
        );

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(workers) = self.config.workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder
            .build()
            .map_err(|e| ForecastError::WorkerPool(e.to_string()))?;

        let completed = AtomicUsize::new(0);
        let progress_step = (grid_size / 10).max(1);
        let outcomes: Vec<CandidateOutcome> = pool.install(|| {
            (0..grid_size)
                .into_par_iter()
                .map(|index| {
                    let outcome = self.evaluate_candidate(index, grid.candidate(index), &history);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % progress_step == 0 {
                        debug!("{} calibration: {}/{} candidates", self.sport, done, grid_size);
                    }
                    outcome
                })
                .collect()
        });

        let mut evaluated = Vec::new();
        let mut rejected = Vec::new();
        for outcome in outcomes {
            match outcome {
                CandidateOutcome::Evaluated(result) => evaluated.push(result),
                CandidateOutcome::Rejected(rejection) => rejected.push(rejection),
            }
        }
        let evaluated_count = evaluated.len();

        let rank_by = self.config.rank_by;
        let min_sample = self.config.min_sample;
        let mut ranked: Vec<CandidateResult> = evaluated
            .into_iter()
            .filter(|c| c.tally(rank_by.market).graded() >= min_sample)
            .collect();
        let below_min_sample = evaluated_count - ranked.len();

        ranked.sort_by(|a, b| {
            b.score(rank_by)
                .total_cmp(&a.score(rank_by))
                .then_with(|| b.tally(rank_by.market).graded().cmp(&a.tally(rank_by.market).graded()))
                .then_with(|| a.index.cmp(&b.index))
        });
        ranked.truncate(self.config.top_n);

        if let Some(best) = ranked.first() {
            info!(
                "{} calibration best: {:.3} {:?} on {} ({} bets) with {:?}",
                self.sport,
                best.score(rank_by),
                rank_by.metric,
                rank_by.market.as_str(),
                best.tally(rank_by.market).graded(),
                best.params
            );
        } else {
            info!(
                "{} calibration: no candidate reached {} graded bets",
                self.sport, min_sample
            );
        }

        Ok(CalibrationReport {
            sport: self.sport,
            rank_by,
            min_sample,
            grid_size,
            historical_games: history.len(),
            evaluated: evaluated_count,
            below_min_sample,
            rejected,
            ranked,
            generated_at: Utc::now(),
        })
    }

    fn evaluate_candidate(&self, index: usize, params: ModelParams, history: &[HistoricalGame]) -> CandidateOutcome {
        if let Err(e) = params.validate() {
            debug!("Rejecting candidate {}: {}", index, e);
            return CandidateOutcome::Rejected(RejectedCandidate {
                index,
                params,
                reason: e.to_string(),
            });
        }

        let mut result = CandidateResult {
            index,
            params,
            spread: MarketTally::default(),
            moneyline: MarketTally::default(),
            total: MarketTally::default(),
        };
        for game in history {
            let (_, derived) = project_matchup(self.league, &params, &game.home, &game.away, &game.adjustments);
            let grades = grade_line(&derived, &game.line, Some(game.score));
            for grade in grades.iter() {
                let Some(verdict) = grade.verdict else {
                    continue;
                };
                if !counts_as_bet(grade, params.min_edge) {
                    continue;
                }
                let price = settlement_price(&game.line, grade);
                match grade.market {
                    MarketKind::Spread => result.spread.record(verdict, price),
                    MarketKind::Moneyline => result.moneyline.record(verdict, price),
                    MarketKind::Total => result.total.record(verdict, price),
                }
            }
        }
        CandidateOutcome::Evaluated(result)
    }
}
