//! Edgecast Core - Rating-driven score projection, backtesting and calibration.
//!
//! This crate provides:
//! - Elo-style team ratings with margin-of-victory scaling and season carry-over
//! - Win probability from rating differences with a home bonus
//! - Score projection with regression, rating caps and situational adjusters
//! - Derived spread/total/moneyline lines and grading against market lines
//! - Conviction tiers for best-bet selection
//! - Incremental, idempotent backtest runs over persisted per-sport documents
//! - Parallel hyperparameter calibration via rayon
//!
//! Spreads everywhere are away score minus home score: negative means the
//! home side is favored.

pub mod adjusters;
pub mod backtest;
pub mod calibration;
pub mod conviction;
pub mod deriver;
pub mod error;
pub mod forecast;
pub mod grading;
pub mod league_config;
pub mod models;
pub mod predictor;
pub mod providers;
pub mod ratings;
pub mod store;
pub mod utils;
pub mod win_prob;

pub use adjusters::{AdjusterChain, Adjustment, SituationalAdjuster};
pub use backtest::{BacktestResult, BacktestRunner, BacktestSummary, RunReport, RunnerConfig};
pub use calibration::{CalibrationConfig, CalibrationReport, ParameterCalibrator, ParameterGrid};
pub use conviction::{ConvictionConfig, ConvictionScorer, ConvictionTier};
pub use error::{ForecastError, Result};
pub use forecast::{Forecaster, PredictionRecord};
pub use league_config::{get_league_config, league_config, LeagueConfig};
pub use models::{FinalScore, Game, MarketLine, Sport, Team};
pub use predictor::ModelParams;
pub use ratings::{RatingStore, RatingUpdater};
pub use win_prob::home_win_probability;
