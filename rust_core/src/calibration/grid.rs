//! Hyperparameter grid, enumerated lazily.
//!
//! Candidate `i` is decoded from its index in mixed radix (last axis varies
//! fastest), so the Cartesian product is never materialized.

use crate::error::{ForecastError, Result};
use crate::league_config::LeagueConfig;
use crate::predictor::ModelParams;
use serde::{Deserialize, Serialize};

/// Value lists, one per hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    pub regression: Vec<f64>,
    pub rating_to_points: Vec<f64>,
    pub home_advantage: Vec<f64>,
    pub rating_cap: Vec<f64>,
    pub spread_shrinkage: Vec<f64>,
    pub situational_weight: Vec<f64>,
    pub min_edge: Vec<f64>,
}

impl ParameterGrid {
    /// Single-candidate grid
    pub fn from_params(params: &ModelParams) -> Self {
        Self {
            regression: vec![params.regression],
            rating_to_points: vec![params.rating_to_points],
            home_advantage: vec![params.home_advantage],
            rating_cap: vec![params.rating_cap],
            spread_shrinkage: vec![params.spread_shrinkage],
            situational_weight: vec![params.situational_weight],
            min_edge: vec![params.min_edge],
        }
    }

    /// A modest sweep around a league's defaults (3^5 * 2 * 3 = 1458 candidates)
    pub fn around_defaults(league: &LeagueConfig) -> Self {
        let p = league.default_params;
        let spread = |v: f64, step: f64| vec![v * (1.0 - step), v, v * (1.0 + step)];
        let edge = league.edge_threshold;
        Self {
            regression: vec![
                (p.regression - 0.1).max(0.0),
                p.regression,
                (p.regression + 0.1).min(1.0),
            ],
            rating_to_points: spread(p.rating_to_points, 0.25),
            home_advantage: spread(p.home_advantage, 0.5),
            rating_cap: spread(p.rating_cap, 0.3),
            spread_shrinkage: vec![0.0, 0.1, 0.2],
            situational_weight: vec![0.5, 1.0],
            min_edge: vec![0.0, edge * 0.5, edge],
        }
    }

    fn axes(&self) -> [(&'static str, &[f64]); 7] {
        [
            ("regression", self.regression.as_slice()),
            ("rating_to_points", self.rating_to_points.as_slice()),
            ("home_advantage", self.home_advantage.as_slice()),
            ("rating_cap", self.rating_cap.as_slice()),
            ("spread_shrinkage", self.spread_shrinkage.as_slice()),
            ("situational_weight", self.situational_weight.as_slice()),
            ("min_edge", self.min_edge.as_slice()),
        ]
    }

    /// Number of candidates. Errors on an empty axis or when the product
    /// exceeds `limit` (overflow counts as exceeding).
    pub fn size(&self, limit: usize) -> Result<usize> {
        let mut size: usize = 1;
        for (name, values) in self.axes() {
            if values.is_empty() {
                return Err(ForecastError::EmptyGridAxis(name));
            }
            size = size.checked_mul(values.len()).unwrap_or(usize::MAX);
        }
        if size > limit {
            return Err(ForecastError::GridTooLarge { size, limit });
        }
        Ok(size)
    }

    /// Decode candidate `index`. Callers keep `index` below `size()`.
    pub fn candidate(&self, index: usize) -> ModelParams {
        let mut rest = index;
        let mut pick = |values: &[f64]| {
            let value = values[rest % values.len()];
            rest /= values.len();
            value
        };
        // Last axis fastest
        let min_edge = pick(&self.min_edge[..]);
        let situational_weight = pick(&self.situational_weight[..]);
        let spread_shrinkage = pick(&self.spread_shrinkage[..]);
        let rating_cap = pick(&self.rating_cap[..]);
        let home_advantage = pick(&self.home_advantage[..]);
        let rating_to_points = pick(&self.rating_to_points[..]);
        let regression = pick(&self.regression[..]);
        ModelParams {
            regression,
            rating_to_points,
            home_advantage,
            rating_cap,
            spread_shrinkage,
            situational_weight,
            min_edge,
        }
    }

    /// Lazy iterator over every candidate, bounded by `limit`
    pub fn iter(&self, limit: usize) -> Result<impl Iterator<Item = ModelParams> + '_> {
        let size = self.size(limit)?;
        Ok((0..size).map(move |i| self.candidate(i)))
    }
}
