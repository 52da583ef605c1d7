//! Spread, total and win probability from a projected score.

use crate::predictor::{ModelParams, ProjectedScore};
use crate::win_prob::home_win_probability;
use serde::{Deserialize, Serialize};

/// Numbers derived from a projection, in market quoting granularity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedLine {
    /// Away minus home, shrunk toward zero and rounded to a half point
    pub spread: f64,
    /// Combined projected points, rounded to a half point
    pub total: f64,
    /// Probability the home side wins outright
    pub home_win_prob: f64,
}

/// Round to the nearest half point; halves of a half round away from zero.
#[inline]
pub fn round_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

pub fn derive_spread(projection: &ProjectedScore, spread_shrinkage: f64) -> f64 {
    round_half(projection.spread() * (1.0 - spread_shrinkage))
}

pub fn derive_total(projection: &ProjectedScore) -> f64 {
    round_half(projection.total())
}

/// Derive the full line for a projection and the ratings behind it.
pub fn derive_line(
    projection: &ProjectedScore,
    home_rating: f64,
    away_rating: f64,
    home_rating_bonus: f64,
    params: &ModelParams,
) -> DerivedLine {
    DerivedLine {
        spread: derive_spread(projection, params.spread_shrinkage),
        total: derive_total(projection),
        home_win_prob: home_win_probability(home_rating, away_rating, home_rating_bonus),
    }
}
