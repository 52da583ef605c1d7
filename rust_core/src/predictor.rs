//! Projected score from team ratings and scoring form.
//!
//! The projection is built in five steps:
//! 1. regress each offensive/defensive average toward the league mean
//! 2. base score = mean(own offense, opponent defense)
//! 3. rating gap converted to points and capped, half to each side
//! 4. home advantage, half to each side
//! 5. situational adjustments (see [`crate::adjusters`])
//!
//! A positive rating gap (home stronger) always raises the home score. All
//! functions here are pure.

use crate::adjusters::{Adjustment, AdjustmentTarget};
use crate::error::{ForecastError, Result};
use crate::models::TeamSnapshot;
use serde::{Deserialize, Serialize};

/// Forecasting hyperparameters. Also the unit the calibrator searches over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Weight pulling scoring averages toward the league mean, in [0, 1]
    pub regression: f64,
    /// Points of margin per rating point of gap
    pub rating_to_points: f64,
    /// Home advantage in points of margin
    pub home_advantage: f64,
    /// Maximum absolute margin swing from the rating gap, before halving
    pub rating_cap: f64,
    /// Fraction the derived spread is pulled toward zero, in [0, 1)
    pub spread_shrinkage: f64,
    /// Scale on situational adjustments (1.0 = as reported)
    pub situational_weight: f64,
    /// Minimum edge for a pick to count as a bet
    pub min_edge: f64,
}

impl ModelParams {
    /// Reject NaN/inf and out-of-range values.
    pub fn validate(&self) -> Result<()> {
        check("regression", self.regression, (0.0..=1.0).contains(&self.regression), "must be in [0, 1]")?;
        check("rating_to_points", self.rating_to_points, self.rating_to_points >= 0.0, "must be >= 0")?;
        check("home_advantage", self.home_advantage, true, "")?;
        check("rating_cap", self.rating_cap, self.rating_cap >= 0.0, "must be >= 0")?;
        check(
            "spread_shrinkage",
            self.spread_shrinkage,
            (0.0..1.0).contains(&self.spread_shrinkage),
            "must be in [0, 1)",
        )?;
        check(
            "situational_weight",
            self.situational_weight,
            self.situational_weight >= 0.0,
            "must be >= 0",
        )?;
        check("min_edge", self.min_edge, self.min_edge >= 0.0, "must be >= 0")?;
        Ok(())
    }
}

fn check(name: &'static str, value: f64, in_range: bool, reason: &'static str) -> Result<()> {
    if !value.is_finite() {
        return Err(ForecastError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        });
    }
    if !in_range {
        return Err(ForecastError::InvalidParameter { name, value, reason });
    }
    Ok(())
}

/// A projected score pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedScore {
    pub home: f64,
    pub away: f64,
}

impl ProjectedScore {
    pub fn total(&self) -> f64 {
        self.home + self.away
    }

    /// Away minus home
    pub fn spread(&self) -> f64 {
        self.away - self.home
    }
}

/// Everything the predictor needs about one matchup
#[derive(Debug, Clone, Copy)]
pub struct MatchupInputs {
    pub home_rating: f64,
    pub away_rating: f64,
    pub home_points_for: f64,
    pub home_points_against: f64,
    pub away_points_for: f64,
    pub away_points_against: f64,
    /// League-average combined points per game
    pub league_avg_total: f64,
}

impl MatchupInputs {
    pub fn from_snapshots(home: &TeamSnapshot, away: &TeamSnapshot, league_avg_total: f64) -> Self {
        Self {
            home_rating: home.rating,
            away_rating: away.rating,
            home_points_for: home.points_for_avg,
            home_points_against: home.points_against_avg,
            away_points_for: away.points_for_avg,
            away_points_against: away.points_against_avg,
            league_avg_total,
        }
    }

    pub fn rating_diff(&self) -> f64 {
        self.home_rating - self.away_rating
    }
}

#[inline]
fn regress(raw: f64, mean: f64, r: f64) -> f64 {
    raw * (1.0 - r) + mean * r
}

/// Steps 1-4: projection before situational adjustments.
pub fn project_base(inputs: &MatchupInputs, params: &ModelParams) -> ProjectedScore {
    let mean = inputs.league_avg_total / 2.0;
    let r = params.regression;

    let home_off = regress(inputs.home_points_for, mean, r);
    let home_def = regress(inputs.home_points_against, mean, r);
    let away_off = regress(inputs.away_points_for, mean, r);
    let away_def = regress(inputs.away_points_against, mean, r);

    let mut home = (home_off + away_def) / 2.0;
    let mut away = (away_off + home_def) / 2.0;

    let half_cap = params.rating_cap / 2.0;
    let adj = (inputs.rating_diff() * params.rating_to_points).clamp(-half_cap, half_cap);
    home += adj / 2.0;
    away -= adj / 2.0;

    home += params.home_advantage / 2.0;
    away -= params.home_advantage / 2.0;

    ProjectedScore { home, away }
}

/// Step 5: fold situational adjustments into a projection.
///
/// Total-type adjustments are split evenly between the sides; side-specific
/// ones land on that side only. Scores never go below zero.
pub fn apply_adjustments(base: ProjectedScore, adjustments: &[Adjustment], weight: f64) -> ProjectedScore {
    let mut home = base.home;
    let mut away = base.away;
    for adj in adjustments {
        let points = adj.points * weight;
        match adj.target {
            AdjustmentTarget::Total => {
                home += points / 2.0;
                away += points / 2.0;
            }
            AdjustmentTarget::Home => home += points,
            AdjustmentTarget::Away => away += points,
        }
    }
    ProjectedScore {
        home: home.max(0.0),
        away: away.max(0.0),
    }
}

/// Full projection: base plus weighted adjustments.
pub fn project_score(
    inputs: &MatchupInputs,
    params: &ModelParams,
    adjustments: &[Adjustment],
) -> ProjectedScore {
    apply_adjustments(project_base(inputs, params), adjustments, params.situational_weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjusters::AdjusterKind;

    fn params() -> ModelParams {
        ModelParams {
            regression: 0.3,
            rating_to_points: 0.06,
            home_advantage: 2.5,
            rating_cap: 10.0,
            spread_shrinkage: 0.0,
            situational_weight: 1.0,
            min_edge: 0.0,
        }
    }

    fn average_matchup(home_rating: f64, away_rating: f64) -> MatchupInputs {
        MatchupInputs {
            home_rating,
            away_rating,
            home_points_for: 11.0,
            home_points_against: 11.0,
            away_points_for: 11.0,
            away_points_against: 11.0,
            league_avg_total: 22.0,
        }
    }

    #[test]
    fn test_even_matchup_gets_half_home_advantage_each_side() {
        let p = project_base(&average_matchup(1500.0, 1500.0), &params());
        assert!((p.home - 12.25).abs() < 1e-12);
        assert!((p.away - 9.75).abs() < 1e-12);
        assert!((p.total() - 22.0).abs() < 1e-12);
    }

    #[test]
    fn test_rating_gap_is_capped() {
        // 1000-point gap * 0.06 = 60 points, capped at cap/2 = 5
        let p = project_base(&average_matchup(2000.0, 1000.0), &params());
        assert!((p.home - (11.0 + 2.5 + 1.25)).abs() < 1e-12);
        assert!((p.away - (11.0 - 2.5 - 1.25)).abs() < 1e-12);
    }

    #[test]
    fn test_stronger_home_team_projects_higher() {
        let even = project_base(&average_matchup(1500.0, 1500.0), &params());
        let strong = project_base(&average_matchup(1560.0, 1500.0), &params());
        assert!(strong.home > even.home);
        assert!(strong.away < even.away);
    }

    #[test]
    fn test_regression_pulls_toward_league_mean() {
        let mut inputs = average_matchup(1500.0, 1500.0);
        inputs.home_points_for = 21.0;
        let mut p = params();
        p.home_advantage = 0.0;

        p.regression = 0.0;
        let raw = project_base(&inputs, &p);
        p.regression = 1.0;
        let full = project_base(&inputs, &p);

        assert!((raw.home - 16.0).abs() < 1e-12);
        assert!((full.home - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_adjustments_split_or_land_on_one_side() {
        let base = ProjectedScore { home: 20.0, away: 20.0 };
        let adjustments = vec![
            Adjustment::total(AdjusterKind::Weather, -4.0, "wind"),
            Adjustment::side(AdjusterKind::Injury, AdjustmentTarget::Away, -3.0, "QB out"),
        ];
        let adjusted = apply_adjustments(base, &adjustments, 1.0);
        assert!((adjusted.home - 18.0).abs() < 1e-12);
        assert!((adjusted.away - 15.0).abs() < 1e-12);

        let half = apply_adjustments(base, &adjustments, 0.5);
        assert!((half.home - 19.0).abs() < 1e-12);
    }

    #[test]
    fn test_scores_never_negative() {
        let base = ProjectedScore { home: 1.0, away: 1.0 };
        let adjustments = vec![Adjustment::total(AdjusterKind::Weather, -10.0, "blizzard")];
        let adjusted = apply_adjustments(base, &adjustments, 1.0);
        assert_eq!(adjusted.home, 0.0);
        assert_eq!(adjusted.away, 0.0);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(params().validate().is_ok());
        let mut p = params();
        p.regression = 1.5;
        assert!(p.validate().is_err());
        let mut p = params();
        p.spread_shrinkage = 1.0;
        assert!(p.validate().is_err());
        let mut p = params();
        p.home_advantage = f64::NAN;
        assert!(p.validate().is_err());
        let mut p = params();
        p.min_edge = -1.0;
        assert!(p.validate().is_err());
    }
}
