//! Situational adjusters
//!
//! Defines the SituationalAdjuster trait for pluggable pre-game modifiers
//! (rest, weather, injuries, pace calibration) and the chain that runs them.
//!
//! Adjusters report raw point deltas sized against the league scoring
//! environment, not against a projection, so the same breakdown can be
//! stored with a prediction and re-weighted later by the calibrator.

use crate::models::{SituationalContext, Sport, TeamSide};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Which adjuster produced a delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjusterKind {
    Rest,
    Weather,
    Injury,
    Pace,
}

/// Where a delta lands on the projected score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentTarget {
    /// Split evenly between both sides
    Total,
    Home,
    Away,
}

impl From<TeamSide> for AdjustmentTarget {
    fn from(side: TeamSide) -> Self {
        match side {
            TeamSide::Home => AdjustmentTarget::Home,
            TeamSide::Away => AdjustmentTarget::Away,
        }
    }
}

/// One line of the situational breakdown attached to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub kind: AdjusterKind,
    pub target: AdjustmentTarget,
    /// Unweighted points
    pub points: f64,
    pub reason: String,
}

impl Adjustment {
    pub fn total(kind: AdjusterKind, points: f64, reason: impl Into<String>) -> Self {
        Self {
            kind,
            target: AdjustmentTarget::Total,
            points,
            reason: reason.into(),
        }
    }

    pub fn side(kind: AdjusterKind, target: AdjustmentTarget, points: f64, reason: impl Into<String>) -> Self {
        Self {
            kind,
            target,
            points,
            reason: reason.into(),
        }
    }
}

/// What an adjuster gets to look at
#[derive(Debug, Clone, Copy)]
pub struct AdjusterInput<'a> {
    pub sport: Sport,
    pub situation: &'a SituationalContext,
    /// League-average combined points per game
    pub league_avg_total: f64,
}

impl AdjusterInput<'_> {
    fn avg_team_points(&self) -> f64 {
        self.league_avg_total / 2.0
    }
}

/// Pluggable situational modifier
pub trait SituationalAdjuster: Send + Sync {
    /// Deltas for this game; empty when the adjuster has nothing to say
    fn adjust(&self, input: &AdjusterInput<'_>) -> Vec<Adjustment>;

    /// Adjuster name for logging and debugging
    fn adjuster_name(&self) -> &str;
}

// ============================================================================
// Rest
// ============================================================================

/// Penalizes a side playing on short rest (back-to-backs and the like).
#[derive(Debug, Clone)]
pub struct RestAdjuster {
    /// Rest at or below this many days counts as short
    pub short_rest_days: u32,
    /// Fraction of league-average team points lost on short rest
    pub penalty_fraction: f64,
}

impl Default for RestAdjuster {
    fn default() -> Self {
        Self {
            short_rest_days: 1,
            penalty_fraction: 0.02,
        }
    }
}

impl SituationalAdjuster for RestAdjuster {
    fn adjust(&self, input: &AdjusterInput<'_>) -> Vec<Adjustment> {
        let penalty = -input.avg_team_points() * self.penalty_fraction;
        let sides = [
            (AdjustmentTarget::Home, input.situation.home_rest_days),
            (AdjustmentTarget::Away, input.situation.away_rest_days),
        ];
        sides
            .into_iter()
            .filter_map(|(target, rest)| {
                let days = rest?;
                (days <= self.short_rest_days).then(|| {
                    Adjustment::side(AdjusterKind::Rest, target, penalty, format!("{} day(s) rest", days))
                })
            })
            .collect()
    }

    fn adjuster_name(&self) -> &str {
        "rest"
    }
}

// ============================================================================
// Weather
// ============================================================================

/// Lowers the total for wind, cold and precipitation at outdoor venues.
#[derive(Debug, Clone)]
pub struct WeatherAdjuster {
    pub wind_threshold_mph: f64,
    /// Fraction of the league total lost per mph above the threshold
    pub wind_fraction_per_mph: f64,
    pub cold_threshold_f: f64,
    pub cold_fraction: f64,
    pub precipitation_fraction: f64,
    /// Upper bound on the combined weather reduction
    pub max_fraction: f64,
}

impl Default for WeatherAdjuster {
    fn default() -> Self {
        Self {
            wind_threshold_mph: 15.0,
            wind_fraction_per_mph: 0.005,
            cold_threshold_f: 25.0,
            cold_fraction: 0.02,
            precipitation_fraction: 0.03,
            max_fraction: 0.15,
        }
    }
}

impl SituationalAdjuster for WeatherAdjuster {
    fn adjust(&self, input: &AdjusterInput<'_>) -> Vec<Adjustment> {
        if !input.sport.plays_outdoors() || input.situation.indoor == Some(true) {
            return Vec::new();
        }
        let Some(weather) = input.situation.weather else {
            return Vec::new();
        };

        let mut fraction = 0.0;
        let mut reasons = Vec::new();
        if weather.wind_mph.is_finite() && weather.wind_mph > self.wind_threshold_mph {
            fraction += (weather.wind_mph - self.wind_threshold_mph) * self.wind_fraction_per_mph;
            reasons.push(format!("wind {:.0} mph", weather.wind_mph));
        }
        if weather.temperature_f.is_finite() && weather.temperature_f < self.cold_threshold_f {
            fraction += self.cold_fraction;
            reasons.push(format!("{:.0}F", weather.temperature_f));
        }
        if weather.precipitation {
            fraction += self.precipitation_fraction;
            reasons.push("precipitation".to_string());
        }
        if reasons.is_empty() {
            return Vec::new();
        }

        let points = -input.league_avg_total * fraction.min(self.max_fraction);
        vec![Adjustment::total(AdjusterKind::Weather, points, reasons.join(", "))]
    }

    fn adjuster_name(&self) -> &str {
        "weather"
    }
}

// ============================================================================
// Injuries
// ============================================================================

/// Subtracts reported injury impact from the affected side.
#[derive(Debug, Clone)]
pub struct InjuryAdjuster {
    /// Cap on a side's total injury loss, as a fraction of league-average team points
    pub max_fraction: f64,
}

impl Default for InjuryAdjuster {
    fn default() -> Self {
        Self { max_fraction: 0.25 }
    }
}

impl SituationalAdjuster for InjuryAdjuster {
    fn adjust(&self, input: &AdjusterInput<'_>) -> Vec<Adjustment> {
        let cap = input.avg_team_points() * self.max_fraction;
        [TeamSide::Home, TeamSide::Away]
            .into_iter()
            .filter_map(|side| {
                let out: Vec<_> = input
                    .situation
                    .injuries
                    .iter()
                    .filter(|i| i.side == side && i.point_impact.is_finite() && i.point_impact > 0.0)
                    .collect();
                if out.is_empty() {
                    return None;
                }
                let lost: f64 = out.iter().map(|i| i.point_impact).sum::<f64>().min(cap);
                let names: Vec<&str> = out.iter().map(|i| i.player.as_str()).collect();
                Some(Adjustment::side(
                    AdjusterKind::Injury,
                    side.into(),
                    -lost,
                    format!("out: {}", names.join(", ")),
                ))
            })
            .collect()
    }

    fn adjuster_name(&self) -> &str {
        "injury"
    }
}

// ============================================================================
// Pace calibration
// ============================================================================

/// Rescales the league scoring environment per sport.
///
/// A factor of 1.08 means games have been running 8% above the configured
/// league total, so the projected total is nudged up by that much.
#[derive(Debug, Clone, Default)]
pub struct PaceAdjuster {
    factors: FxHashMap<Sport, f64>,
}

impl PaceAdjuster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factor(mut self, sport: Sport, factor: f64) -> Self {
        self.factors.insert(sport, factor);
        self
    }
}

impl SituationalAdjuster for PaceAdjuster {
    fn adjust(&self, input: &AdjusterInput<'_>) -> Vec<Adjustment> {
        match self.factors.get(&input.sport) {
            Some(&factor) if factor.is_finite() && factor > 0.0 && factor != 1.0 => {
                let points = input.league_avg_total * (factor - 1.0);
                vec![Adjustment::total(
                    AdjusterKind::Pace,
                    points,
                    format!("pace x{:.3}", factor),
                )]
            }
            _ => Vec::new(),
        }
    }

    fn adjuster_name(&self) -> &str {
        "pace"
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Ordered set of adjusters run for every prediction.
///
/// Each adjuster sees the same input, so the breakdown does not depend on
/// registration order.
pub struct AdjusterChain {
    adjusters: Vec<Box<dyn SituationalAdjuster>>,
}

impl AdjusterChain {
    /// Chain with the rest, weather and injury adjusters
    pub fn new() -> Self {
        let mut chain = Self::empty();
        chain.register_adjuster(Box::new(RestAdjuster::default()));
        chain.register_adjuster(Box::new(WeatherAdjuster::default()));
        chain.register_adjuster(Box::new(InjuryAdjuster::default()));
        chain
    }

    pub fn empty() -> Self {
        Self { adjusters: Vec::new() }
    }

    pub fn register_adjuster(&mut self, adjuster: Box<dyn SituationalAdjuster>) {
        self.adjusters.push(adjuster);
    }

    pub fn len(&self) -> usize {
        self.adjusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjusters.is_empty()
    }

    /// Full breakdown for one game
    pub fn adjustments(&self, input: &AdjusterInput<'_>) -> Vec<Adjustment> {
        self.adjusters
            .iter()
            .flat_map(|adjuster| {
                let deltas = adjuster.adjust(input);
                if !deltas.is_empty() {
                    tracing::debug!(
                        "{} adjuster produced {} delta(s) for {}",
                        adjuster.adjuster_name(),
                        deltas.len(),
                        input.sport
                    );
                }
                deltas
            })
            .collect()
    }
}

impl Default for AdjusterChain {
    fn default() -> Self {
        Self::new()
    }
}
