//! Conviction tiers for spread picks.
//!
//! A pick is reduced to a set of boolean signals, then the first matching
//! row of `TIER_RULES` (most restrictive first) names its tier. Per-team
//! policy lives in a data table of [`TeamAdjustment`]s instead of in code.
//!
//! Tiers are advisory. They never change a verdict.

use crate::league_config::league_config;
use crate::models::Sport;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvictionTier {
    Avoid,
    Moderate,
    High,
    Elite,
}

impl ConvictionTier {
    pub const ALL: [ConvictionTier; 4] = [
        ConvictionTier::Elite,
        ConvictionTier::High,
        ConvictionTier::Moderate,
        ConvictionTier::Avoid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avoid => "avoid",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Elite => "elite",
        }
    }

    /// High and elite picks make the best-bets list
    pub fn is_best_bet(&self) -> bool {
        *self >= ConvictionTier::High
    }

    /// Lower by `steps` tiers, stopping at avoid
    pub fn demote(self, steps: u8) -> Self {
        let rank = (self as u8).saturating_sub(steps);
        match rank {
            0 => Self::Avoid,
            1 => Self::Moderate,
            2 => Self::High,
            _ => Self::Elite,
        }
    }
}

impl fmt::Display for ConvictionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Signals and rules
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    EdgeAboveThreshold,
    /// Edge at least twice the threshold
    StrongEdge,
    RatingGapAboveThreshold,
    AgreesWithMarketFavorite,
    NotDenylisted,
}

impl Signal {
    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Compact set of signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SignalSet(u8);

impl SignalSet {
    pub fn insert(&mut self, signal: Signal) {
        self.0 |= signal.bit();
    }

    pub fn contains(&self, signal: Signal) -> bool {
        self.0 & signal.bit() != 0
    }

    pub fn contains_all(&self, signals: &[Signal]) -> bool {
        signals.iter().all(|s| self.contains(*s))
    }

    pub fn to_vec(&self) -> Vec<Signal> {
        [
            Signal::EdgeAboveThreshold,
            Signal::StrongEdge,
            Signal::RatingGapAboveThreshold,
            Signal::AgreesWithMarketFavorite,
            Signal::NotDenylisted,
        ]
        .into_iter()
        .filter(|s| self.contains(*s))
        .collect()
    }
}

pub struct TierRule {
    pub tier: ConvictionTier,
    pub requires: &'static [Signal],
}

/// First match wins
pub static TIER_RULES: [TierRule; 4] = [
    TierRule {
        tier: ConvictionTier::Elite,
        requires: &[
            Signal::StrongEdge,
            Signal::RatingGapAboveThreshold,
            Signal::AgreesWithMarketFavorite,
            Signal::NotDenylisted,
        ],
    },
    TierRule {
        tier: ConvictionTier::High,
        requires: &[
            Signal::EdgeAboveThreshold,
            Signal::RatingGapAboveThreshold,
            Signal::NotDenylisted,
        ],
    },
    TierRule {
        tier: ConvictionTier::Moderate,
        requires: &[Signal::EdgeAboveThreshold, Signal::NotDenylisted],
    },
    TierRule {
        tier: ConvictionTier::Avoid,
        requires: &[],
    },
];

fn match_rules(signals: SignalSet) -> ConvictionTier {
    TIER_RULES
        .iter()
        .find(|rule| signals.contains_all(rule.requires))
        .map(|rule| rule.tier)
        .unwrap_or(ConvictionTier::Avoid)
}

// ============================================================================
// Configuration
// ============================================================================

/// Per-team policy applied after the rules table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamAdjustment {
    /// Drop the matched tier by this many steps
    Demote(u8),
    /// Never recommend picks on this team
    Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvictionThresholds {
    pub edge_threshold: f64,
    pub rating_gap_threshold: f64,
}

/// Threshold overrides and team adjustments, keyed by sport.
///
/// Sports without an override use the thresholds in their `LeagueConfig`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvictionConfig {
    #[serde(default)]
    pub thresholds: FxHashMap<Sport, ConvictionThresholds>,
    #[serde(default)]
    pub team_adjustments: FxHashMap<Sport, FxHashMap<String, TeamAdjustment>>,
}

impl ConvictionConfig {
    pub fn thresholds(&self, sport: Sport) -> ConvictionThresholds {
        self.thresholds.get(&sport).copied().unwrap_or_else(|| {
            let league = league_config(sport);
            ConvictionThresholds {
                edge_threshold: league.edge_threshold,
                rating_gap_threshold: league.rating_gap_threshold,
            }
        })
    }

    pub fn with_edge_threshold(mut self, sport: Sport, edge_threshold: f64) -> Self {
        let mut current = self.thresholds(sport);
        current.edge_threshold = edge_threshold;
        self.thresholds.insert(sport, current);
        self
    }

    pub fn with_team_adjustment(mut self, sport: Sport, team_id: &str, adjustment: TeamAdjustment) -> Self {
        self.team_adjustments
            .entry(sport)
            .or_default()
            .insert(team_id.to_string(), adjustment);
        self
    }

    pub fn team_adjustment(&self, sport: Sport, team_id: &str) -> Option<TeamAdjustment> {
        self.team_adjustments.get(&sport)?.get(team_id).copied()
    }
}

// ============================================================================
// Scorer
// ============================================================================

/// What the scorer needs to know about one pick
#[derive(Debug, Clone, Copy)]
pub struct ConvictionInput<'a> {
    /// Team the pick backs
    pub picked_team: &'a str,
    /// Absolute spread edge in points
    pub edge: f64,
    /// Picked team's rating minus its opponent's
    pub rating_gap: f64,
    /// The picked team is the market favorite
    pub picked_market_favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvictionAssessment {
    pub tier: ConvictionTier,
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub team_adjustment: Option<TeamAdjustment>,
}

#[derive(Debug, Clone, Default)]
pub struct ConvictionScorer {
    config: ConvictionConfig,
}

impl ConvictionScorer {
    pub fn new(config: ConvictionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConvictionConfig {
        &self.config
    }

    pub fn signals(&self, sport: Sport, input: &ConvictionInput<'_>) -> SignalSet {
        let thresholds = self.config.thresholds(sport);
        let mut signals = SignalSet::default();

        if input.edge >= thresholds.edge_threshold {
            signals.insert(Signal::EdgeAboveThreshold);
        }
        if input.edge >= 2.0 * thresholds.edge_threshold {
            signals.insert(Signal::StrongEdge);
        }
        if input.rating_gap >= thresholds.rating_gap_threshold {
            signals.insert(Signal::RatingGapAboveThreshold);
        }
        if input.picked_market_favorite {
            signals.insert(Signal::AgreesWithMarketFavorite);
        }
        if self.config.team_adjustment(sport, input.picked_team) != Some(TeamAdjustment::Exclude) {
            signals.insert(Signal::NotDenylisted);
        }
        signals
    }

    pub fn score(&self, sport: Sport, input: &ConvictionInput<'_>) -> ConvictionAssessment {
        let signals = self.signals(sport, input);
        let adjustment = self.config.team_adjustment(sport, input.picked_team);
        let tier = match adjustment {
            Some(TeamAdjustment::Demote(steps)) => match_rules(signals).demote(steps),
            _ => match_rules(signals),
        };
        ConvictionAssessment {
            tier,
            signals: signals.to_vec(),
            team_adjustment: adjustment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(edge: f64, rating_gap: f64, favorite: bool) -> ConvictionInput<'static> {
        ConvictionInput {
            picked_team: "KC",
            edge,
            rating_gap,
            picked_market_favorite: favorite,
        }
    }

    #[test]
    fn test_rules_first_match_wins() {
        let scorer = ConvictionScorer::default();
        // NFL: edge 5, gap 100
        assert_eq!(scorer.score(Sport::NFL, &input(10.0, 150.0, true)).tier, ConvictionTier::Elite);
        assert_eq!(scorer.score(Sport::NFL, &input(10.0, 150.0, false)).tier, ConvictionTier::High);
        assert_eq!(scorer.score(Sport::NFL, &input(6.0, 150.0, true)).tier, ConvictionTier::High);
        assert_eq!(scorer.score(Sport::NFL, &input(6.0, 20.0, true)).tier, ConvictionTier::Moderate);
        assert_eq!(scorer.score(Sport::NFL, &input(2.0, 300.0, true)).tier, ConvictionTier::Avoid);
    }

    #[test]
    fn test_hockey_uses_smaller_threshold() {
        let scorer = ConvictionScorer::default();
        assert_eq!(scorer.score(Sport::NHL, &input(1.5, 0.0, false)).tier, ConvictionTier::Moderate);
        assert_eq!(scorer.score(Sport::NFL, &input(1.5, 0.0, false)).tier, ConvictionTier::Avoid);
    }

    #[test]
    fn test_threshold_override() {
        let config = ConvictionConfig::default().with_edge_threshold(Sport::NFL, 1.0);
        let scorer = ConvictionScorer::new(config);
        assert_eq!(scorer.score(Sport::NFL, &input(1.5, 0.0, false)).tier, ConvictionTier::Moderate);
        assert_eq!(scorer.config().thresholds(Sport::NFL).rating_gap_threshold, 100.0);
    }

    #[test]
    fn test_excluded_team_is_always_avoid() {
        let config = ConvictionConfig::default().with_team_adjustment(Sport::NFL, "KC", TeamAdjustment::Exclude);
        let scorer = ConvictionScorer::new(config);
        let assessment = scorer.score(Sport::NFL, &input(20.0, 400.0, true));
        assert_eq!(assessment.tier, ConvictionTier::Avoid);
        assert!(!assessment.signals.contains(&Signal::NotDenylisted));
    }

    #[test]
    fn test_demotion_lowers_tier() {
        let config = ConvictionConfig::default().with_team_adjustment(Sport::NFL, "KC", TeamAdjustment::Demote(1));
        let scorer = ConvictionScorer::new(config);
        assert_eq!(scorer.score(Sport::NFL, &input(10.0, 150.0, true)).tier, ConvictionTier::High);
        assert_eq!(ConvictionTier::Moderate.demote(5), ConvictionTier::Avoid);
    }

    #[test]
    fn test_best_bets_are_high_and_above() {
        assert!(ConvictionTier::Elite.is_best_bet());
        assert!(ConvictionTier::High.is_best_bet());
        assert!(!ConvictionTier::Moderate.is_best_bet());
    }

    #[test]
    fn test_config_loads_from_json() {
        let json = r#"{
            "thresholds": {"NBA": {"edge_threshold": 4.0, "rating_gap_threshold": 80.0}},
            "team_adjustments": {"NFL": {"NYJ": "exclude", "CAR": {"demote": 2}}}
        }"#;
        let config: ConvictionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.thresholds(Sport::NBA).edge_threshold, 4.0);
        assert_eq!(config.team_adjustment(Sport::NFL, "NYJ"), Some(TeamAdjustment::Exclude));
        assert_eq!(config.team_adjustment(Sport::NFL, "CAR"), Some(TeamAdjustment::Demote(2)));
        assert_eq!(config.team_adjustment(Sport::NBA, "CAR"), None);
    }
}
