//! League configuration for supported sports.
//!
//! This module provides:
//! - Rating-model constants per league (baseline, K-factor, home bonus)
//! - League scoring environment (average combined points per game)
//! - Default forecasting hyperparameters
//! - Default conviction thresholds
//!
//! The conviction edge thresholds (5 points for football and basketball, 1.5
//! for hockey and baseball) are carried over as configuration and still need
//! product-owner sign-off; override them per sport through `ConvictionConfig`.

use crate::models::Sport;
use crate::predictor::ModelParams;

/// Configuration for a single league.
#[derive(Debug, Clone)]
pub struct LeagueConfig {
    pub sport: Sport,
    /// Starting rating for a team never seen before
    pub baseline_rating: f64,
    /// Elo K-factor
    pub k_factor: f64,
    /// Rating points added to the home side when computing expectations
    pub home_rating_bonus: f64,
    /// Average combined points per game across the league
    pub league_avg_total: f64,
    /// Whether rating updates scale with margin of victory
    pub use_margin_of_victory: bool,
    /// Fraction of the distance to baseline a rating regresses between seasons
    pub season_carryover: f64,
    /// Forecast hyperparameters used outside calibration
    pub default_params: ModelParams,
    /// Edge (points/goals) above which a pick counts as a conviction signal
    pub edge_threshold: f64,
    /// Rating gap above which a pick counts as a conviction signal
    pub rating_gap_threshold: f64,
}

impl LeagueConfig {
    /// League-average points for one team in one game
    pub fn avg_team_points(&self) -> f64 {
        self.league_avg_total / 2.0
    }
}

pub static NFL_CONFIG: LeagueConfig = LeagueConfig {
    sport: Sport::NFL,
    baseline_rating: 1500.0,
    k_factor: 20.0,
    home_rating_bonus: 48.0,
    league_avg_total: 44.0,
    use_margin_of_victory: true,
    season_carryover: 1.0 / 3.0,
    default_params: ModelParams {
        regression: 0.3,
        rating_to_points: 0.04,
        home_advantage: 2.0,
        rating_cap: 14.0,
        spread_shrinkage: 0.1,
        situational_weight: 1.0,
        min_edge: 0.0,
    },
    edge_threshold: 5.0,
    rating_gap_threshold: 100.0,
};

pub static NCAAF_CONFIG: LeagueConfig = LeagueConfig {
    sport: Sport::NCAAF,
    baseline_rating: 1500.0,
    k_factor: 25.0,
    home_rating_bonus: 55.0,
    league_avg_total: 55.0,
    use_margin_of_victory: true,
    season_carryover: 1.0 / 3.0,
    default_params: ModelParams {
        regression: 0.3,
        rating_to_points: 0.04,
        home_advantage: 2.5,
        rating_cap: 21.0,
        spread_shrinkage: 0.1,
        situational_weight: 1.0,
        min_edge: 0.0,
    },
    edge_threshold: 5.0,
    rating_gap_threshold: 150.0,
};

pub static NBA_CONFIG: LeagueConfig = LeagueConfig {
    sport: Sport::NBA,
    baseline_rating: 1500.0,
    k_factor: 20.0,
    home_rating_bonus: 100.0,
    league_avg_total: 228.0,
    use_margin_of_victory: true,
    season_carryover: 0.25,
    default_params: ModelParams {
        regression: 0.2,
        rating_to_points: 0.036,
        home_advantage: 2.5,
        rating_cap: 16.0,
        spread_shrinkage: 0.1,
        situational_weight: 1.0,
        min_edge: 0.0,
    },
    edge_threshold: 5.0,
    rating_gap_threshold: 100.0,
};

pub static NCAAB_CONFIG: LeagueConfig = LeagueConfig {
    sport: Sport::NCAAB,
    baseline_rating: 1500.0,
    k_factor: 25.0,
    home_rating_bonus: 85.0,
    league_avg_total: 142.0,
    use_margin_of_victory: true,
    season_carryover: 1.0 / 3.0,
    default_params: ModelParams {
        regression: 0.3,
        rating_to_points: 0.04,
        home_advantage: 3.5,
        rating_cap: 20.0,
        spread_shrinkage: 0.1,
        situational_weight: 1.0,
        min_edge: 0.0,
    },
    edge_threshold: 5.0,
    rating_gap_threshold: 150.0,
};

pub static NHL_CONFIG: LeagueConfig = LeagueConfig {
    sport: Sport::NHL,
    baseline_rating: 1500.0,
    k_factor: 6.0,
    home_rating_bonus: 35.0,
    league_avg_total: 6.0,
    use_margin_of_victory: true,
    season_carryover: 0.3,
    default_params: ModelParams {
        regression: 0.4,
        rating_to_points: 0.005,
        home_advantage: 0.25,
        rating_cap: 1.5,
        spread_shrinkage: 0.0,
        situational_weight: 1.0,
        min_edge: 0.0,
    },
    edge_threshold: 1.5,
    rating_gap_threshold: 75.0,
};

pub static MLB_CONFIG: LeagueConfig = LeagueConfig {
    sport: Sport::MLB,
    baseline_rating: 1500.0,
    k_factor: 4.0,
    home_rating_bonus: 24.0,
    league_avg_total: 8.8,
    use_margin_of_victory: false,
    season_carryover: 1.0 / 3.0,
    default_params: ModelParams {
        regression: 0.4,
        rating_to_points: 0.006,
        home_advantage: 0.25,
        rating_cap: 1.5,
        spread_shrinkage: 0.0,
        situational_weight: 1.0,
        min_edge: 0.0,
    },
    edge_threshold: 1.5,
    rating_gap_threshold: 60.0,
};

pub static MLS_CONFIG: LeagueConfig = LeagueConfig {
    sport: Sport::MLS,
    baseline_rating: 1500.0,
    k_factor: 20.0,
    home_rating_bonus: 60.0,
    league_avg_total: 2.9,
    use_margin_of_victory: true,
    season_carryover: 1.0 / 3.0,
    default_params: ModelParams {
        regression: 0.4,
        rating_to_points: 0.004,
        home_advantage: 0.3,
        rating_cap: 1.0,
        spread_shrinkage: 0.0,
        situational_weight: 1.0,
        min_edge: 0.0,
    },
    edge_threshold: 0.5,
    rating_gap_threshold: 75.0,
};

/// Static configuration for all supported leagues.
pub static LEAGUE_CONFIGS: [&LeagueConfig; 7] = [
    &NFL_CONFIG,
    &NCAAF_CONFIG,
    &NBA_CONFIG,
    &NCAAB_CONFIG,
    &NHL_CONFIG,
    &MLB_CONFIG,
    &MLS_CONFIG,
];

/// Get league configuration for a sport.
pub fn league_config(sport: Sport) -> &'static LeagueConfig {
    match sport {
        Sport::NFL => &NFL_CONFIG,
        Sport::NCAAF => &NCAAF_CONFIG,
        Sport::NBA => &NBA_CONFIG,
        Sport::NCAAB => &NCAAB_CONFIG,
        Sport::NHL => &NHL_CONFIG,
        Sport::MLB => &MLB_CONFIG,
        Sport::MLS => &MLS_CONFIG,
    }
}

/// Get league configuration by code.
pub fn get_league_config(code: &str) -> Option<&'static LeagueConfig> {
    LEAGUE_CONFIGS
        .iter()
        .copied()
        .find(|c| c.sport.code().eq_ignore_ascii_case(code.trim()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_sport_has_matching_config() {
        for sport in Sport::ALL {
            assert_eq!(league_config(sport).sport, sport);
        }
        assert_eq!(LEAGUE_CONFIGS.len(), Sport::ALL.len());
    }

    #[test]
    fn test_case_insensitivity() {
        assert!(get_league_config("NFL").is_some());
        assert!(get_league_config("nfl").is_some());
        assert!(get_league_config("Nhl").is_some());
        assert!(get_league_config("epl").is_none());
    }

    #[test]
    fn test_default_params_are_valid() {
        for config in LEAGUE_CONFIGS {
            assert!(config.default_params.validate().is_ok(), "{}", config.sport);
            assert!(config.baseline_rating.is_finite());
            assert!(config.k_factor > 0.0);
        }
    }

    #[test]
    fn test_low_scoring_leagues_use_smaller_edge_threshold() {
        assert_eq!(league_config(Sport::NFL).edge_threshold, 5.0);
        assert_eq!(league_config(Sport::NBA).edge_threshold, 5.0);
        assert_eq!(league_config(Sport::NHL).edge_threshold, 1.5);
    }

    #[test]
    fn test_avg_team_points_is_half_total() {
        assert_eq!(NFL_CONFIG.avg_team_points(), 22.0);
    }
}
