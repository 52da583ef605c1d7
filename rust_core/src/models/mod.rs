// Shared models for the Edgecast forecasting engine
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod market_type;

pub use market_type::{select_grading_line, LineVariant, MarketKind, MarketLine};

// ============================================================================
// Sport
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sport {
    NFL,
    NCAAF,
    NBA,
    NCAAB,
    NHL,
    MLB,
    MLS,
}

impl Sport {
    pub const ALL: [Sport; 7] = [
        Sport::NFL,
        Sport::NCAAF,
        Sport::NBA,
        Sport::NCAAB,
        Sport::NHL,
        Sport::MLB,
        Sport::MLS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::NFL => "NFL",
            Sport::NCAAF => "NCAAF",
            Sport::NBA => "NBA",
            Sport::NCAAB => "NCAAB",
            Sport::NHL => "NHL",
            Sport::MLB => "MLB",
            Sport::MLS => "MLS",
        }
    }

    /// Lowercase code used for file names and env var prefixes
    pub fn code(&self) -> &'static str {
        match self {
            Sport::NFL => "nfl",
            Sport::NCAAF => "ncaaf",
            Sport::NBA => "nba",
            Sport::NCAAB => "ncaab",
            Sport::NHL => "nhl",
            Sport::MLB => "mlb",
            Sport::MLS => "mls",
        }
    }

    /// Whether games are normally played outdoors (weather matters)
    pub fn plays_outdoors(&self) -> bool {
        matches!(self, Sport::NFL | Sport::NCAAF | Sport::MLB | Sport::MLS)
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        Sport::ALL
            .iter()
            .copied()
            .find(|sport| sport.code() == code)
            .ok_or_else(|| format!("unknown sport: {}", s))
    }
}

// ============================================================================
// Teams
// ============================================================================

/// A team's strength rating and rolling scoring form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: String,
    pub name: String,
    pub abbreviation: String,
    pub rating: f64,
    /// Rolling points scored per game
    pub points_for_avg: f64,
    /// Rolling points allowed per game
    pub points_against_avg: f64,
    #[serde(default)]
    pub games_played: u32,
    #[serde(default)]
    pub last_season: Option<u16>,
}

impl Team {
    /// New team at the league baseline rating with league-average scoring
    pub fn new(team_id: &str, name: &str, abbreviation: &str, baseline: f64, avg_points: f64) -> Self {
        Self {
            team_id: team_id.to_string(),
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            rating: baseline,
            points_for_avg: avg_points,
            points_against_avg: avg_points,
            games_played: 0,
            last_season: None,
        }
    }

    /// Frozen view used in prediction records
    pub fn snapshot(&self) -> TeamSnapshot {
        TeamSnapshot {
            team_id: self.team_id.clone(),
            rating: self.rating,
            points_for_avg: self.points_for_avg,
            points_against_avg: self.points_against_avg,
        }
    }
}

/// A team's rating and scoring form at the moment a prediction was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub team_id: String,
    pub rating: f64,
    pub points_for_avg: f64,
    pub points_against_avg: f64,
}

// ============================================================================
// Games
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub home: u16,
    pub away: u16,
}

impl FinalScore {
    /// Away minus home, the convention every spread in this crate uses
    pub fn spread(&self) -> f64 {
        self.away as f64 - self.home as f64
    }

    pub fn total(&self) -> f64 {
        self.home as f64 + self.away as f64
    }

    pub fn home_won(&self) -> bool {
        self.home > self.away
    }

    pub fn away_won(&self) -> bool {
        self.away > self.home
    }
}

/// A scheduled or completed game as delivered by the schedule feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub game_id: String,
    pub sport: Sport,
    #[serde(default)]
    pub season: Option<u16>,
    pub scheduled_at: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_name: Option<String>,
    #[serde(default)]
    pub away_name: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    pub status: GameStatus,
    #[serde(default)]
    pub final_score: Option<FinalScore>,
    #[serde(default)]
    pub situation: SituationalContext,
}

impl Game {
    pub fn is_final(&self) -> bool {
        self.status == GameStatus::Final
    }
}

// ============================================================================
// Situational context
// ============================================================================

/// Pre-game context the situational adjusters read. Everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SituationalContext {
    #[serde(default)]
    pub home_rest_days: Option<u32>,
    #[serde(default)]
    pub away_rest_days: Option<u32>,
    #[serde(default)]
    pub indoor: Option<bool>,
    #[serde(default)]
    pub weather: Option<Weather>,
    #[serde(default)]
    pub injuries: Vec<InjuryReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature_f: f64,
    pub wind_mph: f64,
    #[serde(default)]
    pub precipitation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
}

/// A missing player and the points per game the team loses without them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjuryReport {
    pub side: TeamSide,
    pub player: String,
    /// Expected points lost per game while out
    pub point_impact: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_round_trips_through_code() {
        for sport in Sport::ALL {
            assert_eq!(sport.code().parse::<Sport>().unwrap(), sport);
        }
        assert_eq!(" NHL ".parse::<Sport>().unwrap(), Sport::NHL);
        assert!("cricket".parse::<Sport>().is_err());
    }

    #[test]
    fn test_sport_serialization() {
        let json = serde_json::to_string(&Sport::NCAAB).unwrap();
        assert_eq!(json, "\"NCAAB\"");
    }

    #[test]
    fn test_final_score_spread_is_away_minus_home() {
        let score = FinalScore { home: 27, away: 20 };
        assert_eq!(score.spread(), -7.0);
        assert_eq!(score.total(), 47.0);
        assert!(score.home_won());
        assert!(!score.away_won());
    }

    #[test]
    fn test_game_deserializes_without_optional_fields() {
        let json = r#"{
            "game_id": "g1",
            "sport": "NFL",
            "scheduled_at": "2024-09-08T17:00:00Z",
            "home_team": "KC",
            "away_team": "BAL",
            "status": "scheduled"
        }"#;
        let game: Game = serde_json::from_str(json).unwrap();
        assert!(!game.is_final());
        assert!(game.final_score.is_none());
        assert_eq!(game.situation, SituationalContext::default());
    }
}
