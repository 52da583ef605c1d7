//! Per-game pipeline: ratings → projection → adjustments → derived line →
//! grades → conviction.

use crate::adjusters::{AdjusterChain, AdjusterInput, Adjustment};
use crate::conviction::{ConvictionAssessment, ConvictionInput, ConvictionScorer};
use crate::deriver::{derive_line, DerivedLine};
use crate::error::{ForecastError, Result};
use crate::grading::{grade_line, GradeSheet, Pick};
use crate::league_config::LeagueConfig;
use crate::models::{FinalScore, Game, MarketLine, Sport, TeamSnapshot};
use crate::predictor::{project_score, MatchupInputs, ModelParams, ProjectedScore};
use crate::ratings::RatingStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A forecast frozen at prediction time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub game_id: String,
    pub sport: Sport,
    pub model_version: String,
    pub scheduled_at: DateTime<Utc>,
    pub home: TeamSnapshot,
    pub away: TeamSnapshot,
    pub projected: ProjectedScore,
    pub derived: DerivedLine,
    /// Unweighted situational breakdown
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    pub predicted_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn rating_gap(&self) -> f64 {
        self.home.rating - self.away.rating
    }
}

/// Grades and conviction for a prediction against one market line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineEvaluation {
    pub grades: GradeSheet,
    pub conviction: Option<ConvictionAssessment>,
}

/// Projected score and derived line from two frozen team snapshots.
pub fn project_matchup(
    league: &LeagueConfig,
    params: &ModelParams,
    home: &TeamSnapshot,
    away: &TeamSnapshot,
    adjustments: &[Adjustment],
) -> (ProjectedScore, DerivedLine) {
    let inputs = MatchupInputs::from_snapshots(home, away, league.league_avg_total);
    let projected = project_score(&inputs, params, adjustments);
    let derived = derive_line(&projected, home.rating, away.rating, league.home_rating_bonus, params);
    (projected, derived)
}

pub struct Forecaster {
    league: &'static LeagueConfig,
    params: ModelParams,
    adjusters: AdjusterChain,
}

impl Forecaster {
    pub fn new(league: &'static LeagueConfig, params: ModelParams, adjusters: AdjusterChain) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            league,
            params,
            adjusters,
        })
    }

    pub fn league(&self) -> &'static LeagueConfig {
        self.league
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Predict a game from the current ratings. Both teams must be in the store.
    pub fn predict(&self, store: &RatingStore, game: &Game, model_version: &str) -> Result<PredictionRecord> {
        if game.sport != self.league.sport {
            return Err(ForecastError::SportMismatch {
                expected: self.league.sport,
                found: game.sport,
            });
        }
        let home = store
            .get(&game.home_team)
            .ok_or_else(|| ForecastError::UnknownTeam(game.home_team.clone()))?
            .snapshot();
        let away = store
            .get(&game.away_team)
            .ok_or_else(|| ForecastError::UnknownTeam(game.away_team.clone()))?
            .snapshot();

        let adjustments = self.adjusters.adjustments(&AdjusterInput {
            sport: game.sport,
            situation: &game.situation,
            league_avg_total: self.league.league_avg_total,
        });
        let (projected, derived) = project_matchup(self.league, &self.params, &home, &away, &adjustments);

        Ok(PredictionRecord {
            game_id: game.game_id.clone(),
            sport: game.sport,
            model_version: model_version.to_string(),
            scheduled_at: game.scheduled_at,
            home,
            away,
            projected,
            derived,
            adjustments,
            predicted_at: Utc::now(),
        })
    }
}

/// Grade a stored prediction against a line and score the spread pick.
///
/// Reads only the record, so regrading after a line backfill gives the same
/// answer the original run would have with that line.
pub fn evaluate_line(
    record: &PredictionRecord,
    line: &MarketLine,
    score: Option<FinalScore>,
    scorer: &ConvictionScorer,
) -> LineEvaluation {
    let grades = grade_line(&record.derived, line, score);
    let conviction = grades.spread.map(|spread| {
        let (picked_team, rating_gap, picked_home) = match spread.pick {
            Pick::Home => (record.home.team_id.as_str(), record.rating_gap(), true),
            _ => (record.away.team_id.as_str(), -record.rating_gap(), false),
        };
        scorer.score(
            record.sport,
            &ConvictionInput {
                picked_team,
                edge: spread.edge,
                rating_gap,
                picked_market_favorite: line.home_is_favorite() == picked_home,
            },
        )
    });
    LineEvaluation { grades, conviction }
}
