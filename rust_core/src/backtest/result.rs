use crate::conviction::{ConvictionAssessment, ConvictionScorer, ConvictionTier};
use crate::forecast::{evaluate_line, PredictionRecord};
use crate::grading::{GradeSheet, MarketGrade, Verdict};
use crate::models::{FinalScore, MarketKind, MarketLine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed game's prediction, realized result and grades. Keyed by game id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub game_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub prediction: PredictionRecord,
    pub final_score: FinalScore,
    /// Away minus home
    pub actual_spread: f64,
    pub actual_total: f64,
    /// None when no usable line was captured; the game is then ungraded
    #[serde(default)]
    pub market_line: Option<MarketLine>,
    #[serde(default)]
    pub grades: GradeSheet,
    #[serde(default)]
    pub conviction: Option<ConvictionAssessment>,
    pub graded_at: DateTime<Utc>,
}

impl BacktestResult {
    /// Build from a frozen prediction. Grading reads nothing but its arguments.
    pub fn grade(
        prediction: PredictionRecord,
        score: FinalScore,
        line: Option<MarketLine>,
        scorer: &ConvictionScorer,
    ) -> Self {
        let (grades, conviction) = match &line {
            Some(line) => {
                let eval = evaluate_line(&prediction, line, Some(score), scorer);
                (eval.grades, eval.conviction)
            }
            None => (GradeSheet::default(), None),
        };
        Self {
            game_id: prediction.game_id.clone(),
            scheduled_at: prediction.scheduled_at,
            prediction,
            final_score: score,
            actual_spread: score.spread(),
            actual_total: score.total(),
            market_line: line,
            grades,
            conviction,
            graded_at: Utc::now(),
        }
    }

    /// Same prediction and score against a replacement line.
    pub fn regrade(&self, line: MarketLine, scorer: &ConvictionScorer) -> Self {
        Self::grade(self.prediction.clone(), self.final_score, Some(line), scorer)
    }

    pub fn is_graded(&self) -> bool {
        self.market_line.is_some()
    }

    pub fn grade_for(&self, market: MarketKind) -> Option<&MarketGrade> {
        self.grades.get(market)
    }

    pub fn verdict(&self, market: MarketKind) -> Option<Verdict> {
        self.grade_for(market)?.verdict
    }

    /// Avoid when there was no spread bet to score
    pub fn tier(&self) -> ConvictionTier {
        self.conviction
            .as_ref()
            .map(|c| c.tier)
            .unwrap_or(ConvictionTier::Avoid)
    }
}

/// Graded results whose spread pick scored high or elite
pub fn best_bets(results: &[BacktestResult]) -> Vec<&BacktestResult> {
    results
        .iter()
        .filter(|r| r.is_graded() && r.tier().is_best_bet())
        .collect()
}
