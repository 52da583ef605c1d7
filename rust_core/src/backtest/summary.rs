//! Running win/loss/push totals, maintained incrementally.
//!
//! `record` and `retract` are exact inverses, so a backfilled result can be
//! swapped in without rebuilding the summary from scratch.

use super::result::BacktestResult;
use crate::conviction::ConvictionTier;
use crate::grading::{MarketGrade, Pick, Verdict};
use crate::models::{MarketKind, MarketLine};
use crate::utils::odds::{roi, settle, Units, DEFAULT_PRICE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Win/loss/push counts and net units for one market
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTally {
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub net_units: Units,
}

impl MarketTally {
    pub fn record(&mut self, verdict: Verdict, price: i32) {
        match verdict {
            Verdict::Win => self.wins += 1,
            Verdict::Loss => self.losses += 1,
            Verdict::Push => self.pushes += 1,
        }
        self.net_units += settle(verdict, price);
    }

    pub fn retract(&mut self, verdict: Verdict, price: i32) {
        match verdict {
            Verdict::Win => self.wins = self.wins.saturating_sub(1),
            Verdict::Loss => self.losses = self.losses.saturating_sub(1),
            Verdict::Push => self.pushes = self.pushes.saturating_sub(1),
        }
        self.net_units -= settle(verdict, price);
    }

    /// Every bet with a verdict, pushes included
    pub fn graded(&self) -> u32 {
        self.wins + self.losses + self.pushes
    }

    /// Wins over decided bets; pushes are left out
    pub fn win_pct(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided > 0 {
            self.wins as f64 / decided as f64
        } else {
            0.0
        }
    }

    /// Net units per unit risked
    pub fn roi(&self) -> f64 {
        roi(self.net_units, self.graded())
    }
}

/// American price a bet settles at: the captured price when there is one.
pub fn settlement_price(line: &MarketLine, grade: &MarketGrade) -> i32 {
    let price = match (grade.market, grade.pick) {
        (MarketKind::Spread, _) => line.spread_price,
        (MarketKind::Total, _) => line.total_price,
        (MarketKind::Moneyline, Pick::Home) => line.home_moneyline,
        (MarketKind::Moneyline, _) => line.away_moneyline,
    };
    price.unwrap_or(DEFAULT_PRICE)
}

/// Whether a pick clears the minimum edge. Moneyline edges are in
/// probability, not points, so the point floor does not apply to them.
pub fn counts_as_bet(grade: &MarketGrade, min_edge: f64) -> bool {
    match grade.market {
        MarketKind::Moneyline => true,
        MarketKind::Spread | MarketKind::Total => grade.edge >= min_edge,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// Point-edge floor applied when counting spread and total bets
    #[serde(default)]
    pub min_edge: f64,
    pub games_processed: u32,
    /// Games with a market line
    pub games_graded: u32,
    pub spread: MarketTally,
    pub moneyline: MarketTally,
    pub total: MarketTally,
    /// Spread results per conviction tier
    #[serde(default)]
    pub by_tier: BTreeMap<ConvictionTier, MarketTally>,
}

impl BacktestSummary {
    pub fn new(min_edge: f64) -> Self {
        Self {
            min_edge,
            ..Default::default()
        }
    }

    pub fn tally(&self, market: MarketKind) -> &MarketTally {
        match market {
            MarketKind::Spread => &self.spread,
            MarketKind::Moneyline => &self.moneyline,
            MarketKind::Total => &self.total,
        }
    }

    fn tally_mut(&mut self, market: MarketKind) -> &mut MarketTally {
        match market {
            MarketKind::Spread => &mut self.spread,
            MarketKind::Moneyline => &mut self.moneyline,
            MarketKind::Total => &mut self.total,
        }
    }

    pub fn record(&mut self, result: &BacktestResult) {
        self.games_processed += 1;
        self.apply(result, false);
    }

    pub fn retract(&mut self, result: &BacktestResult) {
        self.games_processed = self.games_processed.saturating_sub(1);
        self.apply(result, true);
    }

    fn apply(&mut self, result: &BacktestResult, undo: bool) {
        let Some(line) = &result.market_line else {
            return;
        };
        if undo {
            self.games_graded = self.games_graded.saturating_sub(1);
        } else {
            self.games_graded += 1;
        }

        let tier = result.tier();
        for grade in result.grades.iter() {
            let Some(verdict) = grade.verdict else {
                continue;
            };
            if !counts_as_bet(grade, self.min_edge) {
                continue;
            }
            let price = settlement_price(line, grade);
            let tally = self.tally_mut(grade.market);
            if undo {
                tally.retract(verdict, price);
            } else {
                tally.record(verdict, price);
            }
            if grade.market == MarketKind::Spread {
                let by_tier = self.by_tier.entry(tier).or_default();
                if undo {
                    by_tier.retract(verdict, price);
                    if by_tier.graded() == 0 {
                        self.by_tier.remove(&tier);
                    }
                } else {
                    by_tier.record(verdict, price);
                }
            }
        }
    }

    /// Recompute from scratch
    pub fn rebuild(min_edge: f64, results: &[BacktestResult]) -> Self {
        let mut summary = Self::new(min_edge);
        for result in results {
            summary.record(result);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conviction::ConvictionScorer;
    use crate::deriver::DerivedLine;
    use crate::forecast::PredictionRecord;
    use crate::models::{FinalScore, Sport, TeamSnapshot};
    use crate::predictor::ProjectedScore;
    use chrono::Utc;

    fn snapshot(id: &str, rating: f64) -> TeamSnapshot {
        TeamSnapshot {
            team_id: id.to_string(),
            rating,
            points_for_avg: 22.0,
            points_against_avg: 22.0,
        }
    }

    fn record(game_id: &str, spread: f64, total: f64) -> PredictionRecord {
        PredictionRecord {
            game_id: game_id.to_string(),
            sport: Sport::NFL,
            model_version: "v1".to_string(),
            scheduled_at: Utc::now(),
            home: snapshot("KC", 1600.0),
            away: snapshot("BAL", 1500.0),
            projected: ProjectedScore { home: 25.0, away: 20.0 },
            derived: DerivedLine {
                spread,
                total,
                home_win_prob: 0.64,
            },
            adjustments: Vec::new(),
            predicted_at: Utc::now(),
        }
    }

    fn result(game_id: &str, line_spread: Option<f64>, score: FinalScore) -> BacktestResult {
        let line = line_spread.map(|s| MarketLine::new(game_id, s, 44.0, Utc::now()));
        BacktestResult::grade(record(game_id, -5.0, 45.0), score, line, &ConvictionScorer::default())
    }

    #[test]
    fn test_tally_win_pct_ignores_pushes() {
        let mut tally = MarketTally::default();
        tally.record(Verdict::Win, -110);
        tally.record(Verdict::Loss, -110);
        tally.record(Verdict::Push, -110);
        assert_eq!(tally.graded(), 3);
        assert_eq!(tally.win_pct(), 0.5);
        assert_eq!(tally.net_units.hundredths(), -9);
    }

    #[test]
    fn test_ungraded_game_counts_as_processed_only() {
        let mut summary = BacktestSummary::default();
        summary.record(&result("g1", None, FinalScore { home: 27, away: 20 }));
        assert_eq!(summary.games_processed, 1);
        assert_eq!(summary.games_graded, 0);
        assert_eq!(summary.spread.graded(), 0);
    }

    #[test]
    fn test_record_then_retract_restores_summary() {
        let mut summary = BacktestSummary::default();
        let first = result("g1", Some(-3.0), FinalScore { home: 27, away: 20 });
        summary.record(&first);
        let before = summary.clone();

        let second = result("g2", Some(-3.0), FinalScore { home: 20, away: 23 });
        summary.record(&second);
        summary.retract(&second);
        assert_eq!(summary, before);
        assert_eq!(summary.spread.wins, 1);
        assert_eq!(summary.moneyline.wins, 1);
    }

    #[test]
    fn test_rebuild_matches_incremental() {
        let results = vec![
            result("g1", Some(-3.0), FinalScore { home: 27, away: 20 }),
            result("g2", Some(-3.0), FinalScore { home: 23, away: 20 }),
            result("g3", None, FinalScore { home: 10, away: 20 }),
        ];
        let mut incremental = BacktestSummary::default();
        for r in &results {
            incremental.record(r);
        }
        assert_eq!(BacktestSummary::rebuild(0.0, &results), incremental);
        // -3 line, home by 3: push
        assert_eq!(incremental.spread.pushes, 1);
        let tiers: u32 = incremental.by_tier.values().map(|t| t.graded()).sum();
        assert_eq!(tiers, incremental.spread.graded());
    }

    #[test]
    fn test_min_edge_filters_point_markets_only() {
        // Spread edge 2 points, total edge 1 point
        let r = result("g1", Some(-3.0), FinalScore { home: 27, away: 20 });
        let summary = BacktestSummary::rebuild(5.0, &[r]);
        assert_eq!(summary.spread.graded(), 0);
        assert_eq!(summary.total.graded(), 0);
        assert_eq!(summary.moneyline.graded(), 1);
    }

    #[test]
    fn test_settlement_uses_captured_price() {
        let mut line = MarketLine::new("g1", -3.0, 44.0, Utc::now());
        line.home_moneyline = Some(-180);
        let grade = MarketGrade {
            market: MarketKind::Moneyline,
            pick: Pick::Home,
            edge: 0.05,
            verdict: Some(Verdict::Win),
        };
        assert_eq!(settlement_price(&line, &grade), -180);
        let away = MarketGrade { pick: Pick::Away, ..grade };
        assert_eq!(settlement_price(&line, &away), DEFAULT_PRICE);
    }
}
