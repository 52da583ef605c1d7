//! Grading engine: picks and win/loss/push verdicts for spread, moneyline
//! and total markets.
//!
//! Every spread here is "away minus home": a market spread of -3 means home
//! is favored by three, and a realized spread of -7 means home won by seven.
//! Home covers when the realized spread is below the market spread; the two
//! being equal is a push no matter which side was picked.
//!
//! All functions are pure in (predicted, market, actual).

use crate::deriver::DerivedLine;
use crate::models::{FinalScore, MarketKind, MarketLine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal state of a graded bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Win,
    Loss,
    Push,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Win => "win",
            Verdict::Loss => "loss",
            Verdict::Push => "push",
        })
    }
}

/// The side of a market the model takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pick {
    Home,
    Away,
    Over,
    Under,
}

// ============================================================================
// Spread
// ============================================================================

/// Home if the model likes home more than the market does, away if less.
/// Agreement with the market is no bet.
pub fn spread_pick(predicted_spread: f64, market_spread: f64) -> Option<Pick> {
    if predicted_spread < market_spread {
        Some(Pick::Home)
    } else if predicted_spread > market_spread {
        Some(Pick::Away)
    } else {
        None
    }
}

/// Grade a side pick against the market spread.
pub fn grade_spread(pick: Pick, market_spread: f64, actual_spread: f64) -> Verdict {
    if actual_spread == market_spread {
        return Verdict::Push;
    }
    let home_covered = actual_spread < market_spread;
    match (pick, home_covered) {
        (Pick::Home, true) | (Pick::Away, false) => Verdict::Win,
        _ => Verdict::Loss,
    }
}

// ============================================================================
// Moneyline
// ============================================================================

pub fn moneyline_pick(home_win_prob: f64) -> Pick {
    if home_win_prob > 0.5 {
        Pick::Home
    } else {
        Pick::Away
    }
}

/// Win only if the picked side won outright. A draw loses.
pub fn grade_moneyline(pick: Pick, score: FinalScore) -> Verdict {
    let won = match pick {
        Pick::Home => score.home_won(),
        Pick::Away => score.away_won(),
        Pick::Over | Pick::Under => false,
    };
    if won {
        Verdict::Win
    } else {
        Verdict::Loss
    }
}

// ============================================================================
// Total
// ============================================================================

pub fn total_pick(predicted_total: f64, market_total: f64) -> Pick {
    if predicted_total > market_total {
        Pick::Over
    } else {
        Pick::Under
    }
}

pub fn grade_total(pick: Pick, market_total: f64, actual_total: f64) -> Verdict {
    if actual_total == market_total {
        return Verdict::Push;
    }
    let went_over = actual_total > market_total;
    match (pick, went_over) {
        (Pick::Over, true) | (Pick::Under, false) => Verdict::Win,
        _ => Verdict::Loss,
    }
}

// ============================================================================
// Grade sheet
// ============================================================================

/// One market's pick, edge and (once the game is final) verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketGrade {
    pub market: MarketKind,
    pub pick: Pick,
    /// Points for spread and total; probability for moneyline
    pub edge: f64,
    pub verdict: Option<Verdict>,
}

/// Picks and verdicts for all three markets of one game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeSheet {
    pub spread: Option<MarketGrade>,
    pub moneyline: Option<MarketGrade>,
    pub total: Option<MarketGrade>,
}

impl GradeSheet {
    pub fn get(&self, market: MarketKind) -> Option<&MarketGrade> {
        match market {
            MarketKind::Spread => self.spread.as_ref(),
            MarketKind::Moneyline => self.moneyline.as_ref(),
            MarketKind::Total => self.total.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketGrade> {
        [&self.spread, &self.moneyline, &self.total]
            .into_iter()
            .flatten()
    }
}

/// Picks for every market against a line; verdicts filled when `score` is known.
pub fn grade_line(derived: &DerivedLine, line: &MarketLine, score: Option<FinalScore>) -> GradeSheet {
    let spread = spread_pick(derived.spread, line.spread).map(|pick| MarketGrade {
        market: MarketKind::Spread,
        pick,
        edge: (derived.spread - line.spread).abs(),
        verdict: score.map(|s| grade_spread(pick, line.spread, s.spread())),
    });

    let ml_pick = moneyline_pick(derived.home_win_prob);
    let picked_prob = match ml_pick {
        Pick::Home => derived.home_win_prob,
        _ => 1.0 - derived.home_win_prob,
    };
    let market_prob = market_side_probability(line, ml_pick).unwrap_or(0.5);
    let moneyline = Some(MarketGrade {
        market: MarketKind::Moneyline,
        pick: ml_pick,
        edge: picked_prob - market_prob,
        verdict: score.map(|s| grade_moneyline(ml_pick, s)),
    });

    let pick = total_pick(derived.total, line.total);
    let total = Some(MarketGrade {
        market: MarketKind::Total,
        pick,
        edge: (derived.total - line.total).abs(),
        verdict: score.map(|s| grade_total(pick, line.total, s.total())),
    });

    GradeSheet {
        spread,
        moneyline,
        total,
    }
}

/// No-vig market probability for a moneyline side, when both prices are known
fn market_side_probability(line: &MarketLine, pick: Pick) -> Option<f64> {
    let home = crate::utils::odds::implied_probability(line.home_moneyline?)?;
    let away = crate::utils::odds::implied_probability(line.away_moneyline?)?;
    let home_fair = home / (home + away);
    Some(match pick {
        Pick::Home => home_fair,
        _ => 1.0 - home_fair,
    })
}
