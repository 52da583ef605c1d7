//! Market lines and the three graded markets.
//!
//! Spreads are home-relative in the usual sportsbook quoting: `-3.0` means the
//! home side is favored by three. Because a realized spread is expressed the
//! same way (away score minus home score), a line and a result can be compared
//! directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The markets a prediction is graded against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    Spread,
    Moneyline,
    Total,
}

impl MarketKind {
    pub const ALL: [MarketKind; 3] = [MarketKind::Spread, MarketKind::Moneyline, MarketKind::Total];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spread => "spread",
            Self::Moneyline => "moneyline",
            Self::Total => "total",
        }
    }

    /// Whether a tie against the line refunds the bet
    pub fn allows_push(&self) -> bool {
        !matches!(self, Self::Moneyline)
    }
}

/// When in the betting window a line was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineVariant {
    Opening,
    #[default]
    Closing,
}

/// A captured market line for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketLine {
    pub game_id: String,
    /// Home-relative spread (negative = home favored)
    pub spread: f64,
    pub total: f64,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub variant: LineVariant,
    /// American price on either side of the spread (defaults to -110)
    #[serde(default)]
    pub spread_price: Option<i32>,
    /// American price on either side of the total (defaults to -110)
    #[serde(default)]
    pub total_price: Option<i32>,
    #[serde(default)]
    pub home_moneyline: Option<i32>,
    #[serde(default)]
    pub away_moneyline: Option<i32>,
}

impl MarketLine {
    pub fn new(game_id: &str, spread: f64, total: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            game_id: game_id.to_string(),
            spread,
            total,
            captured_at,
            variant: LineVariant::Closing,
            spread_price: None,
            total_price: None,
            home_moneyline: None,
            away_moneyline: None,
        }
    }

    /// True when the market makes the home side the favorite
    pub fn home_is_favorite(&self) -> bool {
        match (self.home_moneyline, self.away_moneyline) {
            (Some(home), Some(away)) if home != away => home < away,
            _ => self.spread < 0.0,
        }
    }

    /// Both numbers must be finite for the line to be gradable
    pub fn is_valid(&self) -> bool {
        self.spread.is_finite() && self.total.is_finite() && self.total >= 0.0
    }
}

/// Pick the line to grade against: closing beats opening, later capture beats earlier.
pub fn select_grading_line(lines: &[MarketLine]) -> Option<&MarketLine> {
    lines
        .iter()
        .filter(|line| line.is_valid())
        .max_by(|a, b| {
            let rank = |l: &MarketLine| matches!(l.variant, LineVariant::Closing) as u8;
            rank(a)
                .cmp(&rank(b))
                .then_with(|| a.captured_at.cmp(&b.captured_at))
        })
}
