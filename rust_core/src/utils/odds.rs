//! American odds and bet settlement in units.
//!
//! # Design
//!
//! - A unit is the amount risked on one bet
//! - Results are accumulated as `Units`, stored as integer hundredths, so a
//!   season of settlements never drifts the way repeated f64 sums do
//! - Prices missing from a market line settle at the standard -110
//!
//! # Usage
//!
//! ```rust
//! use edgecast_rust_core::utils::odds::{settle, Units, DEFAULT_PRICE};
//! use edgecast_rust_core::grading::Verdict;
//!
//! let mut roi = Units::zero();
//! roi += settle(Verdict::Win, DEFAULT_PRICE);
//! roi += settle(Verdict::Loss, DEFAULT_PRICE);
//! assert_eq!(roi.hundredths(), -9);
//! ```

use crate::grading::Verdict;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Standard price on spreads and totals
pub const DEFAULT_PRICE: i32 = -110;

/// Betting result in units, stored as hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Units {
    hundredths: i64,
}

impl Units {
    #[inline]
    pub const fn zero() -> Self {
        Self { hundredths: 0 }
    }

    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self { hundredths }
    }

    /// Rounds to the nearest hundredth
    #[inline]
    pub fn from_units(units: f64) -> Self {
        Self {
            hundredths: (units * 100.0).round() as i64,
        }
    }

    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.hundredths
    }

    #[inline]
    pub fn as_units(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }
}

impl Add for Units {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            hundredths: self.hundredths + other.hundredths,
        }
    }
}

impl Sub for Units {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            hundredths: self.hundredths - other.hundredths,
        }
    }
}

impl AddAssign for Units {
    fn add_assign(&mut self, other: Self) {
        self.hundredths += other.hundredths;
    }
}

impl SubAssign for Units {
    fn sub_assign(&mut self, other: Self) {
        self.hundredths -= other.hundredths;
    }
}

impl Neg for Units {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            hundredths: -self.hundredths,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.2}u", self.as_units())
    }
}

/// True for prices a book could actually quote (|price| >= 100)
pub fn is_valid_price(price: i32) -> bool {
    price.unsigned_abs() >= 100
}

/// Profit on a one-unit stake if the bet wins.
///
/// Invalid prices fall back to `DEFAULT_PRICE`.
pub fn profit_per_unit(price: i32) -> f64 {
    let price = if is_valid_price(price) { price } else { DEFAULT_PRICE };
    if price > 0 {
        price as f64 / 100.0
    } else {
        100.0 / price.unsigned_abs() as f64
    }
}

/// Implied probability of a price, vig included
pub fn implied_probability(price: i32) -> Option<f64> {
    if !is_valid_price(price) {
        return None;
    }
    Some(if price > 0 {
        100.0 / (price as f64 + 100.0)
    } else {
        let risk = price.unsigned_abs() as f64;
        risk / (risk + 100.0)
    })
}

/// Units won or lost by a one-unit bet
pub fn settle(verdict: Verdict, price: i32) -> Units {
    match verdict {
        Verdict::Win => Units::from_units(profit_per_unit(price)),
        Verdict::Loss => Units::from_units(-1.0),
        Verdict::Push => Units::zero(),
    }
}

/// Return on investment as a fraction of units risked
pub fn roi(net: Units, bets: u32) -> f64 {
    if bets == 0 {
        0.0
    } else {
        net.as_units() / bets as f64
    }
}
