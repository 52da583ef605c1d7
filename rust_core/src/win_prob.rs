//! Pre-game win probability from team ratings.
//!
//! Ratings live on the Elo scale, so the home side's chance of winning is the
//! Elo expected score with a fixed home bonus folded into the home rating:
//!
//! `p = 1 / (1 + 10^((away - (home + bonus)) / 400))`
//!
//! The result is strictly increasing in the home rating and always inside
//! (0, 1) for finite inputs.

/// Rating points per factor-of-ten change in odds
const ELO_SCALE: f64 = 400.0;

/// Keeps probabilities off the 0/1 boundary for absurd rating gaps
const PROB_FLOOR: f64 = 1e-9;

/// Elo expected score of side A against side B
#[inline]
pub fn elo_expected(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / ELO_SCALE))
}

/// Probability the home side wins, with the home bonus folded into its rating.
pub fn home_win_probability(home_rating: f64, away_rating: f64, home_rating_bonus: f64) -> f64 {
    elo_expected(home_rating + home_rating_bonus, away_rating).clamp(PROB_FLOOR, 1.0 - PROB_FLOOR)
}
