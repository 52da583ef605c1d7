//! Team rating store and Elo updater.
//!
//! This module provides:
//! - `RatingStore`: every team's current rating and rolling scoring form
//! - `RatingUpdater`: zero-sum Elo updates with a margin-of-victory multiplier
//! - Season carry-over regression toward the league baseline
//!
//! Ratings are strictly sequential: a game must be applied after its score is
//! known and before it is used to predict any later game for either team.

use crate::error::{ForecastError, Result};
use crate::league_config::LeagueConfig;
use crate::models::{FinalScore, Game, Team};
use crate::win_prob::elo_expected;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// RatingStore
// ============================================================================

/// Current team ratings for one sport. Passed explicitly, never global.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingStore {
    teams: FxHashMap<String, Team>,
}

impl RatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted team list.
    pub fn from_teams(teams: Vec<Team>) -> Self {
        let teams = teams
            .into_iter()
            .map(|team| (team.team_id.clone(), team))
            .collect();
        Self { teams }
    }

    /// Teams sorted by id, for deterministic persistence.
    pub fn to_teams(&self) -> Vec<Team> {
        let mut teams: Vec<Team> = self.teams.values().cloned().collect();
        teams.sort_by(|a, b| a.team_id.cmp(&b.team_id));
        teams
    }

    pub fn get(&self, team_id: &str) -> Option<&Team> {
        self.teams.get(team_id)
    }

    pub fn rating(&self, team_id: &str) -> Option<f64> {
        self.teams.get(team_id).map(|t| t.rating)
    }

    pub fn insert(&mut self, team: Team) {
        self.teams.insert(team.team_id.clone(), team);
    }

    /// Get a team, creating it at the league baseline if unseen.
    pub fn ensure(&mut self, team_id: &str, name: Option<&str>, league: &LeagueConfig) -> &mut Team {
        self.teams.entry(team_id.to_string()).or_insert_with(|| {
            Team::new(
                team_id,
                name.unwrap_or(team_id),
                team_id,
                league.baseline_rating,
                league.avg_team_points(),
            )
        })
    }

    /// Make sure both sides of a game exist.
    pub fn ensure_game_teams(&mut self, game: &Game, league: &LeagueConfig) {
        self.ensure(&game.home_team, game.home_name.as_deref(), league);
        self.ensure(&game.away_team, game.away_name.as_deref(), league);
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Sum of all ratings; constant under zero-sum updates.
    pub fn rating_sum(&self) -> f64 {
        self.teams.values().map(|t| t.rating).sum()
    }
}

// ============================================================================
// RatingUpdater
// ============================================================================

/// Elo parameters for one league.
#[derive(Debug, Clone, Copy)]
pub struct RatingConfig {
    pub k_factor: f64,
    pub home_rating_bonus: f64,
    pub use_margin_of_victory: bool,
    pub baseline_rating: f64,
    pub season_carryover: f64,
}

impl From<&LeagueConfig> for RatingConfig {
    fn from(league: &LeagueConfig) -> Self {
        Self {
            k_factor: league.k_factor,
            home_rating_bonus: league.home_rating_bonus,
            use_margin_of_victory: league.use_margin_of_victory,
            baseline_rating: league.baseline_rating,
            season_carryover: league.season_carryover,
        }
    }
}

/// Rating changes produced by one game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingChange {
    pub home_before: f64,
    pub away_before: f64,
    pub home_after: f64,
    pub away_after: f64,
}

impl RatingChange {
    pub fn home_delta(&self) -> f64 {
        self.home_after - self.home_before
    }

    pub fn away_delta(&self) -> f64 {
        self.away_after - self.away_before
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RatingUpdater {
    config: RatingConfig,
}

impl RatingUpdater {
    pub fn new(config: RatingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Margin-of-victory multiplier, damped when the favorite wins big.
    pub fn mov_multiplier(&self, winner_elo_diff: f64, margin: Option<f64>) -> f64 {
        match margin {
            Some(m) if self.config.use_margin_of_victory => {
                (m.abs() + 1.0).ln() * 2.2 / (winner_elo_diff * 0.001 + 2.2).max(0.5)
            }
            _ => 1.0,
        }
    }

    /// Zero-sum update for a decided game.
    ///
    /// Returns `(new_winner, new_loser)`. The winner's gain always equals the
    /// loser's loss.
    pub fn update(&self, winner_rating: f64, loser_rating: f64, margin: Option<f64>) -> (f64, f64) {
        self.update_with_bonus(winner_rating, loser_rating, 0.0, margin)
    }

    /// Like [`update`](Self::update) but with a rating bonus folded into the
    /// winner's expectation (negative when the loser was at home). The bonus
    /// only shapes the expected score; the deltas stay zero-sum.
    fn update_with_bonus(
        &self,
        winner_rating: f64,
        loser_rating: f64,
        winner_bonus: f64,
        margin: Option<f64>,
    ) -> (f64, f64) {
        let effective_winner = winner_rating + winner_bonus;
        let expected = elo_expected(effective_winner, loser_rating);
        let multiplier = self.mov_multiplier(effective_winner - loser_rating, margin);
        let delta = self.config.k_factor * multiplier * (1.0 - expected);
        (winner_rating + delta, loser_rating - delta)
    }

    /// Zero-sum update for a drawn game.
    fn update_draw(&self, home_rating: f64, away_rating: f64) -> (f64, f64) {
        let expected_home = elo_expected(home_rating + self.config.home_rating_bonus, away_rating);
        let delta = self.config.k_factor * (0.5 - expected_home);
        (home_rating + delta, away_rating - delta)
    }

    /// Regress a rating toward baseline at a season boundary.
    pub fn carry_over(&self, rating: f64) -> f64 {
        rating + (self.config.baseline_rating - rating) * self.config.season_carryover
    }

    /// Apply a completed game to the store: season carry-over, Elo update,
    /// rolling scoring averages. Only the two teams involved are touched.
    pub fn apply_game(
        &self,
        store: &mut RatingStore,
        game: &Game,
        score: FinalScore,
    ) -> Result<RatingChange> {
        let home = store
            .get(&game.home_team)
            .ok_or_else(|| ForecastError::UnknownTeam(game.home_team.clone()))?
            .clone();
        let away = store
            .get(&game.away_team)
            .ok_or_else(|| ForecastError::UnknownTeam(game.away_team.clone()))?
            .clone();

        let home_before = self.season_adjusted(&home, game.season);
        let away_before = self.season_adjusted(&away, game.season);
        let margin = Some((score.home as f64 - score.away as f64).abs());
        let bonus = self.config.home_rating_bonus;

        let (home_after, away_after) = if score.home_won() {
            self.update_with_bonus(home_before, away_before, bonus, margin)
        } else if score.away_won() {
            let (away_after, home_after) =
                self.update_with_bonus(away_before, home_before, -bonus, margin);
            (home_after, away_after)
        } else {
            self.update_draw(home_before, away_before)
        };

        ensure_finite(&home.team_id, home_after)?;
        ensure_finite(&away.team_id, away_after)?;

        let mut home = home;
        let mut away = away;
        home.rating = home_after;
        away.rating = away_after;
        record_scoring(&mut home, score.home, score.away, game.season);
        record_scoring(&mut away, score.away, score.home, game.season);
        store.insert(home);
        store.insert(away);

        Ok(RatingChange {
            home_before,
            away_before,
            home_after,
            away_after,
        })
    }

    fn season_adjusted(&self, team: &Team, season: Option<u16>) -> f64 {
        match (team.last_season, season) {
            (Some(last), Some(current)) if current > last => self.carry_over(team.rating),
            _ => team.rating,
        }
    }
}

fn ensure_finite(team_id: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ForecastError::NonFiniteRating {
            team_id: team_id.to_string(),
            value,
        })
    }
}

/// Fold one game into a team's running points-for/against means.
fn record_scoring(team: &mut Team, scored: u16, allowed: u16, season: Option<u16>) {
    let n = team.games_played as f64;
    team.points_for_avg = (team.points_for_avg * n + scored as f64) / (n + 1.0);
    team.points_against_avg = (team.points_against_avg * n + allowed as f64) / (n + 1.0);
    team.games_played += 1;
    if season.is_some() {
        team.last_season = season;
    }
}
