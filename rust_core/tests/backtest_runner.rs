//! Integration tests for the backtest runner
//!
//! Every collaborator is in-process, so these run without network or disk.

use chrono::{DateTime, Duration, TimeZone, Utc};
use edgecast_rust_core::adjusters::AdjusterChain;
use edgecast_rust_core::backtest::{BacktestRunner, RunnerConfig};
use edgecast_rust_core::calibration::{CalibrationConfig, ParameterCalibrator, ParameterGrid};
use edgecast_rust_core::conviction::ConvictionScorer;
use edgecast_rust_core::error::ForecastError;
use edgecast_rust_core::grading::Verdict;
use edgecast_rust_core::league_config::NFL_CONFIG;
use edgecast_rust_core::models::{
    FinalScore, Game, GameStatus, MarketKind, MarketLine, SituationalContext, Sport, Team,
};
use edgecast_rust_core::providers::{MemoryLineFeed, MemoryScheduleFeed};
use edgecast_rust_core::store::{MemoryDocumentStore, SportDocument};
use std::sync::Arc;

fn kickoff(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 8, 17, 0, 0).unwrap() + Duration::days(day)
}

fn game(id: &str, day: i64, home: &str, away: &str, score: Option<(u16, u16)>) -> Game {
    Game {
        game_id: id.to_string(),
        sport: Sport::NFL,
        season: Some(2024),
        scheduled_at: kickoff(day),
        home_team: home.to_string(),
        away_team: away.to_string(),
        home_name: None,
        away_name: None,
        venue: None,
        status: GameStatus::Final,
        final_score: score.map(|(home, away)| FinalScore { home, away }),
        situation: SituationalContext::default(),
    }
}

fn scheduled(id: &str, day: i64, home: &str, away: &str) -> Game {
    Game {
        status: GameStatus::Scheduled,
        final_score: None,
        ..game(id, day, home, away, None)
    }
}

fn line(id: &str, spread: f64, total: f64) -> MarketLine {
    MarketLine::new(id, spread, total, kickoff(0))
}

fn week_one() -> Vec<Game> {
    vec![
        game("g1", 0, "KC", "BAL", Some((27, 20))),
        game("g2", 1, "BUF", "KC", Some((17, 24))),
        game("g3", 2, "BAL", "BUF", Some((30, 10))),
    ]
}

fn week_one_lines() -> Vec<MarketLine> {
    vec![line("g1", -3.0, 46.5), line("g2", 1.5, 47.0), line("g3", -2.5, 44.0)]
}

fn runner(
    config: RunnerConfig,
    schedule: &Arc<MemoryScheduleFeed>,
    lines: &Arc<MemoryLineFeed>,
    store: &Arc<MemoryDocumentStore>,
) -> BacktestRunner {
    BacktestRunner::new(
        Sport::NFL,
        config,
        AdjusterChain::new(),
        ConvictionScorer::default(),
        schedule.clone(),
        lines.clone(),
        store.clone(),
    )
    .expect("default params are valid")
}

struct Harness {
    schedule: Arc<MemoryScheduleFeed>,
    lines: Arc<MemoryLineFeed>,
    store: Arc<MemoryDocumentStore>,
}

impl Harness {
    fn new(games: Vec<Game>, lines: Vec<MarketLine>) -> Self {
        Self {
            schedule: Arc::new(MemoryScheduleFeed::new(games)),
            lines: Arc::new(MemoryLineFeed::new(lines)),
            store: Arc::new(MemoryDocumentStore::new()),
        }
    }

    fn runner(&self) -> BacktestRunner {
        self.runner_with(RunnerConfig::default())
    }

    fn runner_with(&self, config: RunnerConfig) -> BacktestRunner {
        runner(config, &self.schedule, &self.lines, &self.store)
    }
}

#[tokio::test]
async fn test_first_run_processes_and_persists() {
    let h = Harness::new(week_one(), week_one_lines());
    let report = h.runner().run().await.unwrap();

    assert!(report.started_fresh);
    assert_eq!(report.games_processed, 3);
    assert_eq!(report.games_graded, 3);
    assert!(report.persisted);
    assert_eq!(report.watermark, Some(kickoff(2)));
    assert_eq!(h.store.write_count(), 1);

    let doc = h.store.snapshot(Sport::NFL).unwrap();
    assert_eq!(doc.model_version, "v1");
    assert_eq!(doc.teams.len(), 3);
    assert_eq!(doc.processed_game_ids, vec!["g1", "g2", "g3"]);
    assert_eq!(doc.backtest_summary.games_processed, 3);
    assert_eq!(doc.backtest_summary.games_graded, 3);
    // Zero-sum updates keep the league mean at baseline
    let sum: f64 = doc.teams.iter().map(|t| t.rating).sum();
    assert!((sum - 3.0 * NFL_CONFIG.baseline_rating).abs() < 1e-6);
    // Moneyline bets ignore min_edge, so every graded game has one
    assert_eq!(doc.backtest_summary.moneyline.graded(), 3);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let h = Harness::new(week_one(), week_one_lines());
    h.runner().run().await.unwrap();
    let before = h.store.snapshot(Sport::NFL).unwrap();

    let report = h.runner().run().await.unwrap();
    assert!(!report.started_fresh);
    assert_eq!(report.games_processed, 0);
    assert_eq!(report.skipped_already_processed, 3);
    assert!(!report.persisted);
    assert_eq!(h.store.write_count(), 1);
    assert_eq!(h.store.snapshot(Sport::NFL).unwrap(), before);
    assert_eq!(report.summary, before.backtest_summary);
}

#[tokio::test]
async fn test_feed_order_does_not_change_ratings() {
    let forward = Harness::new(week_one(), week_one_lines());
    let mut reversed_games = week_one();
    reversed_games.reverse();
    let reversed = Harness::new(reversed_games, week_one_lines());

    forward.runner().run().await.unwrap();
    reversed.runner().run().await.unwrap();

    let a = forward.store.snapshot(Sport::NFL).unwrap();
    let b = reversed.store.snapshot(Sport::NFL).unwrap();
    assert_eq!(a.teams, b.teams);
    let ids = |doc: &edgecast_rust_core::store::SportDocument| {
        doc.backtest_results
            .iter()
            .map(|r| r.game_id.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&a), vec!["g1", "g2", "g3"]);
    assert_eq!(ids(&a), ids(&b));
}

#[tokio::test]
async fn test_prediction_uses_ratings_before_the_game() {
    let h = Harness::new(week_one(), week_one_lines());
    h.runner().run().await.unwrap();
    let doc = h.store.snapshot(Sport::NFL).unwrap();

    // g1 is the first game: both teams at baseline
    let first = &doc.backtest_results[0];
    assert_eq!(first.prediction.home.rating, NFL_CONFIG.baseline_rating);
    assert_eq!(first.prediction.away.rating, NFL_CONFIG.baseline_rating);

    // g2 sees KC after its g1 win
    let second = &doc.backtest_results[1];
    assert!(second.prediction.away.rating > NFL_CONFIG.baseline_rating);
}

#[tokio::test]
async fn test_missing_line_leaves_game_ungraded_but_processed() {
    let h = Harness::new(week_one(), vec![line("g1", -3.0, 46.5)]);
    let report = h.runner().run().await.unwrap();

    assert_eq!(report.games_processed, 3);
    assert_eq!(report.games_graded, 1);
    assert_eq!(report.line_failures, 0);

    let doc = h.store.snapshot(Sport::NFL).unwrap();
    let g2 = doc.backtest_results.iter().find(|r| r.game_id == "g2").unwrap();
    assert!(g2.market_line.is_none());
    assert!(g2.verdict(MarketKind::Spread).is_none());
    assert!(doc.processed_game_ids.contains(&"g2".to_string()));
    assert_eq!(doc.backtest_summary.games_graded, 1);
}

#[tokio::test]
async fn test_invalid_line_is_ignored() {
    let h = Harness::new(week_one(), vec![line("g1", f64::NAN, 46.5)]);
    let report = h.runner().run().await.unwrap();
    assert_eq!(report.games_processed, 3);
    assert_eq!(report.games_graded, 0);
}

#[tokio::test]
async fn test_final_without_score_holds_later_games() {
    let store = Arc::new(MemoryDocumentStore::new());
    let lines = Arc::new(MemoryLineFeed::new(week_one_lines()));

    let mut games = week_one();
    games[1].final_score = None;
    let first_feed = Arc::new(MemoryScheduleFeed::new(games));
    let report = runner(RunnerConfig::default(), &first_feed, &lines, &store)
        .run()
        .await
        .unwrap();
    assert_eq!(report.games_processed, 1);
    assert_eq!(report.skipped_missing_score, 1);
    assert_eq!(report.deferred, 1);
    assert_eq!(report.watermark, Some(kickoff(0)));
    let doc = store.snapshot(Sport::NFL).unwrap();
    assert_eq!(doc.processed_game_ids, vec!["g1"]);

    let second_feed = Arc::new(MemoryScheduleFeed::new(week_one()));
    let report = runner(RunnerConfig::default(), &second_feed, &lines, &store)
        .run()
        .await
        .unwrap();
    assert_eq!(report.games_processed, 2);
    assert_eq!(report.skipped_already_processed, 1);
    assert_eq!(report.deferred, 0);

    let clean = Harness::new(week_one(), week_one_lines());
    clean.runner().run().await.unwrap();
    let expected = clean.store.snapshot(Sport::NFL).unwrap();
    let doc = store.snapshot(Sport::NFL).unwrap();
    assert_eq!(doc.processed_game_ids, expected.processed_game_ids);
    assert_eq!(doc.teams, expected.teams);
    assert_eq!(doc.backtest_summary, expected.backtest_summary);
}

#[tokio::test]
async fn test_late_score_beyond_lookback_is_still_replayed() {
    let season = || {
        vec![
            game("g1", 0, "KC", "BAL", Some((27, 20))),
            game("g2", 7, "BUF", "KC", Some((17, 24))),
            game("g3", 20, "BAL", "BUF", Some((30, 10))),
        ]
    };
    let store = Arc::new(MemoryDocumentStore::new());
    let lines = Arc::new(MemoryLineFeed::new(Vec::new()));

    let mut games = season();
    games[1].final_score = None;
    let first_feed = Arc::new(MemoryScheduleFeed::new(games));
    let report = runner(RunnerConfig::default(), &first_feed, &lines, &store)
        .run()
        .await
        .unwrap();
    assert_eq!(report.games_processed, 1);
    assert_eq!(report.deferred, 1);
    // g3 is two weeks past g2; the watermark must not jump over g2
    assert_eq!(report.watermark, Some(kickoff(0)));

    let second_feed = Arc::new(MemoryScheduleFeed::new(season()));
    let report = runner(RunnerConfig::default(), &second_feed, &lines, &store)
        .run()
        .await
        .unwrap();
    assert_eq!(report.games_processed, 2);
    assert_eq!(report.watermark, Some(kickoff(20)));

    let doc = store.snapshot(Sport::NFL).unwrap();
    assert_eq!(doc.processed_game_ids, vec!["g1", "g2", "g3"]);
    let order: Vec<&str> = doc.backtest_results.iter().map(|r| r.game_id.as_str()).collect();
    assert_eq!(order, vec!["g1", "g2", "g3"]);

    let clean = Harness::new(season(), Vec::new());
    clean.runner().run().await.unwrap();
    assert_eq!(doc.teams, clean.store.snapshot(Sport::NFL).unwrap().teams);
}

#[tokio::test]
async fn test_line_feed_error_leaves_games_ungraded() {
    let h = Harness::new(week_one(), week_one_lines());
    h.lines.set_failing(true);
    let report = h.runner().run().await.unwrap();

    assert_eq!(report.games_processed, 3);
    assert_eq!(report.games_graded, 0);
    assert_eq!(report.line_failures, 3);
    let doc = h.store.snapshot(Sport::NFL).unwrap();
    assert_eq!(doc.processed_game_ids.len(), 3);
    assert!(doc.backtest_results.iter().all(|r| r.market_line.is_none()));
    assert_eq!(doc.backtest_summary.spread.graded(), 0);
}

#[tokio::test]
async fn test_non_finite_rating_aborts_without_writing() {
    let mut seeded = SportDocument::new(Sport::NFL, "v1", 0.0);
    let mut broken = Team::new("KC", "Kansas City", "KC", f64::NAN, 22.0);
    broken.last_season = Some(2024);
    seeded.teams = vec![broken, Team::new("BAL", "Baltimore", "BAL", 1500.0, 22.0)];
    let before = serde_json::to_string(&seeded).unwrap();

    let store = Arc::new(MemoryDocumentStore::with_document(seeded));
    let schedule = Arc::new(MemoryScheduleFeed::new(vec![game("g1", 0, "KC", "BAL", Some((27, 20)))]));
    let lines = Arc::new(MemoryLineFeed::new(vec![line("g1", -3.0, 46.5)]));

    let err = runner(RunnerConfig::default(), &schedule, &lines, &store)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, ForecastError::NonFiniteRating { .. }));
    assert_eq!(store.write_count(), 0);
    let after = serde_json::to_string(&store.snapshot(Sport::NFL).unwrap()).unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_feed_failure_is_no_data() {
    let h = Harness::new(week_one(), week_one_lines());
    h.runner().run().await.unwrap();
    let before = h.store.snapshot(Sport::NFL).unwrap();

    h.schedule.set_failing(true);
    let report = h.runner().run().await.unwrap();
    assert_eq!(report.games_fetched, 0);
    assert_eq!(report.games_processed, 0);
    assert!(!report.persisted);
    assert_eq!(h.store.snapshot(Sport::NFL).unwrap(), before);
}

#[tokio::test]
async fn test_model_version_change_replays_history() {
    let h = Harness::new(week_one(), week_one_lines());
    h.runner().run().await.unwrap();

    let config = RunnerConfig {
        model_version: "v2".to_string(),
        ..Default::default()
    };
    let report = h.runner_with(config).run().await.unwrap();
    assert!(report.started_fresh);
    assert_eq!(report.games_processed, 3);

    let doc = h.store.snapshot(Sport::NFL).unwrap();
    assert_eq!(doc.model_version, "v2");
    assert_eq!(doc.backtest_results.len(), 3);
    assert!(doc
        .backtest_results
        .iter()
        .all(|r| r.prediction.model_version == "v2"));
}

#[tokio::test]
async fn test_backfill_regrades_without_touching_ratings() {
    let h = Harness::new(week_one(), Vec::new());
    h.runner().run().await.unwrap();
    let before = h.store.snapshot(Sport::NFL).unwrap();
    assert_eq!(before.backtest_summary.games_graded, 0);

    let mut runner = h.runner();
    let mut lines = week_one_lines();
    lines.push(line("unknown", -1.0, 40.0));
    let report = runner.backfill(lines).await.unwrap();
    assert_eq!(report.regraded, 3);
    assert_eq!(report.skipped, 1);

    let after = h.store.snapshot(Sport::NFL).unwrap();
    assert_eq!(after.teams, before.teams);
    assert_eq!(after.processed_game_ids, before.processed_game_ids);
    assert_eq!(after.backtest_summary.games_processed, 3);
    assert_eq!(after.backtest_summary.games_graded, 3);
    for (old, new) in before.backtest_results.iter().zip(&after.backtest_results) {
        assert_eq!(old.prediction, new.prediction);
    }

    // Same lines again: nothing to do, nothing written
    let writes = h.store.write_count();
    let report = runner.backfill(week_one_lines()).await.unwrap();
    assert_eq!(report.unchanged, 3);
    assert_eq!(report.regraded, 0);
    assert_eq!(h.store.write_count(), writes);
}

#[tokio::test]
async fn test_backfill_replaces_line_and_summary_stays_consistent() {
    let h = Harness::new(week_one(), week_one_lines());
    h.runner().run().await.unwrap();

    // Move the g1 line so the home side no longer covers (KC won by 7)
    let report = h
        .runner()
        .backfill(vec![line("g1", -10.5, 46.5)])
        .await
        .unwrap();
    assert_eq!(report.regraded, 1);

    let doc = h.store.snapshot(Sport::NFL).unwrap();
    let rebuilt = edgecast_rust_core::backtest::BacktestSummary::rebuild(
        doc.backtest_summary.min_edge,
        &doc.backtest_results,
    );
    assert_eq!(doc.backtest_summary, rebuilt);
    let g1 = &doc.backtest_results[0];
    assert_eq!(g1.market_line.as_ref().unwrap().spread, -10.5);
}

#[tokio::test]
async fn test_backfill_without_document_skips_everything() {
    let h = Harness::new(week_one(), Vec::new());
    let report = h.runner().backfill(week_one_lines()).await.unwrap();
    assert_eq!(report.skipped, 3);
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn test_upcoming_predictions_are_not_persisted() {
    let mut games = week_one();
    games.push(scheduled("g4", 7, "KC", "BUF"));
    let mut lines = week_one_lines();
    // KC is 2-0 and at home; a home-underdog line guarantees a spread pick
    lines.push(line("g4", 7.5, 48.0));
    let h = Harness::new(games, lines);
    h.runner().run().await.unwrap();
    let writes = h.store.write_count();

    let upcoming = h.runner().upcoming_predictions().await.unwrap();
    assert_eq!(upcoming.len(), 1);
    let g4 = &upcoming[0];
    assert_eq!(g4.prediction.game_id, "g4");
    let picks = g4.picks.as_ref().unwrap();
    assert!(picks.iter().all(|grade| grade.verdict.is_none()));
    assert!(g4.conviction.is_some());
    assert_eq!(h.store.write_count(), writes);
}

#[tokio::test]
async fn test_draw_grades_moneyline_as_loss() {
    let h = Harness::new(
        vec![game("g1", 0, "KC", "BAL", Some((20, 20)))],
        vec![line("g1", -3.0, 40.0)],
    );
    h.runner().run().await.unwrap();
    let doc = h.store.snapshot(Sport::NFL).unwrap();
    let result = &doc.backtest_results[0];
    assert_eq!(result.verdict(MarketKind::Moneyline), Some(Verdict::Loss));
    assert_eq!(result.verdict(MarketKind::Total), Some(Verdict::Push));
}

#[tokio::test]
async fn test_calibration_over_stored_results_is_read_only() {
    let h = Harness::new(week_one(), week_one_lines());
    h.runner().run().await.unwrap();
    let doc = h.store.snapshot(Sport::NFL).unwrap();

    let calibrator = ParameterCalibrator::new(
        Sport::NFL,
        CalibrationConfig {
            min_sample: 1,
            workers: Some(2),
            ..Default::default()
        },
    );
    let mut grid = ParameterGrid::from_params(&NFL_CONFIG.default_params);
    grid.home_advantage = vec![0.0, 2.0, 4.0];
    let report = calibrator.calibrate(&grid, &doc.backtest_results).unwrap();

    assert_eq!(report.grid_size, 3);
    assert_eq!(report.historical_games, 3);
    assert_eq!(report.evaluated, 3);
    assert!(report.rejected.is_empty());
    assert!(report.best().is_some());
    assert_eq!(h.store.snapshot(Sport::NFL).unwrap(), doc);
}
