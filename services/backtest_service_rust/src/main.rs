mod config;
mod feeds;

use crate::config::Config;
use crate::feeds::{JsonLineFeed, JsonScheduleFeed};
use anyhow::{Context, Result};
use dotenv::dotenv;
use edgecast_rust_core::adjusters::{AdjusterChain, PaceAdjuster};
use edgecast_rust_core::backtest::{best_bets, BacktestRunner, RunnerConfig};
use edgecast_rust_core::calibration::{CalibrationConfig, ParameterCalibrator, ParameterGrid};
use edgecast_rust_core::conviction::{ConvictionConfig, ConvictionScorer};
use edgecast_rust_core::league_config::league_config;
use edgecast_rust_core::models::Sport;
use edgecast_rust_core::store::{DocumentStore, JsonFileStore};
use futures_util::future::join_all;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Edgecast backtest service...");

    let config = Arc::new(Config::from_env());
    info!(
        "Sports: {:?}, model {}, store {}, feeds {}",
        config.sports,
        config.model_version,
        config.store_dir.display(),
        config.feed_dir.display()
    );

    let conviction = load_conviction_config(&config).await?;
    let store = Arc::new(JsonFileStore::new(config.store_dir.clone()));
    let schedule = Arc::new(JsonScheduleFeed::new(config.feed_dir.clone()));
    let lines = Arc::new(JsonLineFeed::load(&config.feed_dir, &config.sports).await);

    // One independent task per sport
    let tasks: Vec<_> = config
        .sports
        .iter()
        .map(|&sport| {
            let config = config.clone();
            let conviction = conviction.clone();
            let schedule = schedule.clone();
            let lines = lines.clone();
            let store = store.clone();
            tokio::spawn(async move { run_sport(sport, config, conviction, schedule, lines, store).await })
        })
        .collect();

    let mut failures = 0;
    for (sport, joined) in config.sports.iter().zip(join_all(tasks).await) {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{} run failed: {:#}", sport, e);
                failures += 1;
            }
            Err(e) => {
                error!("{} task panicked: {}", sport, e);
                failures += 1;
            }
        }
    }

    if config.calibrate {
        for &sport in &config.sports {
            if let Err(e) = calibrate_sport(sport, &config, &*store).await {
                error!("{} calibration failed: {:#}", sport, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} step(s) failed", failures);
    }
    info!("Edgecast backtest service finished");
    Ok(())
}

async fn load_conviction_config(config: &Config) -> Result<ConvictionConfig> {
    let mut conviction = match &config.conviction_adjustments_path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => ConvictionConfig::default(),
    };
    for &(sport, threshold) in &config.edge_thresholds {
        info!("{} edge threshold override: {}", sport, threshold);
        conviction = conviction.with_edge_threshold(sport, threshold);
    }
    Ok(conviction)
}

/// Default rest/weather/injury chain, plus pace when the sport has a factor configured
fn build_adjusters(sport: Sport, pace_factor: Option<f64>) -> AdjusterChain {
    let mut chain = AdjusterChain::new();
    if let Some(factor) = pace_factor {
        info!("{} pace factor: {}", sport, factor);
        chain.register_adjuster(Box::new(PaceAdjuster::new().with_factor(sport, factor)));
    }
    chain
}

async fn run_sport(
    sport: Sport,
    config: Arc<Config>,
    conviction: ConvictionConfig,
    schedule: Arc<JsonScheduleFeed>,
    lines: Arc<JsonLineFeed>,
    store: Arc<JsonFileStore>,
) -> Result<()> {
    let runner_config = RunnerConfig {
        model_version: config.model_version.clone(),
        feed_timeout: Duration::from_secs(config.feed_timeout_secs),
        lookback: chrono::Duration::days(config.lookback_days),
        params: None,
    };
    let mut runner = BacktestRunner::new(
        sport,
        runner_config,
        build_adjusters(sport, config.pace_factor(sport)),
        ConvictionScorer::new(conviction),
        schedule,
        lines.clone(),
        store.clone(),
    )?;

    let report = runner.run().await?;
    write_json(&config.store_dir, &format!("{}_report.json", sport.code()), &report).await?;

    if config.backfill {
        let backfill = runner.backfill(lines.grading_lines(sport)).await?;
        info!(
            "{} backfill: {} regraded, {} unchanged, {} skipped",
            sport, backfill.regraded, backfill.unchanged, backfill.skipped
        );
    }

    if let Some(document) = store.load(sport).await? {
        let picks = best_bets(&document.backtest_results);
        let summary = &document.backtest_summary;
        info!(
            "{} totals: spread {}-{}-{} ({:.1}%, {}), {} best bets",
            sport,
            summary.spread.wins,
            summary.spread.losses,
            summary.spread.pushes,
            summary.spread.win_pct() * 100.0,
            summary.spread.net_units,
            picks.len()
        );
        write_json(&config.store_dir, &format!("{}_best_bets.json", sport.code()), &picks).await?;
    }

    let upcoming = runner.upcoming_predictions().await?;
    info!("{} upcoming predictions: {}", sport, upcoming.len());
    write_json(&config.store_dir, &format!("{}_upcoming.json", sport.code()), &upcoming).await?;
    Ok(())
}

async fn calibrate_sport(sport: Sport, config: &Config, store: &dyn DocumentStore) -> Result<()> {
    let Some(document) = store.load(sport).await? else {
        warn!("No {} document; skipping calibration", sport);
        return Ok(());
    };
    if document.model_version != config.model_version {
        warn!(
            "{} document is model {}, expected {}; skipping calibration",
            sport, document.model_version, config.model_version
        );
        return Ok(());
    }

    let calibration_config = CalibrationConfig {
        max_grid_size: config.calibration_max_grid,
        min_sample: config.calibration_min_sample,
        workers: config.calibration_workers,
        rank_by: config.calibration_rank_by,
        ..Default::default()
    };
    let grid = ParameterGrid::around_defaults(league_config(sport));
    let results = document.backtest_results;

    // CPU-bound: keep it off the async workers
    let report = tokio::task::spawn_blocking(move || {
        ParameterCalibrator::new(sport, calibration_config).calibrate(&grid, &results)
    })
    .await
    .context("Calibration task panicked")??;

    info!(
        "{} calibration: {} evaluated, {} rejected, {} below sample floor",
        sport,
        report.evaluated,
        report.rejected.len(),
        report.below_min_sample
    );
    write_json(&config.store_dir, &format!("{}_calibration.json", sport.code()), &report).await
}

async fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(name);
    let json = serde_json::to_vec_pretty(value).context("Failed to serialize output")?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
