use edgecast_rust_core::calibration::{RankBy, RankMetric};
use edgecast_rust_core::models::{MarketKind, Sport};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct Config {
    pub store_dir: PathBuf,
    pub feed_dir: PathBuf,
    pub sports: Vec<Sport>,
    pub model_version: String,
    pub feed_timeout_secs: u64,
    pub lookback_days: i64,
    pub backfill: bool,
    pub calibrate: bool,
    pub calibration_min_sample: u32,
    pub calibration_max_grid: usize,
    pub calibration_workers: Option<usize>,
    pub calibration_rank_by: RankBy,
    pub conviction_adjustments_path: Option<PathBuf>,
    pub edge_thresholds: Vec<(Sport, f64)>,
    pub pace_factors: Vec<(Sport, f64)>,
}


impl Config {
    pub fn from_env() -> Self {
        let sports = match env::var("EDGECAST_SPORTS") {
            Ok(list) => parse_sports(&list),
            Err(_) => Sport::ALL.to_vec(),
        };
        let lookup = |name: &str| env::var(name).ok();
        let edge_thresholds = sport_overrides("EDGE_THRESHOLD", lookup, |v| v >= 0.0);
        let pace_factors = sport_overrides("PACE_FACTOR", lookup, |v| v > 0.0);

        Self {
            store_dir: env::var("EDGECAST_STORE_DIR")
                .unwrap_or_else(|_| "./data/store".to_string())
                .into(),
            feed_dir: env::var("EDGECAST_FEED_DIR")
                .unwrap_or_else(|_| "./data/feeds".to_string())
                .into(),
            sports,
            model_version: env::var("EDGECAST_MODEL_VERSION").unwrap_or_else(|_| "v1".to_string()),
            feed_timeout_secs: env_or("FEED_TIMEOUT_SECS", 10),
            lookback_days: env_or("LOOKBACK_DAYS", 3),
            backfill: env_flag("BACKFILL"),
            calibrate: env_flag("CALIBRATE"),
            calibration_min_sample: env_or("CALIBRATION_MIN_SAMPLE", 50),
            calibration_max_grid: env_or("CALIBRATION_MAX_GRID", 50_000),
            calibration_workers: env::var("CALIBRATION_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0),
            calibration_rank_by: env::var("CALIBRATION_RANK_BY")
                .ok()
                .and_then(|v| parse_rank_by(&v))
                .unwrap_or_default(),
            conviction_adjustments_path: env::var("CONVICTION_ADJUSTMENTS_PATH").ok().map(PathBuf::from),
            edge_thresholds,
            pace_factors,
        }
    }

    pub fn pace_factor(&self, sport: Sport) -> Option<f64> {
        self.pace_factors.iter().find(|(s, _)| *s == sport).map(|&(_, f)| f)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

/// `<SPORT>_<suffix>` for every sport; unparseable or rejected values are logged and skipped
fn sport_overrides(
    suffix: &str,
    lookup: impl Fn(&str) -> Option<String>,
    accept: impl Fn(f64) -> bool,
) -> Vec<(Sport, f64)> {
    Sport::ALL
        .iter()
        .filter_map(|&sport| {
            let name = format!("{}_{}", sport.code().to_uppercase(), suffix);
            let raw = lookup(&name)?;
            match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && accept(value) => Some((sport, value)),
                _ => {
                    warn!("Ignoring {}={}: out of range", name, raw);
                    None
                }
            }
        })
        .collect()
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Comma-separated sport codes; unknown codes are logged and dropped
fn parse_sports(list: &str) -> Vec<Sport> {
    let mut sports = Vec::new();
    for code in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        match code.parse::<Sport>() {
            Ok(sport) if !sports.contains(&sport) => sports.push(sport),
            Ok(_) => {}
            Err(e) => warn!("{}", e),
        }
    }
    sports
}

/// `<metric>:<market>`, e.g. `roi:total`. The market defaults to spread.
fn parse_rank_by(raw: &str) -> Option<RankBy> {
    let raw = raw.trim().to_lowercase();
    let (metric, market) = raw.split_once(':').unwrap_or((raw.as_str(), "spread"));
    let metric = match metric {
        "win_pct" | "winpct" => RankMetric::WinPct,
        "roi" => RankMetric::Roi,
        _ => {
            warn!("Unknown calibration metric {}", metric);
            return None;
        }
    };
    let market = MarketKind::ALL.into_iter().find(|m| m.as_str() == market)?;
    Some(RankBy { metric, market })
}
