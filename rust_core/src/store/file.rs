//! JSON file per sport.
//!
//! - Layout: `<base_dir>/<sport code>.json`
//! - Atomic writes: serialize to `<sport code>.json.tmp`, then rename over the
//!   live file, so a crash mid-write leaves the previous document intact

use super::{DocumentStore, SportDocument};
use crate::models::Sport;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn document_path(&self, sport: Sport) -> PathBuf {
        self.base_dir.join(format!("{}.json", sport.code()))
    }

    fn temp_path(&self, sport: Sport) -> PathBuf {
        self.base_dir.join(format!("{}.json.tmp", sport.code()))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load(&self, sport: Sport) -> Result<Option<SportDocument>> {
        let path = self.document_path(sport);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            debug!("No stored document for {} at {}", sport, path.display());
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document: SportDocument = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        info!(
            "Loaded {} document: {} teams, {} results, model {}",
            sport,
            document.teams.len(),
            document.backtest_results.len(),
            document.model_version
        );
        Ok(Some(document))
    }

    async fn replace(&self, sport: Sport, document: &SportDocument) -> Result<()> {
        fs::create_dir_all(&self.base_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.base_dir.display()))?;

        let json = serde_json::to_vec_pretty(document).context("Failed to serialize document")?;
        let tmp_path = self.temp_path(sport);
        let path = self.document_path(sport);

        fs::write(&tmp_path, &json)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to move {} into place", tmp_path.display()))?;

        debug!("Replaced {} document ({} bytes)", sport, json.len());
        Ok(())
    }

    fn store_name(&self) -> &str {
        "json_file"
    }
}
