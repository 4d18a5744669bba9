//! Workspace configuration and filesystem layout.
//!
//! All data lives under a single root directory:
//!   `$CITEBASE_HOME` when set (tests point this at a temp dir),
//!   otherwise the OS data directory via `directories::BaseDirs`.
//!
//! Layout:
//!   config/config.toml          persisted configuration
//!   articles/scopus/            dated per-source snapshots
//!   articles/wos/
//!   articles/unified/           dated unified snapshots
//!   articles/overrides.csv      curated override table
//!   events.jsonl                reconciliation run log

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::overrides::OverrideStore;
use crate::runlog::ReconciliationLog;
use crate::snapshot::SnapshotStore;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Root configuration persisted per installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// When the last reconciliation run completed, if any.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Storage layout knobs.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Filesystem layout preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Subdirectory under the workspace root holding all article data.
    #[serde(default = "default_articles_dir")]
    pub articles_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            articles_dir: default_articles_dir(),
        }
    }
}

fn default_articles_dir() -> String {
    "articles".to_string()
}

/// Returns the root directory where CiteBase stores data.
///
/// Order of precedence:
/// 1. `CITEBASE_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var("CITEBASE_HOME") {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("CiteBase"))
}

fn config_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join("config"))
}

pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from disk or returns defaults.
pub fn load_or_default() -> Result<AppConfig> {
    let path = config_file_path()?;
    if path.exists() {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: AppConfig = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    } else {
        Ok(AppConfig::default())
    }
}

/// Persists the configuration to disk.
pub fn save(config: &AppConfig) -> Result<()> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;
    let path = config_file_path()?;
    let data = toml::to_string_pretty(config)?;
    fs::write(&path, data)?;
    Ok(())
}

/// Important workspace paths, resolved once.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub articles_dir: PathBuf,
    pub overrides_file: PathBuf,
    pub events_file: PathBuf,
}

/// Ensures the workspace directory structure exists.
pub fn ensure_workspace_structure(config: &AppConfig) -> Result<WorkspacePaths> {
    let root = workspace_root()?;
    let articles_dir = root.join(&config.storage.articles_dir);
    fs::create_dir_all(&articles_dir)
        .with_context(|| format!("Failed to create articles directory {:?}", articles_dir))?;
    Ok(WorkspacePaths {
        overrides_file: articles_dir.join("overrides.csv"),
        events_file: root.join("events.jsonl"),
        root,
        articles_dir,
    })
}

/// Handle bundling configuration and storage for one workspace.
pub struct Workspace {
    pub config: AppConfig,
    pub paths: WorkspacePaths,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let config = load_or_default()?;
        let paths = ensure_workspace_structure(&config)?;
        Ok(Self { config, paths })
    }

    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(self.paths.articles_dir.clone())
    }

    pub fn override_store(&self) -> OverrideStore {
        OverrideStore::new(self.paths.overrides_file.clone())
    }

    pub fn run_log(&self) -> ReconciliationLog {
        ReconciliationLog::new(self.paths.events_file.clone())
    }

    /// Records a completed reconciliation run in the config.
    pub fn record_run(&mut self) -> Result<()> {
        self.config.last_run_at = Some(Utc::now());
        save(&self.config)
    }
}
