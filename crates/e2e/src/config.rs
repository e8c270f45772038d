//! Harness configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::poller::Cadence;

/// Harness configuration, usually read from `deckgen.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL of the deck API
    pub base_url: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,

    /// How long to wait for `/health` before giving up
    pub health_timeout_secs: u64,

    /// Directory holding scenario YAML files
    pub scenarios_dir: PathBuf,

    /// Directory for downloaded decks and results
    pub output_dir: PathBuf,

    /// Polling cadences
    pub poll: PollConfig,

    /// Wait budgets
    pub budgets: BudgetConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 30,
            health_timeout_secs: 30,
            scenarios_dir: PathBuf::from("scenarios"),
            output_dir: PathBuf::from("test-results"),
            poll: PollConfig::default(),
            budgets: BudgetConfig::default(),
        }
    }
}

/// Cadence for each kind of wait, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub status: Cadence,
    pub task: Cadence,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status: Cadence::STATUS,
            task: Cadence::TASK,
        }
    }
}

/// Default wait budgets, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub status_secs: u64,
    pub task_secs: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            status_secs: 300,
            task_secs: 600,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults if it is missing
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(E2eError::Config(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        self.poll
            .status
            .validate()
            .map_err(|e| E2eError::Config(format!("poll.status: {}", e)))?;
        self.poll
            .task
            .validate()
            .map_err(|e| E2eError::Config(format!("poll.task: {}", e)))?;
        if self.budgets.status_secs == 0 || self.budgets.task_secs == 0 {
            return Err(E2eError::Config(
                "budgets.status_secs and budgets.task_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn status_budget(&self) -> Duration {
        Duration::from_secs(self.budgets.status_secs)
    }

    pub fn task_budget(&self) -> Duration {
        Duration::from_secs(self.budgets.task_secs)
    }
}
