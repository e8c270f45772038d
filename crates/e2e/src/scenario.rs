//! Declarative YAML lifecycle scenarios

use std::path::Path;

use deckgen_common::{CreateProjectRequest, DeckExpectations};
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// One lifecycle run, parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// How the project is created
    pub project: ProjectSeed,

    /// Stages to run after creation, in order
    #[serde(default = "default_stages")]
    pub stages: Vec<Stage>,

    /// Budget overrides for this scenario
    #[serde(default)]
    pub timeouts: TimeoutOverrides,

    /// Expectations for the exported deck
    #[serde(default)]
    pub expect: DeckExpectations,

    /// Delete the project when the run ends
    #[serde(default = "default_cleanup")]
    pub cleanup: bool,
}

fn default_stages() -> Vec<Stage> {
    vec![
        Stage::Outline,
        Stage::Descriptions,
        Stage::Images,
        Stage::Export,
    ]
}

fn default_cleanup() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSeed {
    #[serde(default = "default_creation_type")]
    pub creation_type: String,
    pub idea_prompt: String,
}

fn default_creation_type() -> String {
    "idea".to_string()
}

impl From<&ProjectSeed> for CreateProjectRequest {
    fn from(seed: &ProjectSeed) -> Self {
        Self {
            creation_type: seed.creation_type.clone(),
            idea_prompt: seed.idea_prompt.clone(),
        }
    }
}

/// A lifecycle stage after project creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Outline,
    Descriptions,
    Images,
    Export,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Outline => "outline",
            Stage::Descriptions => "descriptions",
            Stage::Images => "images",
            Stage::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-scenario wait budgets; unset values fall back to the harness config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutOverrides {
    #[serde(default)]
    pub status_secs: Option<u64>,
    #[serde(default)]
    pub task_secs: Option<u64>,
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by name.
    ///
    /// The directory must exist; unreadable entries are errors.
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::ScenarioParse(format!(
                "scenario directory not found: {}",
                dir.display()
            )));
        }

        let mut scenarios = Vec::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry.map_err(std::io::Error::from)?;
            let is_yaml = entry
                .path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if is_yaml && entry.file_type().is_file() {
                scenarios.push(Self::from_file(entry.path())?);
            }
        }

        scenarios.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scenarios)
    }

    fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::ScenarioParse("scenario name is empty".to_string()));
        }
        if self.project.idea_prompt.trim().is_empty() {
            return Err(E2eError::ScenarioParse(format!(
                "{}: project.idea_prompt is empty",
                self.name
            )));
        }
        if self.timeouts.status_secs == Some(0) || self.timeouts.task_secs == Some(0) {
            return Err(E2eError::ScenarioParse(format!(
                "{}: timeouts must be positive",
                self.name
            )));
        }
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
