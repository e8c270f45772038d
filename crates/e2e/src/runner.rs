//! Lifecycle runner: drives scenarios through the deck API and the poller

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use deckgen_common::{project_status, DeckInspector, DeckReport, EntityRef, StatusReport};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::client::ApiClient;
use crate::clock::{Clock, TokioClock};
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::poller::{PollOutcome, Poller};
use crate::scenario::{Scenario, Stage};

/// Result of one lifecycle stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub success: bool,
    pub duration_ms: u64,
    pub task_id: Option<String>,
    pub final_status: Option<String>,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub project_id: Option<String>,
    pub stages: Vec<StageResult>,
    pub deck: Option<DeckReport>,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

#[derive(Debug, Default)]
struct StageOutput {
    task_id: Option<String>,
    final_status: Option<String>,
    deck: Option<DeckReport>,
}

/// Runs lifecycle scenarios against a deck API
pub struct LifecycleRunner<C = TokioClock> {
    config: HarnessConfig,
    poller: Poller<ApiClient, C>,
    inspector: DeckInspector,
}

impl LifecycleRunner<TokioClock> {
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        Self::with_clock(config, TokioClock::new())
    }
}

impl<C: Clock> LifecycleRunner<C> {
    pub fn with_clock(config: HarnessConfig, clock: C) -> E2eResult<Self> {
        config.validate()?;
        let client = ApiClient::new(&config.base_url, config.request_timeout())?;
        let poller = Poller::with_clock(client, clock).with_cadences(config.poll.status, config.poll.task);

        Ok(Self {
            config,
            poller,
            inspector: DeckInspector::new(),
        })
    }

    pub fn client(&self) -> &ApiClient {
        self.poller.fetcher()
    }

    pub fn poller(&self) -> &Poller<ApiClient, C> {
        &self.poller
    }

    /// Run all scenarios in the configured directory
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        self.run_scenarios(&scenarios).await
    }

    /// Run scenarios carrying a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let scenarios: Vec<Scenario> = Scenario::load_all(&self.config.scenarios_dir)?
            .into_iter()
            .filter(|s| s.has_tag(tag))
            .collect();
        if scenarios.is_empty() {
            return Err(E2eError::ScenarioParse(format!(
                "no scenarios tagged '{}' in {}",
                tag,
                self.config.scenarios_dir.display()
            )));
        }
        self.run_scenarios(&scenarios).await
    }

    /// Run one scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<SuiteResult> {
        let scenario = Scenario::load_all(&self.config.scenarios_dir)?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioParse(format!("Scenario not found: {}", name)))?;
        self.run_scenarios(std::slice::from_ref(&scenario)).await
    }

    /// Run a list of scenarios sequentially. An empty list is an error.
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        if scenarios.is_empty() {
            return Err(E2eError::ScenarioParse(format!(
                "no scenarios to run in {}",
                self.config.scenarios_dir.display()
            )));
        }

        let started_at = Utc::now();
        let start = Instant::now();

        self.client()
            .wait_for_healthy(self.config.health_timeout())
            .await?;

        info!("Running {} scenario(s)...", scenarios.len());

        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let result = self.run_scenario(scenario).await;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(SuiteResult {
            started_at,
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run one scenario: create the project, run each stage, clean up.
    ///
    /// Stops at the first failed stage. Never returns an error; failures are
    /// recorded in the result.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let mut result = ScenarioResult {
            name: scenario.name.clone(),
            success: false,
            duration_ms: 0,
            project_id: None,
            stages: Vec::new(),
            deck: None,
            error: None,
        };

        let project = match self.client().create_project(&(&scenario.project).into()).await {
            Ok(project) => project,
            Err(e) => {
                result.error = Some(format!("create project: {}", e));
                result.duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };
        result.project_id = Some(project.project_id.clone());

        for stage in &scenario.stages {
            let stage_start = Instant::now();
            let outcome = self.run_stage(*stage, &project.project_id, scenario).await;
            let duration_ms = stage_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(output) => {
                    let rejection = output
                        .deck
                        .as_ref()
                        .filter(|deck| !deck.valid)
                        .map(|deck| deck.message.clone());
                    if output.deck.is_some() {
                        result.deck = output.deck;
                    }

                    match &rejection {
                        None => info!("  ✓ {} ({} ms)", stage, duration_ms),
                        Some(reason) => warn!("  ✗ {} - deck rejected: {}", stage, reason),
                    }
                    result.stages.push(StageResult {
                        stage: stage.to_string(),
                        success: rejection.is_none(),
                        duration_ms,
                        task_id: output.task_id,
                        final_status: output.final_status,
                        error: rejection.clone(),
                    });

                    if let Some(reason) = rejection {
                        result.error = Some(format!("{}: deck rejected: {}", stage, reason));
                        break;
                    }
                }
                Err(e) => {
                    warn!("  ✗ {} - {}", stage, e);
                    result.error = Some(format!("{}: {}", stage, e));
                    result.stages.push(StageResult {
                        stage: stage.to_string(),
                        success: false,
                        duration_ms,
                        task_id: None,
                        final_status: None,
                        error: Some(e.to_string()),
                    });
                    break;
                }
            }
        }

        if scenario.cleanup {
            if let Err(e) = self.client().delete_project(&project.project_id).await {
                warn!("Cleanup of project {} failed: {}", project.project_id, e);
            }
        }

        result.success = result.error.is_none();
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    async fn run_stage(&self, stage: Stage, project_id: &str, scenario: &Scenario) -> E2eResult<StageOutput> {
        let status_budget = scenario
            .timeouts
            .status_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.config.status_budget());
        let task_budget = scenario
            .timeouts
            .task_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.config.task_budget());

        match stage {
            Stage::Outline => {
                self.client().generate_outline(project_id).await?;
                let entity = EntityRef::project(project_id);
                let outcome = self
                    .poller
                    .await_status(&entity, project_status::OUTLINE_GENERATED, status_budget)
                    .await;
                let report = self.settle(&entity, outcome).await?;
                Ok(StageOutput {
                    final_status: Some(report.status),
                    ..Default::default()
                })
            }
            Stage::Descriptions | Stage::Images => {
                let handle = if stage == Stage::Descriptions {
                    self.client().generate_descriptions(project_id).await?
                } else {
                    self.client().generate_images(project_id).await?
                };
                let entity = EntityRef::task(project_id, &handle.task_id);
                let outcome = self
                    .poller
                    .await_task_completion(project_id, &handle.task_id, task_budget)
                    .await;
                let report = self.settle(&entity, outcome).await?;
                Ok(StageOutput {
                    task_id: Some(handle.task_id),
                    final_status: Some(report.status),
                    ..Default::default()
                })
            }
            Stage::Export => {
                let link = self.client().export_pptx(project_id).await?;
                let dest = self.deck_path(&scenario.name);
                self.client().download(&link.download_url, &dest).await?;

                let report = self.inspector.inspect(&dest, &scenario.expect)?;
                Ok(StageOutput {
                    deck: Some(report),
                    ..Default::default()
                })
            }
        }
    }

    /// Turn a wait outcome into a result, logging the entity's last known
    /// status first if the wait ran out of time.
    async fn settle(&self, entity: &EntityRef, outcome: PollOutcome) -> E2eResult<StatusReport> {
        if let PollOutcome::TimedOut { .. } = outcome {
            self.poller.describe_timeout(entity).await;
        }
        Ok(outcome.into_result(entity)?)
    }

    fn deck_path(&self, scenario_name: &str) -> PathBuf {
        let file_stem: String = scenario_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        self.config.output_dir.join(format!("{}.pptx", file_stem))
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
