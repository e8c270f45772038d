//! Wait commands: block until a project or task converges

use std::time::{Duration, Instant};

use clap::Args;
use colored::Colorize;

use deckgen_common::{EntityRef, STATUS_COMPLETED, STATUS_FAILED};
use deckgen_e2e::{ApiClient, HarnessConfig, PollOutcome, Poller};

use crate::output::{self, OutputFormat, WaitRow};

#[derive(Args)]
pub struct WaitStatusArgs {
    /// Project ID
    pub project_id: String,

    /// Status to wait for (e.g. OUTLINE_GENERATED)
    pub target: String,

    /// Wait budget in seconds (defaults to budgets.status_secs)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,
}

#[derive(Args)]
pub struct WaitTaskArgs {
    /// Project ID
    pub project_id: String,

    /// Task ID
    pub task_id: String,

    /// Wait budget in seconds (defaults to budgets.task_secs)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,
}

fn poller(config: &HarnessConfig) -> anyhow::Result<Poller<ApiClient>> {
    let client = ApiClient::new(&config.base_url, config.request_timeout())?;
    Ok(Poller::new(client).with_cadences(config.poll.status, config.poll.task))
}

pub async fn wait_status(
    args: WaitStatusArgs,
    config: &HarnessConfig,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    if args.target.trim().is_empty() {
        anyhow::bail!("target status must not be empty");
    }

    let poller = poller(config)?;
    let entity = EntityRef::project(&args.project_id);
    let budget = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.status_budget());

    let start = Instant::now();
    let outcome = poller.await_status(&entity, &args.target, budget).await;
    finish(&poller, entity, &args.target, outcome, start, format).await
}

pub async fn wait_task(
    args: WaitTaskArgs,
    config: &HarnessConfig,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let poller = poller(config)?;
    let entity = EntityRef::task(&args.project_id, &args.task_id);
    let budget = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.task_budget());

    let start = Instant::now();
    let outcome = poller
        .await_task_completion(&args.project_id, &args.task_id, budget)
        .await;
    finish(&poller, entity, STATUS_COMPLETED, outcome, start, format).await
}

async fn finish(
    poller: &Poller<ApiClient>,
    entity: EntityRef,
    target: &str,
    outcome: PollOutcome,
    start: Instant,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let (status, detail) = match &outcome {
        PollOutcome::Reached(report) => (Some(report.status.clone()), None),
        PollOutcome::Failed { message } => {
            (Some(STATUS_FAILED.to_string()), Some(message.clone()))
        }
        PollOutcome::TimedOut { last_status, .. } => {
            let latest = poller.describe_timeout(&entity).await;
            let status = latest.map(|r| r.status).or_else(|| last_status.clone());
            (status, Some("budget exhausted".to_string()))
        }
        PollOutcome::TransportExhausted {
            attempts,
            last_error,
        } => (
            None,
            Some(format!("{} consecutive errors, last: {}", attempts, last_error)),
        ),
    };

    let reached = outcome.is_reached();
    let row = WaitRow {
        entity: entity.to_string(),
        target: target.to_string(),
        outcome: outcome.label().to_string(),
        status,
        detail,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    match format {
        OutputFormat::Table if reached => {
            output::print_success(&format!("{} reached {}", row.entity, target.green()));
            output::print_item(&row, format);
        }
        OutputFormat::Table => {
            if let Err(e) = outcome.into_result(&entity) {
                output::print_error(&e.to_string());
            }
            output::print_item(&row, format);
        }
        _ => output::print_item(&row, format),
    }

    Ok(reached)
}
