//! Run lifecycle scenarios against the deck API

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use deckgen_e2e::{HarnessConfig, LifecycleRunner};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Scenario directory (overrides scenarios_dir)
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long, conflicts_with = "tag")]
    pub name: Option<String>,

    /// Output directory for decks and results (overrides output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(
    args: RunArgs,
    mut config: HarnessConfig,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    if let Some(dir) = args.scenarios {
        config.scenarios_dir = dir;
    }
    if let Some(dir) = args.output {
        config.output_dir = dir;
    }

    let runner = LifecycleRunner::new(config)?;
    let suite = match (&args.name, &args.tag) {
        (Some(name), _) => runner.run_named(name).await?,
        (None, Some(tag)) => runner.run_tagged(tag).await?,
        (None, None) => runner.run_all().await?,
    };
    let path = runner.write_results(&suite)?;

    output::print_list(&suite.results, format);

    if let OutputFormat::Table = format {
        let summary = format!(
            "{} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        if suite.failed == 0 {
            output::print_success(&summary);
        } else {
            output::print_error(&summary);
        }
        println!("{} {}", "Results:".bold(), path.display());
    }

    Ok(suite.failed == 0)
}
