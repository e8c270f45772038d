//! Full lifecycle tests against the in-process fake API
//!
//! Uses the virtual clock, so multi-minute waits finish instantly.

mod support;

use deckgen_e2e::config::BudgetConfig;
use deckgen_e2e::{HarnessConfig, LifecycleRunner, ManualClock, Scenario};
use support::FakeApi;
use tempfile::TempDir;

fn scenario(yaml: &str) -> Scenario {
    Scenario::from_yaml(yaml).unwrap()
}

fn config(base_url: &str, dir: &TempDir) -> HarnessConfig {
    HarnessConfig {
        base_url: base_url.to_string(),
        output_dir: dir.path().join("out"),
        scenarios_dir: dir.path().join("scenarios"),
        health_timeout_secs: 5,
        ..Default::default()
    }
}

const FULL: &str = r#"
name: full-lifecycle
project:
  idea_prompt: Rust at scale
expect:
  min_slides: 3
  keywords: [ownership, rust]
"#;

#[tokio::test]
async fn full_lifecycle_produces_valid_deck() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, state) = support::spawn(FakeApi {
        polls_until_done: 4,
        ..Default::default()
    })
    .await;

    let clock = ManualClock::new();
    let runner = LifecycleRunner::with_clock(config(&base_url, &dir), clock.clone()).unwrap();
    let result = runner.run_scenario(&scenario(FULL)).await;

    assert!(result.success, "scenario failed: {:?}", result.error);
    let stages: Vec<_> = result.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(stages, vec!["outline", "descriptions", "images", "export"]);
    assert_eq!(result.stages[0].final_status.as_deref(), Some("OUTLINE_GENERATED"));
    assert!(result.stages[1].task_id.is_some());
    assert_eq!(result.stages[2].final_status.as_deref(), Some("COMPLETED"));

    let deck = result.deck.expect("export stage records the deck report");
    assert!(deck.valid, "{}", deck.message);
    assert_eq!(deck.slide_count, 3);
    assert!(dir.path().join("out/full-lifecycle.pptx").exists());

    // Three waits of four polls each, three pending sleeps per wait
    assert_eq!(clock.sleeps().len(), 9);

    let project_id = result.project_id.unwrap();
    assert_eq!(state.lock().deleted, vec![project_id]);
}

#[tokio::test]
async fn failed_task_stops_the_scenario_and_still_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, state) = support::spawn(FakeApi {
        polls_until_done: 2,
        failing_task: Some("images".to_string()),
        ..Default::default()
    })
    .await;

    let runner = LifecycleRunner::with_clock(config(&base_url, &dir), ManualClock::new()).unwrap();
    let result = runner.run_scenario(&scenario(FULL)).await;

    assert!(!result.success);
    assert_eq!(result.stages.len(), 3);
    assert!(result.stages[2].error.as_deref().unwrap().contains("images generation quota exceeded"));
    assert!(result.deck.is_none());
    assert_eq!(state.lock().deleted.len(), 1);
}

#[tokio::test]
async fn slow_outline_times_out_against_scenario_budget() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, state) = support::spawn(FakeApi {
        polls_until_done: 1000,
        ..Default::default()
    })
    .await;

    let runner = LifecycleRunner::with_clock(config(&base_url, &dir), ManualClock::new()).unwrap();
    let result = runner
        .run_scenario(&scenario(
            r#"
name: slow-outline
project:
  idea_prompt: Something slow
stages: [outline]
timeouts:
  status_secs: 20
cleanup: false
"#,
        ))
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("timed out"), "{}", error);
    assert!(error.contains("GENERATING_OUTLINE"), "{}", error);
    // 10 polls inside the budget plus one diagnostic read
    assert_eq!(state.lock().status_reads, 11);
    assert!(state.lock().deleted.is_empty());
}

#[tokio::test]
async fn deck_missing_keywords_fails_export() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, _state) = support::spawn(FakeApi {
        polls_until_done: 1,
        ..Default::default()
    })
    .await;

    let runner = LifecycleRunner::with_clock(config(&base_url, &dir), ManualClock::new()).unwrap();
    let result = runner
        .run_scenario(&scenario(
            r#"
name: keywords
project:
  idea_prompt: Rust at scale
stages: [export]
expect:
  keywords: [kubernetes]
"#,
        ))
        .await;

    assert!(!result.success);
    let deck = result.deck.unwrap();
    assert_eq!(deck.missing_keywords, vec!["kubernetes".to_string()]);
    assert!(!result.stages[0].success);
}

#[tokio::test]
async fn suite_runs_scenarios_from_directory_and_writes_results() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, _state) = support::spawn(FakeApi {
        polls_until_done: 1,
        ..Default::default()
    })
    .await;

    let scenarios_dir = dir.path().join("scenarios");
    std::fs::create_dir_all(&scenarios_dir).unwrap();
    std::fs::write(scenarios_dir.join("full.yaml"), FULL).unwrap();
    std::fs::write(
        scenarios_dir.join("outline.yaml"),
        "name: outline-only\ntags: [fast]\nproject:\n  idea_prompt: Quick one\nstages: [outline]\n",
    )
    .unwrap();

    let config = HarnessConfig {
        budgets: BudgetConfig {
            status_secs: 60,
            task_secs: 60,
        },
        ..config(&base_url, &dir)
    };
    let runner = LifecycleRunner::with_clock(config, ManualClock::new()).unwrap();

    let all = runner.run_all().await.unwrap();
    assert_eq!(all.total, 2);
    assert_eq!(all.passed, 2);

    let tagged = runner.run_tagged("fast").await.unwrap();
    assert_eq!(tagged.total, 1);
    assert_eq!(tagged.results[0].name, "outline-only");

    let named = runner.run_named("full-lifecycle").await.unwrap();
    assert_eq!(named.passed, 1);
    assert!(runner.run_named("missing").await.is_err());

    let path = runner.write_results(&all).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["passed"], 2);
}

#[tokio::test]
async fn unhealthy_api_fails_the_suite() {
    let dir = tempfile::tempdir().unwrap();
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let config = HarnessConfig {
        health_timeout_secs: 1,
        ..config(&format!("http://127.0.0.1:{}", port), &dir)
    };
    let runner = LifecycleRunner::with_clock(config, ManualClock::new()).unwrap();

    let err = runner.run_scenarios(&[scenario(FULL)]).await.unwrap_err();
    assert!(err.to_string().contains("health check failed"));
}
